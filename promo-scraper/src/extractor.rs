use crate::expiry::ExpiryParser;
use crate::traits::ContentExtractor;
use crate::types::{ExtractedRecord, Result, ScraperError, SOURCE_TAG, UNTITLED};
use crate::utils::text::collapse_whitespace;
use crate::Fetcher;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Candidate containers for the article text, most specific first.
const MAIN_SELECTORS: &[&str] = &[
    ".entry-content",
    ".post-content",
    "article",
    "main",
    "[role='main']",
    "#content",
    ".content",
    "body",
];

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

const BLOCK_TAGS: &[&str] = &["p", "li", "h2", "h3", "h4", "blockquote"];

lazy_static! {
    static ref MAIN: Vec<Selector> = MAIN_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("main content selector is valid"))
        .collect();
    static ref BLOCKS: Selector =
        Selector::parse(&BLOCK_TAGS.join(", ")).expect("block selector is valid");
    static ref OG_TITLE: Selector =
        Selector::parse("meta[property='og:title']").expect("og:title selector is valid");
    static ref H1: Selector = Selector::parse("h1").expect("h1 selector is valid");
    static ref TITLE: Selector = Selector::parse("title").expect("title selector is valid");
}

/// Where a record's title may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    OpenGraph,
    Heading,
    DocumentTitle,
    FeedTitle,
    Placeholder,
}

/// Title providers in priority order; the first non-empty value wins.
pub const TITLE_CHAIN: [TitleSource; 5] = [
    TitleSource::OpenGraph,
    TitleSource::Heading,
    TitleSource::DocumentTitle,
    TitleSource::FeedTitle,
    TitleSource::Placeholder,
];

/// A parsed page plus the pieces the title chain and body heuristic share.
pub struct Page<'a> {
    document: &'a Html,
    main: ElementRef<'a>,
}

impl<'a> Page<'a> {
    pub fn new(document: &'a Html) -> Self {
        let main = MAIN
            .iter()
            .find_map(|selector| document.select(selector).next())
            .unwrap_or_else(|| document.root_element());
        Self { document, main }
    }

    fn title_from(&self, source: TitleSource, feed_title: Option<&str>) -> Option<String> {
        let raw = match source {
            TitleSource::OpenGraph => self
                .document
                .select(&OG_TITLE)
                .find_map(|meta| meta.value().attr("content"))
                .map(str::to_string),
            TitleSource::Heading => self
                .main
                .select(&H1)
                .next()
                .or_else(|| self.document.select(&H1).next())
                .map(visible_text),
            TitleSource::DocumentTitle => self.document.select(&TITLE).next().map(visible_text),
            TitleSource::FeedTitle => feed_title.map(str::to_string),
            TitleSource::Placeholder => Some(UNTITLED.to_string()),
        };
        raw.map(|t| collapse_whitespace(&t)).filter(|t| !t.is_empty())
    }

    /// Walks `TITLE_CHAIN` and returns the first usable title with its source.
    pub fn title(&self, feed_title: Option<&str>) -> (String, TitleSource) {
        TITLE_CHAIN
            .iter()
            .find_map(|&source| self.title_from(source, feed_title).map(|t| (t, source)))
            .unwrap_or_else(|| (UNTITLED.to_string(), TitleSource::Placeholder))
    }

    /// Text blocks of the main container joined by newlines.
    pub fn body(&self) -> String {
        let main_id = self.main.id();
        let mut blocks: Vec<String> = Vec::new();

        for block in self.main.select(&BLOCKS) {
            let nested = block
                .ancestors()
                .take_while(|node| node.id() != main_id)
                .filter_map(|node| node.value().as_element())
                .any(|el| BLOCK_TAGS.contains(&el.name()));
            if nested {
                continue;
            }

            let text = visible_text(block);
            if text.is_empty() || blocks.last() == Some(&text) {
                continue;
            }
            blocks.push(text);
        }

        if blocks.is_empty() {
            visible_text(self.main)
        } else {
            blocks.join("\n")
        }
    }
}

/// Collapsed text of `element`, skipping script-like subtrees.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(|a| a.value().as_element())
            .any(|el| HIDDEN_TAGS.contains(&el.name()));
        if !hidden {
            out.push_str(text);
        }
    }
    collapse_whitespace(&out)
}

/// Fetches item pages and turns them into `ExtractedRecord`s.
pub struct PageExtractor {
    fetcher: Fetcher,
    expiry: ExpiryParser,
    source: String,
}

impl PageExtractor {
    pub fn new(fetcher: Fetcher, timezone: Tz) -> Self {
        Self {
            fetcher,
            expiry: ExpiryParser::new(timezone),
            source: SOURCE_TAG.to_string(),
        }
    }

    /// Derive a record from already-fetched HTML.
    pub fn parse_page(
        &self,
        html: &str,
        url: &str,
        feed_title: Option<&str>,
        published: Option<DateTime<Utc>>,
    ) -> Result<ExtractedRecord> {
        if html.trim().is_empty() {
            return Err(ScraperError::extraction(url, "empty document"));
        }

        let document = Html::parse_document(html);
        if !document.errors.is_empty() {
            debug!("{} parse errors in {}", document.errors.len(), url);
        }

        let page = Page::new(&document);
        let (title, title_source) = page.title(feed_title);
        let body = page.body();
        debug!("Title for {} taken from {:?}", url, title_source);

        if body.is_empty() {
            warn!("No text content found on {}", url);
        }

        let reference = published.unwrap_or_else(Utc::now);
        let valid_until = self
            .expiry
            .find(&body, reference)
            .or_else(|| self.expiry.find(&title, reference));

        Ok(ExtractedRecord {
            title,
            body,
            url: url.to_string(),
            valid_until,
            source: self.source.clone(),
        })
    }
}

#[async_trait]
impl ContentExtractor for PageExtractor {
    async fn extract(
        &self,
        url: &str,
        feed_title: Option<&str>,
        published: Option<DateTime<Utc>>,
    ) -> Result<ExtractedRecord> {
        let parsed = Url::parse(url).map_err(|e| ScraperError::extraction(url, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScraperError::extraction(url, "unsupported URL scheme"));
        }

        let html = self
            .fetcher
            .fetch_text(parsed.as_str())
            .await
            .map_err(|e| ScraperError::extraction(url, e))?;

        self.parse_page(&html, url, feed_title, published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_title(html: &str, feed_title: Option<&str>) -> (String, TitleSource) {
        let document = Html::parse_document(html);
        Page::new(&document).title(feed_title)
    }

    fn page_body(html: &str) -> String {
        let document = Html::parse_document(html);
        Page::new(&document).body()
    }

    #[test]
    fn test_title_prefers_open_graph() {
        let html = r#"<html><head>
            <meta property="og:title" content="  Smiles:   bônus de 100% ">
            <title>Outro título</title></head>
            <body><h1>Cabeçalho</h1></body></html>"#;
        assert_eq!(
            page_title(html, Some("Feed")),
            ("Smiles: bônus de 100%".to_string(), TitleSource::OpenGraph)
        );
    }

    #[test]
    fn test_title_falls_back_to_heading_then_document_title() {
        let html = "<html><head><title>Doc</title></head><body><h1> Post </h1></body></html>";
        assert_eq!(page_title(html, None), ("Post".to_string(), TitleSource::Heading));

        let html = "<html><head><title>Doc</title></head><body><h1>  </h1></body></html>";
        assert_eq!(
            page_title(html, None),
            ("Doc".to_string(), TitleSource::DocumentTitle)
        );
    }

    #[test]
    fn test_title_falls_back_to_feed_title() {
        let html = "<html><body><p>texto</p></body></html>";
        assert_eq!(
            page_title(html, Some("Do feed")),
            ("Do feed".to_string(), TitleSource::FeedTitle)
        );
    }

    #[test]
    fn test_title_placeholder_when_nothing_else() {
        let html = "<html><body><p>texto</p></body></html>";
        assert_eq!(
            page_title(html, Some("   ")),
            (UNTITLED.to_string(), TitleSource::Placeholder)
        );
        assert_eq!(page_title(html, None).0, "Sem título");
    }

    #[test]
    fn test_body_uses_main_container_blocks() {
        let html = r#"<html><body>
            <nav><p>Menu</p></nav>
            <div class="entry-content">
              <p>Primeiro   parágrafo.</p>
              <script>var x = 1;</script>
              <ul><li>Item <strong>um</strong></li><li><p>Item dois</p></li></ul>
              <p>Primeiro parágrafo.</p>
              <p>   </p>
              <h2>Regras</h2>
            </div>
            <footer><p>Rodapé</p></footer>
        </body></html>"#;
        assert_eq!(
            page_body(html),
            "Primeiro parágrafo.\nItem um\nItem dois\nPrimeiro parágrafo.\nRegras"
        );
    }

    #[test]
    fn test_body_drops_consecutive_duplicates() {
        let html = "<article><p>A</p><p>A</p><p>B</p></article>";
        assert_eq!(page_body(html), "A\nB");
    }

    #[test]
    fn test_body_falls_back_to_container_text() {
        let html = "<html><body><div>Somente <b>texto</b> solto</div><style>p{}</style></body></html>";
        assert_eq!(page_body(html), "Somente texto solto");
    }

    #[test]
    fn test_body_empty_page() {
        assert_eq!(page_body("<html><body></body></html>"), "");
    }

    #[test]
    fn test_body_of_promo_fixture_is_stable() {
        let html = include_str!("../tests/support/promo_page.html");
        let expected = "A Smiles está com uma nova campanha de transferência bonificada.\n\
            Clientes do Clube Smiles recebem até 100% de bônus ao transferir pontos.\n\
            Regras\n\
            Promoção válida até 20/10/2025 às 23h59.\n\
            Bônus creditado em até 15 dias.\n\
            Acumule até 10.000 milhas extras.";

        assert_eq!(page_body(html), expected);
        assert_eq!(page_body(html), expected);
    }
}
