//! Recognition of expiry phrases ("válida até 20/10 às 23h59") in page text.

use crate::utils::text::fold_accents;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

/// How far before the reference date a year-less date may fall before we
/// assume it refers to next year.
const YEARLESS_LOOKBACK_DAYS: i64 = 31;

lazy_static! {
    // Runs against accent-folded, lowercased text.
    static ref EXPIRY_REGEX: Regex = Regex::new(
        r"(?x)
        \b(?:ate|expiram?(?:\s+em)?|terminam?(?:\s+em)?|encerram?(?:\s+em)?)\b
        [^\d\n]{0,20}?
        (?:(?P<pre_h>\d{1,2})(?:h(?P<pre_m>\d{2})?|:(?P<pre_m2>\d{2}))\s+(?:de|do\s+dia)\s+)?
        (?:
            (?P<d>\d{1,2})[/.\-](?P<m>\d{1,2})(?:[/.\-](?P<y>\d{4}|\d{2}))?\b
          |
            (?P<td>\d{1,2})o?\s+de\s+
            (?P<tm>janeiro|fevereiro|marco|abril|maio|junho|julho|agosto|setembro|outubro|novembro|dezembro)
            (?:\s+de\s+(?P<ty>\d{4}))?\b
        )
        (?:\s*,?\s*(?:-\s*)?(?:as\s+)?(?P<h>\d{1,2})(?:h(?P<min>\d{2})?\b|:(?P<min2>\d{2})\b))?
        "
    )
    .expect("expiry pattern is valid");

    // Time assumed when a phrase gives only a date.
    static ref END_OF_DAY: NaiveTime =
        NaiveTime::from_hms_opt(23, 59, 59).expect("end of day is a valid time");
}

/// Finds the first explicit expiry date in a block of pt-BR text.
#[derive(Debug, Clone)]
pub struct ExpiryParser {
    timezone: Tz,
}

impl ExpiryParser {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Returns the first valid expiry found in `text`, as UTC.
    ///
    /// `reference` anchors dates written without a year; pass the item's
    /// publish time when known.
    pub fn find(&self, text: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let folded = fold_accents(text);
        let reference_date = reference.with_timezone(&self.timezone).date_naive();

        EXPIRY_REGEX
            .captures_iter(&folded)
            .find_map(|caps| match self.resolve(&caps, reference_date) {
                Some(expiry) => Some(expiry),
                None => {
                    debug!("Ignoring unusable expiry phrase: {:?}", &caps[0]);
                    None
                }
            })
    }

    fn resolve(&self, caps: &Captures<'_>, reference_date: NaiveDate) -> Option<DateTime<Utc>> {
        let (day, month, year) = if let Some(day) = caps.name("d") {
            let month: u32 = caps.name("m")?.as_str().parse().ok()?;
            let year = match caps.name("y") {
                Some(y) => Some(expand_year(y.as_str())?),
                None => None,
            };
            (day.as_str().parse::<u32>().ok()?, month, year)
        } else {
            let day = caps.name("td")?.as_str().parse::<u32>().ok()?;
            let month = month_number(caps.name("tm")?.as_str())?;
            let year = match caps.name("ty") {
                Some(y) => Some(y.as_str().parse::<i32>().ok()?),
                None => None,
            };
            (day, month, year)
        };

        let date = match year {
            Some(year) => NaiveDate::from_ymd_opt(year, month, day)?,
            None => infer_year(day, month, reference_date)?,
        };

        let time = time_of_day(caps).unwrap_or(*END_OF_DAY);
        let local = date.and_time(time);

        self.timezone
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

fn infer_year(day: u32, month: u32, reference_date: NaiveDate) -> Option<NaiveDate> {
    let candidate = NaiveDate::from_ymd_opt(reference_date.year(), month, day)?;
    if candidate < reference_date - Duration::days(YEARLESS_LOOKBACK_DAYS) {
        NaiveDate::from_ymd_opt(reference_date.year() + 1, month, day)
    } else {
        Some(candidate)
    }
}

fn time_of_day(caps: &Captures<'_>) -> Option<NaiveTime> {
    let (hour, minute) = if let Some(hour) = caps.name("h") {
        (hour, caps.name("min").or_else(|| caps.name("min2")))
    } else {
        (
            caps.name("pre_h")?,
            caps.name("pre_m").or_else(|| caps.name("pre_m2")),
        )
    };

    let hour: u32 = hour.as_str().parse().ok()?;
    let minute: u32 = match minute {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "janeiro" => 1,
        "fevereiro" => 2,
        "marco" => 3,
        "abril" => 4,
        "maio" => 5,
        "junho" => 6,
        "julho" => 7,
        "agosto" => 8,
        "setembro" => 9,
        "outubro" => 10,
        "novembro" => 11,
        "dezembro" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ExpiryParser {
        ExpiryParser::new(chrono_tz::America::Sao_Paulo)
    }

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 14, 15, 0, 0).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_numeric_date_with_time() {
        let found = parser().find("Promoção válida até 20/10/2025 às 23h59.", reference());
        // São Paulo is UTC-3
        assert_eq!(found, Some(utc(2025, 10, 21, 2, 59, 0)));
    }

    #[test]
    fn test_textual_date_defaults_to_end_of_day() {
        let found = parser().find("Válida até o dia 5 de novembro.", reference());
        assert_eq!(found, Some(utc(2025, 11, 6, 2, 59, 59)));
    }

    #[test]
    fn test_textual_date_with_year_and_ordinal() {
        let found = parser().find("A oferta termina em 1º de março de 2026", reference());
        assert_eq!(found, Some(utc(2026, 3, 2, 2, 59, 59)));
    }

    #[test]
    fn test_comma_and_as_before_time() {
        assert_eq!(
            parser().find("Promoção válida até 20/10, às 18h", reference()),
            Some(utc(2025, 10, 20, 21, 0, 0))
        );
        assert_eq!(
            parser().find("válida até 20 de outubro de 2025, às 18h30", reference()),
            Some(utc(2025, 10, 20, 21, 30, 0))
        );
        assert_eq!(
            parser().find("válida até 20/10 - às 9h", reference()),
            Some(utc(2025, 10, 20, 12, 0, 0))
        );
        assert_eq!(
            parser().find("válida até 20/10 às 18h", reference()),
            Some(utc(2025, 10, 20, 21, 0, 0))
        );
    }

    #[test]
    fn test_time_before_date() {
        let found = parser().find("Compre até as 23h59 do dia 20/10", reference());
        assert_eq!(found, Some(utc(2025, 10, 21, 2, 59, 0)));
    }

    #[test]
    fn test_colon_time_and_two_digit_year() {
        let found = parser().find("Encerra em 15.10.25 - 12:30", reference());
        assert_eq!(found, Some(utc(2025, 10, 15, 15, 30, 0)));
    }

    #[test]
    fn test_yearless_date_rolls_into_next_year() {
        let reference = utc(2025, 12, 20, 12, 0, 0);
        let found = parser().find("válido até 10/01", reference);
        assert_eq!(found, Some(utc(2026, 1, 11, 2, 59, 59)));
    }

    #[test]
    fn test_recent_yearless_date_stays_in_reference_year() {
        let found = parser().find("válido até 10/10", reference());
        assert_eq!(found, Some(utc(2025, 10, 11, 2, 59, 59)));
    }

    #[test]
    fn test_invalid_date_is_skipped() {
        let text = "Resgate até 31/02. A campanha encerra em 03/03.";
        let found = parser().find(text, reference());
        assert_eq!(found, Some(utc(2026, 3, 4, 2, 59, 59)));
    }

    #[test]
    fn test_amounts_are_not_dates() {
        assert_eq!(parser().find("Ganhe até 50% de desconto", reference()), None);
        assert_eq!(parser().find("Acumule até 10.000 milhas", reference()), None);
    }

    #[test]
    fn test_dates_without_keyword_are_ignored() {
        assert_eq!(parser().find("Publicado em 20/10/2025", reference()), None);
        assert_eq!(parser().find("", reference()), None);
    }

    #[test]
    fn test_first_phrase_wins() {
        let text = "Cadastre-se até 18/10. Voos até 30/11.";
        assert_eq!(
            parser().find(text, reference()),
            Some(utc(2025, 10, 19, 2, 59, 59))
        );
    }
}
