use crate::traits::PromotionStore;
use crate::types::{ExtractedRecord, PersistedPromotion, Result, MAX_BODY_CHARS};
use crate::utils::text::truncate_chars;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

/// `promocoes` table access over a single PostgreSQL connection.
pub struct PgPromotionStore {
    db: PgPool,
}

impl PgPromotionStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        Ok(Self { db })
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the table if it does not exist yet.
    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS promocoes (
                id BIGSERIAL PRIMARY KEY,
                titulo TEXT,
                conteudo TEXT,
                url TEXT NOT NULL UNIQUE,
                fonte TEXT,
                valid_until TIMESTAMP WITH TIME ZONE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        info!("Ensured promocoes table exists");
        Ok(())
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<PersistedPromotion>> {
        let row = sqlx::query(
            r#"
            SELECT id, titulo, conteudo, url, fonte, valid_until, created_at, updated_at
            FROM promocoes
            WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(r) => Ok(Some(PersistedPromotion {
                id: r.try_get("id")?,
                title: r.try_get("titulo")?,
                body: r.try_get("conteudo")?,
                url: r.try_get("url")?,
                source: r.try_get("fonte")?,
                valid_until: r.try_get("valid_until")?,
                created_at: r.try_get("created_at")?,
                updated_at: r.try_get("updated_at")?,
            })),
            None => Ok(None),
        }
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM promocoes")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl PromotionStore for PgPromotionStore {
    async fn evict_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM promocoes WHERE valid_until IS NOT NULL AND valid_until < $1",
        )
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn upsert(&self, record: &ExtractedRecord, now: DateTime<Utc>) -> Result<()> {
        let body = truncate_chars(&record.body, MAX_BODY_CHARS);
        let body = (!body.is_empty()).then_some(body);

        sqlx::query(
            r#"
            INSERT INTO promocoes (titulo, conteudo, url, fonte, valid_until, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (url) DO UPDATE SET
                titulo = EXCLUDED.titulo,
                conteudo = EXCLUDED.conteudo,
                fonte = EXCLUDED.fonte,
                valid_until = EXCLUDED.valid_until,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.title)
        .bind(body)
        .bind(&record.url)
        .bind(&record.source)
        .bind(record.valid_until)
        .bind(now)
        .execute(&self.db)
        .await?;

        debug!("Upserted {}", record.url);
        Ok(())
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
