use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use uuid::Uuid;

use super::DocumentDriver;
use crate::document::{Document, INTERNAL_ID};
use crate::models::Kind;

/// Document store on top of Postgres: one table per kind, the record itself
/// kept in a `JSONB` column and `seq` preserving insertion order.
pub struct PgDriver {
    pool: PgPool,
    name: String,
}

impl PgDriver {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .context("could not open connection pool")?;

        for kind in Kind::ALL {
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {} (_id UUID PRIMARY KEY, seq BIGSERIAL, doc JSONB NOT NULL)",
                kind.collection()
            ))
            .execute(&pool)
            .await
            .with_context(|| format!("could not create collection `{}`", kind.collection()))?;
        }

        let (name,): (String,) = sqlx::query_as("SELECT current_database()::text")
            .fetch_one(&pool)
            .await?;
        Ok(Self { pool, name })
    }
}

#[async_trait]
impl DocumentDriver for PgDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert(&self, kind: Kind, doc: Document) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        let res = sqlx::query(&format!(
            "INSERT INTO {} (_id, doc) VALUES ($1, $2)",
            kind.collection()
        ))
        .bind(id)
        .bind(Json(doc))
        .execute(&self.pool)
        .await?;

        if res.rows_affected() < 1 {
            anyhow::bail!("insert into `{}` affected no rows", kind.collection());
        }
        Ok(id)
    }

    async fn find(
        &self,
        kind: Kind,
        filter: &Document,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Document>> {
        let limit = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
        let rows: Vec<(Uuid, Json<Document>)> = sqlx::query_as(&format!(
            "SELECT _id, doc FROM {} WHERE doc @> $1 ORDER BY seq{}",
            kind.collection(),
            limit
        ))
        .bind(Json(filter.clone()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, Json(mut doc))| {
                doc.insert(INTERNAL_ID.to_string(), Value::String(id.to_string()));
                doc
            })
            .collect())
    }

    async fn update_one(&self, kind: Kind, id: Uuid, set: Document) -> anyhow::Result<bool> {
        let res = sqlx::query(&format!(
            "UPDATE {} SET doc = doc || $2 WHERE _id = $1",
            kind.collection()
        ))
        .bind(id)
        .bind(Json(set))
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() >= 1)
    }

    async fn collection_names(&self) -> anyhow::Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = current_schema() ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Needs a scratch database: TEST_DATABASE_URL=postgres://... cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn round_trips_against_postgres() {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL not set");
        let driver = PgDriver::connect(&url).await.unwrap();
        let code = format!("T{}", Uuid::new_v4().simple());

        let mut doc = Document::new();
        doc.insert("subject_code".into(), json!(code));
        doc.insert("topic".into(), json!("Limits"));
        let id = driver.insert(Kind::Lecture, doc).await.unwrap();

        let mut filter = Document::new();
        filter.insert("subject_code".into(), json!(code));
        let found = driver.find(Kind::Lecture, &filter, None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0][INTERNAL_ID], id.to_string());

        let mut set = Document::new();
        set.insert("topic".into(), json!("Continuity"));
        assert!(driver.update_one(Kind::Lecture, id, set).await.unwrap());
        let found = driver.find(Kind::Lecture, &filter, Some(1)).await.unwrap();
        assert_eq!(found[0]["topic"], "Continuity");

        assert!(driver
            .collection_names()
            .await
            .unwrap()
            .contains(&"lecture".to_string()));
    }
}
