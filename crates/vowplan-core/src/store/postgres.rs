//! Postgres-backed [`DocumentStore`].

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use vowplan_db::models::Collection;
use vowplan_db::queries::documents;

use super::DocumentStore;

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn ping(&self) -> Result<()> {
        vowplan_db::pool::ping(&self.pool).await
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        let doc = documents::get_document(&self.pool, collection, key).await?;
        Ok(doc.map(|d| d.data))
    }

    async fn set(&self, collection: Collection, key: &str, data: &Value) -> Result<()> {
        documents::set_document(&self.pool, collection, key, data).await?;
        Ok(())
    }

    async fn merge(&self, collection: Collection, key: &str, patch: &Value) -> Result<()> {
        documents::merge_document(&self.pool, collection, key, patch).await?;
        Ok(())
    }
}
