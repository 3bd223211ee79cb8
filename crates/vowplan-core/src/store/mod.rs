//! Document store abstraction.
//!
//! Plan records are JSON documents addressed by collection and user id.
//! Postgres is the production backend; the in-memory backend serves dry runs
//! and tests.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use vowplan_db::models::Collection;

/// Trait for document store backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Human-readable name of the backend (e.g. "postgres", "memory").
    fn name(&self) -> &str;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Read a document body.
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>>;

    /// Write a document body, replacing any previous one.
    async fn set(&self, collection: Collection, key: &str, data: &Value) -> Result<()>;

    /// Shallow-merge an object into a document, creating it when absent.
    async fn merge(&self, collection: Collection, key: &str, patch: &Value) -> Result<()>;
}
