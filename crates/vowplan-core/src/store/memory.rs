//! In-memory [`DocumentStore`] for dry runs and tests.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use vowplan_db::models::Collection;

use super::DocumentStore;

/// Documents held in a map. Writes to collections marked with
/// [`MemoryDocumentStore::failing`] return an error, and an
/// [`MemoryDocumentStore::unavailable`] store fails `ping`.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: Mutex<HashMap<(Collection, String), Value>>,
    failing: HashSet<Collection>,
    unavailable: bool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `collection` fail.
    pub fn failing(mut self, collection: Collection) -> Self {
        self.failing.insert(collection);
        self
    }

    /// Make `ping` fail.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.docs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_writable(&self, collection: Collection, key: &str) -> Result<()> {
        if self.failing.contains(&collection) {
            bail!("write to {collection}/{key} rejected");
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        if self.unavailable {
            bail!("memory store marked unavailable");
        }
        Ok(())
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        Ok(self.docs.lock().await.get(&(collection, key.to_string())).cloned())
    }

    async fn set(&self, collection: Collection, key: &str, data: &Value) -> Result<()> {
        self.check_writable(collection, key)?;
        self.docs
            .lock()
            .await
            .insert((collection, key.to_string()), data.clone());
        Ok(())
    }

    async fn merge(&self, collection: Collection, key: &str, patch: &Value) -> Result<()> {
        self.check_writable(collection, key)?;
        let Value::Object(patch) = patch else {
            bail!("merge patch for {collection}/{key} must be a JSON object");
        };
        let mut docs = self.docs.lock().await;
        let entry = docs
            .entry((collection, key.to_string()))
            .or_insert_with(|| Value::Object(Default::default()));
        match entry {
            Value::Object(existing) => {
                for (k, v) in patch {
                    existing.insert(k.clone(), v.clone());
                }
            }
            other => *other = Value::Object(patch.clone()),
        }
        Ok(())
    }
}
