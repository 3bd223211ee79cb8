//! Database query functions for the `documents` table.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::PgPool;

use crate::models::{Collection, Document};

/// Fetch a document by collection and key.
pub async fn get_document(
    pool: &PgPool,
    collection: Collection,
    key: &str,
) -> Result<Option<Document>> {
    let doc = sqlx::query_as::<_, Document>(
        "SELECT * FROM documents WHERE collection = $1 AND key = $2",
    )
    .bind(collection.as_str())
    .bind(key)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to fetch document {collection}/{key}"))?;

    Ok(doc)
}

/// Write a document, replacing any existing body under the same key.
///
/// `created_at` is kept from the original row when one exists.
pub async fn set_document(
    pool: &PgPool,
    collection: Collection,
    key: &str,
    data: &Value,
) -> Result<Document> {
    let doc = sqlx::query_as::<_, Document>(
        "INSERT INTO documents (collection, key, data) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (collection, key) \
         DO UPDATE SET data = EXCLUDED.data, updated_at = now() \
         RETURNING *",
    )
    .bind(collection.as_str())
    .bind(key)
    .bind(data)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to write document {collection}/{key}"))?;

    Ok(doc)
}

/// Shallow-merge `patch` into an existing document, creating it when absent.
///
/// Top-level keys in `patch` overwrite keys in the stored body; other keys
/// are left untouched.
pub async fn merge_document(
    pool: &PgPool,
    collection: Collection,
    key: &str,
    patch: &Value,
) -> Result<Document> {
    if !patch.is_object() {
        anyhow::bail!("merge patch for {collection}/{key} must be a JSON object");
    }

    let doc = sqlx::query_as::<_, Document>(
        "INSERT INTO documents (collection, key, data) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (collection, key) \
         DO UPDATE SET data = documents.data || EXCLUDED.data, updated_at = now() \
         RETURNING *",
    )
    .bind(collection.as_str())
    .bind(key)
    .bind(patch)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to merge into document {collection}/{key}"))?;

    Ok(doc)
}

/// Count the documents stored in one collection.
pub async fn count_documents(pool: &PgPool, collection: Collection) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = $1")
        .bind(collection.as_str())
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to count documents in {collection}"))?;

    Ok(count)
}
