//! `vowplan generate`: run the pipeline once from the command line.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use vowplan_core::pipeline::{GenerateRequest, GenerationPipeline, PlanResult};
use vowplan_core::store::{Collection, DocumentStore, MemoryDocumentStore, PgDocumentStore};
use vowplan_db::pool;

use crate::config::VowplanConfig;

/// Read a wedding profile from `path`.
///
/// The file holds either the `weddingData` object itself or a request body
/// wrapping it under `weddingData`.
pub fn read_wedding_data(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("input file {} is not valid JSON", path.display()))?;
    Ok(match value {
        Value::Object(mut map) if map.contains_key("weddingData") => {
            map.remove("weddingData").unwrap_or(Value::Null)
        }
        other => other,
    })
}

/// Run the pipeline for one user and print the plan as JSON on stdout.
///
/// With `dry_run` the plan is written to an in-memory store and the database
/// is never contacted.
pub async fn run_generate(config: VowplanConfig, user_id: &str, input: &Path, dry_run: bool) -> Result<()> {
    let wedding_data = read_wedding_data(input)?;

    let pg_pool = if dry_run {
        None
    } else {
        Some(pool::create_pool(&config.db_config).await?)
    };
    let store: Arc<dyn DocumentStore> = match &pg_pool {
        Some(p) => Arc::new(PgDocumentStore::new(p.clone())),
        None => Arc::new(MemoryDocumentStore::new()),
    };

    let pipeline = GenerationPipeline::from_settings(config.pipeline, store.clone())?;
    let result = pipeline
        .run(&GenerateRequest::new(user_id, wedding_data))
        .await
        .context("plan generation failed");

    if let Ok(plan) = &result {
        print_plan(plan)?;
        report_stored(store.as_ref(), user_id).await?;
    }
    if let Some(p) = pg_pool {
        p.close().await;
    }
    result.map(|_| ())
}

fn print_plan(plan: &PlanResult) -> Result<()> {
    let json = serde_json::to_string_pretty(plan).context("failed to serialize plan")?;
    println!("{json}");
    Ok(())
}

/// Read the records back and list them on stderr.
async fn report_stored(store: &dyn DocumentStore, user_id: &str) -> Result<()> {
    eprintln!("Stored in {}:", store.name());
    for collection in Collection::ALL {
        let doc = store.get(collection, user_id).await?;
        let status = match doc {
            Some(Value::Object(map)) => format!("{} fields", map.len()),
            Some(_) => "present".to_string(),
            None => "missing".to_string(),
        };
        eprintln!("  {collection}/{user_id}: {status}");
    }
    Ok(())
}
