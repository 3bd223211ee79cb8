//! The preliminary-plan pipeline.
//!
//! [`GenerationPipeline::run`] takes an onboarding submission through date
//! normalization, todo and plan generation (concurrently), vendor
//! enrichment, sanitization and persistence. Only invalid input and store
//! failures surface as errors; every upstream failure is absorbed by a
//! fallback and reported through the flags on [`PlanResult`].

pub mod stage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::budget::{Budget, FallbackConfig};
use crate::context::{WeddingContext, WeddingData};
use crate::generation::PlanGenerationClient;
use crate::persistence::{PersistenceError, PlanDocuments, PlanPersistence, PlanRecords};
use crate::store::DocumentStore;
use crate::todo::{TodoGenerator, TodoItem, todos_from_values};
use crate::upstream;
use crate::vendors::places::{DEFAULT_BASE_URL, GooglePlacesClient, PlacesDirectory};
use crate::vendors::{EnrichmentConfig, VendorEnricher, VendorMap, seeds_from_value};

pub use stage::{PipelineStage, StageError, StageTracker};

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

/// Body of a plan-generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub wedding_data: Option<Value>,
}

impl GenerateRequest {
    pub fn new(user_id: impl Into<String>, wedding_data: Value) -> Self {
        Self {
            user_id: Some(user_id.into()),
            wedding_data: Some(wedding_data),
        }
    }

    /// Check required fields and decode the profile.
    fn validate(&self) -> Result<(String, Value, WeddingData), PipelineError> {
        let user_id = self
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(PipelineError::MissingField("userId"))?;
        let raw = match &self.wedding_data {
            Some(Value::Object(map)) if !map.is_empty() => Value::Object(map.clone()),
            _ => return Err(PipelineError::MissingField("weddingData")),
        };
        let data: WeddingData = serde_json::from_value(raw.clone())
            .map_err(|e| PipelineError::InvalidInput(format!("weddingData: {e}")))?;
        Ok((user_id.to_string(), raw, data))
    }
}

/// Everything generated for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub todos: Vec<TodoItem>,
    pub budget: Budget,
    /// Always carries all five categories.
    pub vendors: VendorMap,
    /// The generation service failed and the fallback plan was used.
    pub used_fallback: bool,
    /// The todo list did not come from a fully successful generation.
    pub used_fallback_todos: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_used: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Stage(#[from] StageError),
}

impl PipelineError {
    /// True for errors caused by the request itself.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingField(_) | Self::InvalidInput(_))
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PlacesSettings {
    pub api_key: String,
    pub base_url: String,
}

impl PlacesSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Resolved settings for building a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub generation_url: Option<String>,
    pub todo_url: Option<String>,
    /// Per-call timeout for every external service.
    pub timeout: Duration,
    /// `None` disables vendor enrichment.
    pub places: Option<PlacesSettings>,
    pub enrichment: EnrichmentConfig,
    pub fallback: FallbackConfig,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            generation_url: None,
            todo_url: None,
            timeout: upstream::DEFAULT_TIMEOUT,
            places: None,
            enrichment: EnrichmentConfig::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct GenerationPipeline {
    todos: TodoGenerator,
    generation: PlanGenerationClient,
    enricher: VendorEnricher,
    persistence: PlanPersistence,
}

impl GenerationPipeline {
    pub fn new(
        todos: TodoGenerator,
        generation: PlanGenerationClient,
        enricher: VendorEnricher,
        persistence: PlanPersistence,
    ) -> Self {
        Self {
            todos,
            generation,
            enricher,
            persistence,
        }
    }

    /// Wire up the HTTP clients described by `settings` over `store`.
    pub fn from_settings(settings: PipelineSettings, store: Arc<dyn DocumentStore>) -> anyhow::Result<Self> {
        settings
            .fallback
            .validate()
            .context("invalid [fallback] configuration")?;
        let http = upstream::build_http_client(settings.timeout)?;

        let directory = settings.places.map(|p| {
            Arc::new(GooglePlacesClient::new(http.clone(), p.base_url, p.api_key, settings.timeout))
                as Arc<dyn PlacesDirectory>
        });
        let enrichment = EnrichmentConfig {
            call_timeout: settings.timeout,
            ..settings.enrichment
        };

        Ok(Self::new(
            TodoGenerator::new(http.clone(), settings.todo_url, settings.timeout),
            PlanGenerationClient::new(http, settings.generation_url, settings.timeout, settings.fallback),
            VendorEnricher::new(directory, enrichment),
            PlanPersistence::new(store),
        ))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.persistence.store()
    }

    /// Run one request end to end.
    pub async fn run(&self, request: &GenerateRequest) -> Result<PlanResult, PipelineError> {
        let mut stages = StageTracker::new(request.user_id.clone().unwrap_or_default());

        let (user_id, raw, data) = match request.validate() {
            Ok(parts) => parts,
            Err(e) => {
                stages.advance(PipelineStage::Error)?;
                return Err(e);
            }
        };
        if let Err(e) = self.store().ping().await {
            stages.advance(PipelineStage::Error)?;
            return Err(PipelineError::StoreUnavailable(format!("{e:#}")));
        }
        let user_id = user_id.as_str();
        tracing::info!(run_id = %stages.run_id(), user_id, "generating preliminary plan");

        stages.advance(PipelineStage::NormalizingDate)?;
        let ctx = WeddingContext::from_profile(&data);

        stages.advance(PipelineStage::GeneratingTodos)?;
        stages.advance(PipelineStage::CallingGenerationService)?;
        let (todo_outcome, generation) = tokio::join!(
            self.todos.generate(user_id, &raw, &ctx),
            self.generation.generate(user_id, &ctx),
        );
        stages.advance(if generation.used_fallback {
            PipelineStage::Fallback
        } else {
            PipelineStage::Success
        })?;

        let now = Utc::now();
        let generated_todos = todos_from_values(&generation.plan.todos, now);
        let (todos, todos_from_template, template_used) = if !todo_outcome.used_fallback {
            (todo_outcome.todos, false, todo_outcome.template_used)
        } else if !generated_todos.is_empty() {
            (generated_todos, false, None)
        } else {
            (todo_outcome.todos, true, todo_outcome.template_used)
        };
        let used_fallback_todos = todos_from_template || generation.used_fallback;

        stages.advance(PipelineStage::EnrichingVendors)?;
        let seeds = seeds_from_value(
            &generation.plan.vendors,
            &ctx,
            &self.enricher.config().currency_symbol,
        );
        let vendors = self.enricher.enrich(&ctx, seeds).await;

        stages.advance(PipelineStage::Sanitizing)?;
        let budget = generation.plan.budget;
        let docs = PlanDocuments::build(
            PlanRecords {
                todos: &todos,
                budget: &budget,
                vendors: &vendors,
            },
            now,
        );

        stages.advance(PipelineStage::Persisting)?;
        if let Err(e) = self.persistence.persist(user_id, &docs).await {
            stages.advance(PipelineStage::Error)?;
            return Err(e.into());
        }
        stages.advance(PipelineStage::Done)?;

        tracing::info!(
            run_id = %stages.run_id(),
            user_id,
            todos = todos.len(),
            used_fallback = generation.used_fallback,
            used_fallback_todos,
            template = template_used.as_deref().unwrap_or("none"),
            "preliminary plan ready"
        );

        Ok(PlanResult {
            todos,
            budget,
            vendors,
            used_fallback: generation.used_fallback,
            used_fallback_todos,
            template_used,
        })
    }
}
