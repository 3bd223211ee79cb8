//! Client for the plan-generation service.
//!
//! The service drafts a todo list, a budget and vendor suggestions from the
//! wedding context. Its response comes back either wrapped in a `data`
//! envelope or flat, sometimes inside a one-element array; [`GenerationResponse`]
//! names both shapes explicitly. Any failure yields the configured fallback
//! plan instead of an error.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value, json};

use crate::budget::{Budget, FallbackConfig};
use crate::context::WeddingContext;
use crate::upstream::{self, UpstreamError};

/// `requestType` sent with every call.
pub const REQUEST_TYPE: &str = "generate_preliminary";

/// The three parts of a drafted plan, defaulted when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedPlan {
    /// Raw todo objects, validated later by [`crate::todo::todos_from_values`].
    pub todos: Vec<Value>,
    pub budget: Budget,
    /// Vendor seeds keyed by category (names or records).
    pub vendors: Value,
}

/// Successful response, in whichever shape the service chose.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResponse {
    /// `{ "data": { todos, budget, vendors } }`
    Enveloped { data: Map<String, Value> },
    /// `{ todos, budget, vendors }`
    Flat(Map<String, Value>),
}

impl GenerationResponse {
    /// Classify a decoded body. A one-element array is unwrapped first.
    pub fn parse(body: Value) -> Result<Self, UpstreamError> {
        let body = match body {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            Value::Array(_) => return Err(UpstreamError::EmptyBody),
            other => other,
        };
        match body {
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Object(data)) => Ok(Self::Enveloped { data }),
                Some(other) => {
                    map.insert("data".to_string(), other);
                    Ok(Self::Flat(map))
                }
                None => Ok(Self::Flat(map)),
            },
            other => Err(UpstreamError::Malformed(format!(
                "expected an object, got {}",
                type_name(&other)
            ))),
        }
    }

    pub fn into_plan(self) -> GeneratedPlan {
        let mut fields = match self {
            Self::Enveloped { data } => data,
            Self::Flat(map) => map,
        };
        let todos = match fields.remove("todos") {
            Some(Value::Array(items)) => items,
            Some(Value::Object(mut nested)) => match nested.remove("todos") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        let budget = fields
            .get("budget")
            .map(Budget::from_value)
            .unwrap_or_default();
        let vendors = match fields.remove("vendors") {
            Some(v @ Value::Object(_)) => v,
            _ => Value::Object(Map::new()),
        };
        GeneratedPlan {
            todos,
            budget,
            vendors,
        }
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// What the generation step produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub plan: GeneratedPlan,
    pub used_fallback: bool,
}

/// Client for the plan-generation service.
#[derive(Debug, Clone)]
pub struct PlanGenerationClient {
    http: Client,
    endpoint: Option<String>,
    timeout: Duration,
    fallback: FallbackConfig,
}

impl PlanGenerationClient {
    pub fn new(
        http: Client,
        endpoint: Option<String>,
        timeout: Duration,
        fallback: FallbackConfig,
    ) -> Self {
        Self {
            http,
            endpoint,
            timeout,
            fallback,
        }
    }

    /// Ask the service for a plan; on any failure build the fallback plan.
    pub async fn generate(&self, user_id: &str, ctx: &WeddingContext) -> GenerationOutcome {
        match self.request(user_id, ctx).await {
            Ok(plan) => {
                tracing::info!(
                    user_id,
                    todos = plan.todos.len(),
                    budget_categories = plan.budget.categories.len(),
                    "generation service produced plan"
                );
                GenerationOutcome {
                    plan,
                    used_fallback: false,
                }
            }
            Err(e) => {
                tracing::warn!(
                    user_id,
                    error = %e,
                    kind = e.kind(),
                    "generation service failed, using fallback plan"
                );
                GenerationOutcome {
                    plan: fallback_plan(&self.fallback, ctx),
                    used_fallback: true,
                }
            }
        }
    }

    async fn request(&self, user_id: &str, ctx: &WeddingContext) -> Result<GeneratedPlan, UpstreamError> {
        let endpoint = self.endpoint.as_deref().ok_or(UpstreamError::NotConfigured)?;
        let body = json!([{
            "userId": user_id,
            "weddingContext": ctx,
            "requestType": REQUEST_TYPE,
        }]);
        let value: Value =
            upstream::send_json(self.http.post(endpoint).json(&body), self.timeout).await?;
        Ok(GenerationResponse::parse(value)?.into_plan())
    }
}

/// The plan used when the service gives us nothing: a percentage budget and
/// a vendor seed naming only the venue.
pub fn fallback_plan(config: &FallbackConfig, ctx: &WeddingContext) -> GeneratedPlan {
    let venue = ctx
        .venue_name
        .clone()
        .unwrap_or_else(|| config.default_venue_name.clone());
    GeneratedPlan {
        todos: Vec::new(),
        budget: config.budget(ctx.max_budget),
        vendors: json!({ "venues": [venue] }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WeddingData;

    fn ctx(value: Value) -> WeddingContext {
        let data: WeddingData = serde_json::from_value(value).unwrap();
        WeddingContext::from_profile(&data)
    }

    #[test]
    fn enveloped_and_flat_yield_same_plan() {
        let inner = json!({
            "todos": [{ "title": "Book venue" }],
            "budget": { "total": 1000, "categories": [{ "name": "Venue", "amount": 1000 }] },
            "vendors": { "venues": ["The Barn"] },
        });
        let enveloped = GenerationResponse::parse(json!({ "data": inner.clone() })).unwrap();
        assert!(matches!(enveloped, GenerationResponse::Enveloped { .. }));
        let flat = GenerationResponse::parse(inner).unwrap();
        assert!(matches!(flat, GenerationResponse::Flat(_)));
        assert_eq!(enveloped.into_plan(), flat.into_plan());
    }

    #[test]
    fn array_wrapped_response_is_unwrapped() {
        let parsed = GenerationResponse::parse(json!([{ "data": { "todos": [] } }])).unwrap();
        assert!(matches!(parsed, GenerationResponse::Enveloped { .. }));
        assert!(GenerationResponse::parse(json!([])).is_err());
    }

    #[test]
    fn non_object_body_is_malformed() {
        let err = GenerationResponse::parse(json!("nope")).unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn missing_parts_default_to_empty() {
        let plan = GenerationResponse::parse(json!({})).unwrap().into_plan();
        assert!(plan.todos.is_empty());
        assert_eq!(plan.budget, Budget::default());
        assert_eq!(plan.vendors, json!({}));
    }

    #[test]
    fn nested_todo_list_is_accepted() {
        let plan = GenerationResponse::parse(json!({ "todos": { "todos": [{ "title": "a" }] } }))
            .unwrap()
            .into_plan();
        assert_eq!(plan.todos.len(), 1);
    }

    #[test]
    fn fallback_plan_uses_profile_ceiling_and_venue() {
        let cfg = FallbackConfig::default();
        let plan = fallback_plan(&cfg, &ctx(json!({ "maxBudget": 30000, "venueName": "Rosewood" })));
        assert_eq!(plan.budget.total, 30_000.0);
        assert!(plan.budget.allocated() <= 30_000.0);
        assert_eq!(plan.vendors, json!({ "venues": ["Rosewood"] }));
    }

    #[test]
    fn fallback_plan_defaults_venue_and_ceiling() {
        let cfg = FallbackConfig::default();
        let plan = fallback_plan(&cfg, &ctx(json!({})));
        assert_eq!(plan.budget.total, 50_000.0);
        assert_eq!(plan.vendors, json!({ "venues": ["Your Dream Venue"] }));
    }

    #[tokio::test]
    async fn unconfigured_endpoint_falls_back() {
        let client = PlanGenerationClient::new(
            Client::new(),
            None,
            Duration::from_secs(1),
            FallbackConfig::default(),
        );
        let outcome = client.generate("u1", &ctx(json!({}))).await;
        assert!(outcome.used_fallback);
        assert_eq!(outcome.plan.budget.categories.len(), 5);
    }
}
