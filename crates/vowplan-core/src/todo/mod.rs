//! Todo list generation.
//!
//! [`TodoGenerator`] asks the todo-generation service for a personalised
//! checklist. Any failure (transport, status, malformed or empty body) falls
//! straight back to one of the built-in [`templates`]; there is no retry.

pub mod templates;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::context::WeddingContext;
use crate::upstream::{self, UpstreamError};

pub use templates::TodoTemplate;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "normal" => Ok(Self::Medium),
            "high" | "urgent" => Ok(Self::High),
            other => Err(PriorityParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Priority`] string.
#[derive(Debug, Clone)]
pub struct PriorityParseError(pub String);

impl fmt::Display for PriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid priority: {:?}", self.0)
    }
}

impl std::error::Error for PriorityParseError {}

/// One checklist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    /// `todo-{n}`, dense from 1 within a list.
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    pub priority: Priority,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assign `todo-1..n` in list order.
pub(crate) fn number_items(mut items: Vec<TodoItem>) -> Vec<TodoItem> {
    for (i, item) in items.iter_mut().enumerate() {
        item.id = format!("todo-{}", i + 1);
    }
    items
}

/// The todo list chosen for a request and where it came from.
#[derive(Debug, Clone)]
pub struct TodoOutcome {
    pub todos: Vec<TodoItem>,
    pub used_fallback: bool,
    pub template_used: Option<String>,
}

impl TodoOutcome {
    /// Built-in template for this context.
    pub fn from_template(ctx: &WeddingContext, now: DateTime<Utc>) -> Self {
        let template = TodoTemplate::select(ctx.has_concrete_date());
        let date = ctx.has_concrete_date().then_some(ctx.wedding_date.as_str());
        Self {
            todos: template.instantiate(date, now),
            used_fallback: true,
            template_used: Some(template.name().to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TodoServiceResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    todos: Option<TodoPayload>,
    #[serde(default)]
    template_used: Option<String>,
}

/// `{ todos: { todos: [...] } }`, tolerating a bare list as well.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TodoPayload {
    Nested { todos: Vec<Value> },
    List(Vec<Value>),
}

impl TodoPayload {
    fn into_items(self) -> Vec<Value> {
        match self {
            Self::Nested { todos } | Self::List(todos) => todos,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireTodo {
    #[serde(alias = "task", alias = "name")]
    title: Option<String>,
    #[serde(alias = "description", alias = "notes")]
    note: Option<String>,
    category: Option<String>,
    #[serde(alias = "dueDate")]
    deadline: Option<Value>,
    priority: Option<String>,
}

/// Convert loosely shaped todo objects into numbered [`TodoItem`]s.
///
/// Entries without a usable title are dropped.
pub fn todos_from_values(values: &[Value], now: DateTime<Utc>) -> Vec<TodoItem> {
    let items = values
        .iter()
        .filter_map(|v| serde_json::from_value::<WireTodo>(v.clone()).ok())
        .filter_map(|w| {
            let title = w.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
            Some(TodoItem {
                id: String::new(),
                title,
                note: w.note.filter(|n| !n.trim().is_empty()),
                category: w
                    .category
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| "Planning".to_string()),
                deadline: crate::date::normalize_json_date(w.deadline.as_ref()),
                priority: w
                    .priority
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(Priority::Medium),
                completed: false,
                created_at: now,
                updated_at: now,
            })
        })
        .collect();
    number_items(items)
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Client for the todo-generation service with template fallback.
#[derive(Debug, Clone)]
pub struct TodoGenerator {
    http: Client,
    endpoint: Option<String>,
    timeout: Duration,
}

impl TodoGenerator {
    /// `endpoint` of `None` means the service is not deployed; every request
    /// then uses a template.
    pub fn new(http: Client, endpoint: Option<String>, timeout: Duration) -> Self {
        Self {
            http,
            endpoint,
            timeout,
        }
    }

    /// Produce a todo list for the user. Never fails.
    pub async fn generate(
        &self,
        user_id: &str,
        wedding_data: &Value,
        ctx: &WeddingContext,
    ) -> TodoOutcome {
        let now = Utc::now();
        match self.request(user_id, wedding_data, now).await {
            Ok((todos, template_used)) => {
                tracing::info!(user_id, count = todos.len(), "todo service produced checklist");
                TodoOutcome {
                    todos,
                    used_fallback: false,
                    template_used,
                }
            }
            Err(e) => {
                let outcome = TodoOutcome::from_template(ctx, now);
                tracing::warn!(
                    user_id,
                    error = %e,
                    kind = e.kind(),
                    template = outcome.template_used.as_deref().unwrap_or_default(),
                    "todo service unavailable, using template"
                );
                outcome
            }
        }
    }

    async fn request(
        &self,
        user_id: &str,
        wedding_data: &Value,
        now: DateTime<Utc>,
    ) -> Result<(Vec<TodoItem>, Option<String>), UpstreamError> {
        let endpoint = self.endpoint.as_deref().ok_or(UpstreamError::NotConfigured)?;
        let body = json!({ "userId": user_id, "weddingData": wedding_data });
        let response: TodoServiceResponse =
            upstream::send_json(self.http.post(endpoint).json(&body), self.timeout).await?;

        if !response.success {
            return Err(UpstreamError::Malformed("success flag not set".into()));
        }
        let raw = response.todos.map(TodoPayload::into_items).unwrap_or_default();
        let todos = todos_from_values(&raw, now);
        if todos.is_empty() {
            return Err(UpstreamError::Malformed("no todos in response".into()));
        }
        Ok((todos, response.template_used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn priority_parses_synonyms() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("normal".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("someday".parse::<Priority>().is_err());
    }

    #[test]
    fn values_without_titles_are_dropped_and_ids_stay_dense() {
        let values = vec![
            json!({ "title": "Book the venue", "priority": "high", "category": "Venue" }),
            json!({ "note": "no title here" }),
            json!({ "task": "Hire a DJ", "dueDate": "2026-05-01" }),
            json!("not an object"),
        ];
        let todos = todos_from_values(&values, now());
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].id, "todo-1");
        assert_eq!(todos[0].priority, Priority::High);
        assert_eq!(todos[1].id, "todo-2");
        assert_eq!(todos[1].title, "Hire a DJ");
        assert_eq!(todos[1].category, "Planning");
        assert_eq!(todos[1].deadline.as_deref(), Some("2026-05-01"));
        assert!(todos.iter().all(|t| !t.completed));
    }

    #[test]
    fn payload_accepts_nested_and_flat_lists() {
        let nested: TodoServiceResponse =
            serde_json::from_value(json!({ "success": true, "todos": { "todos": [{ "title": "a" }] } }))
                .unwrap();
        assert_eq!(nested.todos.unwrap().into_items().len(), 1);

        let flat: TodoServiceResponse =
            serde_json::from_value(json!({ "success": true, "todos": [{ "title": "a" }, { "title": "b" }] }))
                .unwrap();
        assert_eq!(flat.todos.unwrap().into_items().len(), 2);
    }

    #[test]
    fn item_serializes_camel_case() {
        let todos = todos_from_values(&[json!({ "title": "x" })], now());
        let value = serde_json::to_value(&todos[0]).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("note").is_none());
        assert_eq!(value["priority"], "medium");
    }
}
