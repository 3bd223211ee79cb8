//! Writes a finished plan to the document store.
//!
//! Four records are written per user: the todo list, the budget, the vendor
//! recommendations, and a merge into the user document marking onboarding
//! complete. The first three go out concurrently and are all attempted even
//! when one fails. The user flag is written only after all three succeed.
//! There is no rollback.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::budget::Budget;
use crate::date::format_canonical;
use crate::sanitize::{sanitize, sanitize_each};
use crate::store::{Collection, DocumentStore};
use crate::todo::TodoItem;
use crate::vendors::VendorMap;

pub const TODO_LIST_NAME: &str = "Wedding Planning Checklist";
pub const TODO_LIST_DESCRIPTION: &str = "Your personalized wedding planning tasks";

/// A record that could not be written.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub collection: Collection,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to save plan records: {}", describe(.0))]
    Records(Vec<RecordFailure>),

    #[error("failed to mark onboarding complete: {0}")]
    UserFlag(String),
}

fn describe(failures: &[RecordFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.collection, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The parts of a plan that get stored.
#[derive(Debug, Clone, Copy)]
pub struct PlanRecords<'a> {
    pub todos: &'a [TodoItem],
    pub budget: &'a Budget,
    pub vendors: &'a VendorMap,
}

/// Sanitized documents ready to write.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDocuments {
    pub todo_list: Value,
    pub budget: Value,
    pub vendors: Value,
    /// Canonical timestamp stamped on every record.
    pub stamp: String,
}

impl PlanDocuments {
    /// Serialize and clean each part of the plan.
    pub fn build(plan: PlanRecords<'_>, now: DateTime<Utc>) -> Self {
        let stamp = format_canonical(now);
        Self {
            todo_list: todo_list_document(plan.todos, &stamp),
            budget: budget_document(plan.budget, &stamp),
            vendors: vendor_document(plan.vendors, &stamp),
            stamp,
        }
    }
}

pub struct PlanPersistence {
    store: Arc<dyn DocumentStore>,
}

impl PlanPersistence {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Write all four records for `user_id`.
    pub async fn persist(&self, user_id: &str, docs: &PlanDocuments) -> Result<(), PersistenceError> {
        let (todos, budget, vendors) = tokio::join!(
            self.store.set(Collection::TodoLists, user_id, &docs.todo_list),
            self.store.set(Collection::Budgets, user_id, &docs.budget),
            self.store.set(Collection::VendorRecommendations, user_id, &docs.vendors),
        );

        let failures: Vec<RecordFailure> = [
            (Collection::TodoLists, todos),
            (Collection::Budgets, budget),
            (Collection::VendorRecommendations, vendors),
        ]
        .into_iter()
        .filter_map(|(collection, result)| {
            result.err().map(|e| RecordFailure {
                collection,
                message: format!("{e:#}"),
            })
        })
        .collect();

        if !failures.is_empty() {
            for f in &failures {
                tracing::error!(user_id, collection = %f.collection, error = %f.message, "plan record write failed");
            }
            return Err(PersistenceError::Records(failures));
        }

        let flag = json!({
            "onboardingComplete": true,
            "onboardingCompletedAt": docs.stamp,
        });
        self.store
            .merge(Collection::Users, user_id, &flag)
            .await
            .map_err(|e| PersistenceError::UserFlag(format!("{e:#}")))?;

        tracing::info!(user_id, store = self.store.name(), "plan persisted");
        Ok(())
    }
}

fn todo_list_document(todos: &[TodoItem], stamp: &str) -> Value {
    let (todos, dropped) = sanitize_each(todos);
    if dropped > 0 {
        tracing::warn!(dropped, "todo items dropped during sanitization");
    }
    json!({
        "name": TODO_LIST_NAME,
        "description": TODO_LIST_DESCRIPTION,
        "todos": todos,
        "createdAt": stamp,
        "updatedAt": stamp,
    })
}

fn budget_document(budget: &Budget, stamp: &str) -> Value {
    let mut doc = match serde_json::to_value(budget).map(sanitize) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => Map::new(),
    };
    doc.insert("createdAt".to_string(), Value::from(stamp));
    doc.insert("updatedAt".to_string(), Value::from(stamp));
    Value::Object(doc)
}

fn vendor_document(vendors: &VendorMap, stamp: &str) -> Value {
    let mut by_category = Map::new();
    for (category, records) in vendors {
        let (cleaned, dropped) = sanitize_each(records);
        if dropped > 0 {
            tracing::warn!(category = %category, dropped, "vendor records dropped during sanitization");
        }
        by_category.insert(category.as_str().to_string(), Value::Array(cleaned));
    }
    json!({
        "vendors": by_category,
        "createdAt": stamp,
        "updatedAt": stamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetCategory;
    use crate::sanitize::is_clean;
    use crate::store::MemoryDocumentStore;
    use crate::vendors::complete;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn docs() -> PlanDocuments {
        let vendors = complete(VendorMap::new());
        PlanDocuments::build(
            PlanRecords { todos: &[], budget: &budget(), vendors: &vendors },
            now(),
        )
    }

    fn budget() -> Budget {
        Budget {
            total: 1000.0,
            categories: vec![BudgetCategory {
                name: "Venue".into(),
                amount: 1000.0,
                percentage: None,
                description: None,
            }],
        }
    }

    #[tokio::test]
    async fn writes_all_four_records() {
        let store = Arc::new(MemoryDocumentStore::new());
        let persistence = PlanPersistence::new(store.clone());
        persistence.persist("u1", &docs()).await.unwrap();

        assert_eq!(store.len().await, 4);
        let user = store.get(Collection::Users, "u1").await.unwrap().unwrap();
        assert_eq!(user["onboardingComplete"], true);
        assert_eq!(user["onboardingCompletedAt"], "2026-03-01T12:00:00.000Z");

        let budget_doc = store.get(Collection::Budgets, "u1").await.unwrap().unwrap();
        assert!(is_clean(&budget_doc));
        assert_eq!(budget_doc["total"], 1000.0);

        let vendor_doc = store.get(Collection::VendorRecommendations, "u1").await.unwrap().unwrap();
        assert_eq!(vendor_doc["vendors"].as_object().unwrap().len(), 5);

        let todo_doc = store.get(Collection::TodoLists, "u1").await.unwrap().unwrap();
        assert_eq!(todo_doc["name"], TODO_LIST_NAME);
    }

    #[tokio::test]
    async fn failed_record_skips_user_flag_but_attempts_siblings() {
        let store = Arc::new(MemoryDocumentStore::new().failing(Collection::Budgets));
        let persistence = PlanPersistence::new(store.clone());
        let err = persistence.persist("u1", &docs()).await.unwrap_err();

        match &err {
            PersistenceError::Records(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].collection, Collection::Budgets);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("budgets"));
        assert!(store.get(Collection::TodoLists, "u1").await.unwrap().is_some());
        assert!(store.get(Collection::VendorRecommendations, "u1").await.unwrap().is_some());
        assert!(store.get(Collection::Users, "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_flag_failure_is_reported() {
        let store = Arc::new(MemoryDocumentStore::new().failing(Collection::Users));
        let persistence = PlanPersistence::new(store);
        let err = persistence.persist("u1", &docs()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::UserFlag(_)));
    }

    #[test]
    fn nan_amounts_do_not_leave_nulls() {
        let mut b = budget();
        b.categories[0].amount = f64::NAN;
        let doc = budget_document(&b, "t");
        assert!(is_clean(&doc));
        assert!(doc["categories"][0].get("amount").is_none());
    }
}
