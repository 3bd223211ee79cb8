//! Budget breakdown types and the configurable fallback budget.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of the budget breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategory {
    pub name: String,
    /// Allocated amount; never negative.
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub total: f64,
    pub categories: Vec<BudgetCategory>,
}

impl Budget {
    pub fn allocated(&self) -> f64 {
        self.categories.iter().map(|c| c.amount).sum()
    }

    /// Validate a loosely shaped budget from the generation service.
    ///
    /// Accepts `{ total, categories: [...] }` or a bare category list.
    /// Categories without a name are dropped and negative or missing amounts
    /// become zero. A missing total is the sum of the categories.
    pub fn from_value(value: &Value) -> Self {
        let (total, raw_categories) = match value {
            Value::Array(items) => (None, items.as_slice()),
            Value::Object(map) => (
                map.get("total")
                    .or_else(|| map.get("totalBudget"))
                    .and_then(number),
                map.get("categories")
                    .or_else(|| map.get("breakdown"))
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default(),
            ),
            _ => (None, &[][..]),
        };

        let categories: Vec<BudgetCategory> = raw_categories
            .iter()
            .filter_map(|c| {
                let name = c
                    .get("name")
                    .or_else(|| c.get("category"))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|n| !n.is_empty())?;
                Some(BudgetCategory {
                    name: name.to_string(),
                    amount: c
                        .get("amount")
                        .or_else(|| c.get("allocated"))
                        .and_then(number)
                        .unwrap_or(0.0)
                        .max(0.0),
                    percentage: c.get("percentage").and_then(number).filter(|p| *p >= 0.0),
                    description: c
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
            })
            .collect();

        let total = total
            .filter(|t| *t >= 0.0)
            .unwrap_or_else(|| categories.iter().map(|c| c.amount).sum());
        Self { total, categories }
    }
}

fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(['$', ','], "").parse().ok(),
        _ => None,
    };
    n.filter(|n: &f64| n.is_finite())
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// One share of the fallback split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetShare {
    pub name: String,
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Values used when the generation service gives us nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Budget ceiling used when the profile has none.
    pub budget_ceiling: f64,
    /// Placeholder venue listed when the profile names none.
    pub default_venue_name: String,
    pub budget_split: Vec<BudgetShare>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        let share = |name: &str, percentage: f64, description: &str| BudgetShare {
            name: name.to_string(),
            percentage,
            description: Some(description.to_string()),
        };
        Self {
            budget_ceiling: 50_000.0,
            default_venue_name: "Your Dream Venue".to_string(),
            budget_split: vec![
                share("Venue", 40.0, "Ceremony and reception space"),
                share("Catering", 30.0, "Food, drinks, and service"),
                share("Photography", 15.0, "Photo and video coverage"),
                share("Flowers & Decor", 8.0, "Florals, lighting, and styling"),
                share("Music & Entertainment", 7.0, "Band, DJ, and ceremony music"),
            ],
        }
    }
}

/// Reasons a [`FallbackConfig`] is rejected.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FallbackConfigError {
    #[error("fallback budget ceiling must be positive, got {0}")]
    NonPositiveCeiling(f64),

    #[error("fallback share {name:?} has invalid percentage {percentage}")]
    InvalidShare { name: String, percentage: f64 },

    #[error("fallback shares sum to {0}%, which exceeds 100%")]
    OverAllocated(f64),
}

impl FallbackConfig {
    pub fn validate(&self) -> Result<(), FallbackConfigError> {
        if !(self.budget_ceiling.is_finite() && self.budget_ceiling > 0.0) {
            return Err(FallbackConfigError::NonPositiveCeiling(self.budget_ceiling));
        }
        for share in &self.budget_split {
            if !(share.percentage.is_finite() && share.percentage >= 0.0) {
                return Err(FallbackConfigError::InvalidShare {
                    name: share.name.clone(),
                    percentage: share.percentage,
                });
            }
        }
        let sum: f64 = self.budget_split.iter().map(|s| s.percentage).sum();
        // Tolerate float noise from splits like 33.3 / 33.3 / 33.4.
        if sum > 100.0 + 1e-9 {
            return Err(FallbackConfigError::OverAllocated(sum));
        }
        Ok(())
    }

    /// Synthesize a budget as percentages of `ceiling` (or the configured
    /// default ceiling when the user gave none).
    ///
    /// Amounts are floored to whole currency units, so they never sum to more
    /// than the ceiling.
    pub fn budget(&self, ceiling: Option<f64>) -> Budget {
        let total = ceiling
            .filter(|c| c.is_finite() && *c > 0.0)
            .unwrap_or(self.budget_ceiling);
        let categories = self
            .budget_split
            .iter()
            .map(|s| BudgetCategory {
                name: s.name.clone(),
                amount: (total * s.percentage / 100.0).floor(),
                percentage: Some(s.percentage),
                description: s.description.clone(),
            })
            .collect();
        Budget { total, categories }
    }
}
