use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Named group of documents. Every per-user record lives in one of these,
/// keyed by the user's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Users,
    TodoLists,
    Budgets,
    VendorRecommendations,
}

impl Collection {
    /// All collections, in the order records are written during onboarding.
    pub const ALL: [Collection; 4] = [
        Collection::TodoLists,
        Collection::Budgets,
        Collection::VendorRecommendations,
        Collection::Users,
    ];

    /// Name stored in the `collection` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::TodoLists => "todoLists",
            Self::Budgets => "budgets",
            Self::VendorRecommendations => "vendorRecommendations",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = CollectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(Self::Users),
            "todoLists" => Ok(Self::TodoLists),
            "budgets" => Ok(Self::Budgets),
            "vendorRecommendations" => Ok(Self::VendorRecommendations),
            other => Err(CollectionParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Collection`] string.
#[derive(Debug, Clone)]
pub struct CollectionParseError(pub String);

impl fmt::Display for CollectionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid collection: {:?}", self.0)
    }
}

impl std::error::Error for CollectionParseError {}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A stored document row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub collection: String,
    pub key: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
