//! Inbound request shapes and the immutable wedding context built from them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::date::{self, UNDECIDED_DATE};

// ---------------------------------------------------------------------------
// Inbound profile
// ---------------------------------------------------------------------------

/// The `weddingData` object submitted at the end of onboarding.
///
/// Every field is optional on the wire; numeric fields also accept numeric
/// strings since older clients stored form input verbatim. Older field names
/// are read too, but the current name wins when both are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireProfile")]
pub struct WeddingData {
    pub user_name: Option<String>,
    pub partner_name: Option<String>,
    /// Raw date in any supported representation (see [`crate::date`]).
    pub wedding_date: Option<Value>,
    pub wedding_date_undecided: bool,
    pub wedding_location: Option<String>,
    pub venue_name: Option<String>,
    pub max_budget: Option<f64>,
    pub guest_count: Option<f64>,
    pub vibe: Vec<String>,
    pub additional_context: Option<String>,
}

/// Profile as sent, with legacy names kept as separate fields so a body
/// carrying both spellings still parses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireProfile {
    user_name: Option<String>,
    your_name: Option<String>,
    partner_name: Option<String>,
    wedding_date: Option<Value>,
    wedding_date_undecided: Option<bool>,
    wedding_location: Option<String>,
    location: Option<String>,
    venue_name: Option<String>,
    selected_venue_name: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    max_budget: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    budget: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    guest_count: Option<f64>,
    vibe: Option<Vec<String>>,
    styles: Option<Vec<String>>,
    additional_context: Option<String>,
}

impl From<WireProfile> for WeddingData {
    fn from(w: WireProfile) -> Self {
        Self {
            user_name: w.user_name.or(w.your_name),
            partner_name: w.partner_name,
            wedding_date: w.wedding_date,
            wedding_date_undecided: w.wedding_date_undecided.unwrap_or(false),
            wedding_location: w.wedding_location.or(w.location),
            venue_name: w.venue_name.or(w.selected_venue_name),
            max_budget: w.max_budget.or(w.budget),
            guest_count: w.guest_count,
            vibe: w.vibe.or(w.styles).unwrap_or_default(),
            additional_context: w.additional_context,
        }
    }
}

/// Accept a JSON number, a numeric string, or null.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

// ---------------------------------------------------------------------------
// Wedding context
// ---------------------------------------------------------------------------

/// Everything the pipeline knows about the wedding. Built once per request
/// and never modified afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeddingContext {
    pub user_name: String,
    pub partner_name: String,
    /// Canonical date string, or [`UNDECIDED_DATE`].
    pub wedding_date: String,
    pub wedding_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_count: Option<u32>,
    pub vibe: Vec<String>,
    pub additional_context: String,
    #[serde(skip)]
    has_date: bool,
}

impl WeddingContext {
    /// Build the context, normalizing the wedding date on the way.
    pub fn from_profile(data: &WeddingData) -> Self {
        let normalized = date::normalize_json_date(data.wedding_date.as_ref())
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let has_date = !data.wedding_date_undecided
            && normalized
                .as_deref()
                .is_some_and(|d| !d.eq_ignore_ascii_case(UNDECIDED_DATE));

        let wedding_date = if has_date {
            normalized.unwrap_or_else(|| UNDECIDED_DATE.to_string())
        } else {
            UNDECIDED_DATE.to_string()
        };

        Self {
            user_name: clean_text(data.user_name.as_deref()),
            partner_name: clean_text(data.partner_name.as_deref()),
            wedding_date,
            wedding_location: clean_text(data.wedding_location.as_deref()),
            venue_name: data
                .venue_name
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            max_budget: data.max_budget.filter(|b| *b > 0.0),
            guest_count: data
                .guest_count
                .filter(|g| *g >= 0.0)
                .map(|g| g.round().min(u32::MAX as f64) as u32),
            vibe: data
                .vibe
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
            additional_context: clean_text(data.additional_context.as_deref()),
            has_date,
        }
    }

    /// Whether the couple has settled on a concrete date.
    pub fn has_concrete_date(&self) -> bool {
        self.has_date
    }

    /// "Alex & Sam", falling back gracefully when a name is missing.
    pub fn couple_names(&self) -> String {
        match (self.user_name.is_empty(), self.partner_name.is_empty()) {
            (false, false) => format!("{} & {}", self.user_name, self.partner_name),
            (false, true) => self.user_name.clone(),
            (true, false) => self.partner_name.clone(),
            (true, true) => "The happy couple".to_string(),
        }
    }
}

fn clean_text(s: Option<&str>) -> String {
    s.map(str::trim).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> WeddingData {
        serde_json::from_value(value).expect("profile should parse")
    }

    #[test]
    fn undecided_profile_has_no_date() {
        let data = parse(json!({ "weddingDate": null, "weddingDateUndecided": true }));
        let ctx = WeddingContext::from_profile(&data);
        assert!(!ctx.has_concrete_date());
        assert_eq!(ctx.wedding_date, "TBD");
    }

    #[test]
    fn undecided_flag_wins_over_a_date() {
        let data = parse(json!({ "weddingDate": "2026-06-14", "weddingDateUndecided": true }));
        let ctx = WeddingContext::from_profile(&data);
        assert!(!ctx.has_concrete_date());
        assert_eq!(ctx.wedding_date, "TBD");
    }

    #[test]
    fn iso_date_is_concrete() {
        let data = parse(json!({ "weddingDate": "2026-06-14T00:00:00.000Z" }));
        let ctx = WeddingContext::from_profile(&data);
        assert!(ctx.has_concrete_date());
        assert_eq!(ctx.wedding_date, "2026-06-14T00:00:00.000Z");
    }

    #[test]
    fn timestamp_date_is_normalized() {
        let data = parse(json!({ "weddingDate": { "seconds": 1_781_395_200 } }));
        let ctx = WeddingContext::from_profile(&data);
        assert!(ctx.has_concrete_date());
        assert_eq!(ctx.wedding_date, "2026-06-14T00:00:00.000Z");
    }

    #[test]
    fn literal_tbd_is_not_concrete() {
        let data = parse(json!({ "weddingDate": "tbd" }));
        assert!(!WeddingContext::from_profile(&data).has_concrete_date());
    }

    #[test]
    fn numbers_accept_strings() {
        let data = parse(json!({ "maxBudget": "35,000", "guestCount": "120" }));
        assert_eq!(data.max_budget, Some(35_000.0));
        let ctx = WeddingContext::from_profile(&data);
        assert_eq!(ctx.guest_count, Some(120));
    }

    #[test]
    fn non_positive_budget_is_absent() {
        let data = parse(json!({ "maxBudget": 0 }));
        assert_eq!(WeddingContext::from_profile(&data).max_budget, None);
    }

    #[test]
    fn aliases_are_accepted() {
        let data = parse(json!({ "yourName": "Alex", "location": "Austin, TX", "styles": ["rustic", " "] }));
        let ctx = WeddingContext::from_profile(&data);
        assert_eq!(ctx.user_name, "Alex");
        assert_eq!(ctx.wedding_location, "Austin, TX");
        assert_eq!(ctx.vibe, vec!["rustic".to_string()]);
    }

    #[test]
    fn current_and_legacy_names_together_prefer_current() {
        let data = parse(json!({
            "userName": "Alex",
            "yourName": "Old Alex",
            "weddingLocation": "Austin, TX",
            "location": "Somewhere else",
            "maxBudget": 30000,
            "budget": "10,000",
            "vibe": ["boho"],
            "styles": ["rustic"],
            "venueName": "The Barn",
            "selectedVenueName": "Old Barn"
        }));
        assert_eq!(data.user_name.as_deref(), Some("Alex"));
        assert_eq!(data.wedding_location.as_deref(), Some("Austin, TX"));
        assert_eq!(data.max_budget, Some(30_000.0));
        assert_eq!(data.vibe, vec!["boho".to_string()]);
        assert_eq!(data.venue_name.as_deref(), Some("The Barn"));
    }

    #[test]
    fn legacy_name_fills_in_for_null_current_name() {
        let data = parse(json!({ "weddingLocation": null, "location": "Austin, TX", "budget": 12000 }));
        assert_eq!(data.wedding_location.as_deref(), Some("Austin, TX"));
        assert_eq!(data.max_budget, Some(12_000.0));
    }

    #[test]
    fn couple_names_handles_missing_halves() {
        let mut data = WeddingData {
            user_name: Some("Alex".into()),
            partner_name: Some("Sam".into()),
            ..Default::default()
        };
        assert_eq!(WeddingContext::from_profile(&data).couple_names(), "Alex & Sam");
        data.partner_name = None;
        assert_eq!(WeddingContext::from_profile(&data).couple_names(), "Alex");
    }

    #[test]
    fn serializes_camel_case_without_internal_flag() {
        let data = parse(json!({ "userName": "Alex", "weddingLocation": "Austin" }));
        let value = serde_json::to_value(WeddingContext::from_profile(&data)).unwrap();
        assert_eq!(value["userName"], "Alex");
        assert_eq!(value["weddingDate"], "TBD");
        assert!(value.get("hasDate").is_none());
        assert!(value.get("venueName").is_none());
    }
}
