//! Vendor recommendations.
//!
//! The generation step hands us loose vendor seeds (plain names or partial
//! records). [`VendorEnricher`] searches a [`PlacesDirectory`] for each of the
//! five categories and replaces the seeds with directory records whenever the
//! search comes back non-empty. Failures degrade per result and per category;
//! the output always carries all five categories.

pub mod places;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::context::WeddingContext;
use crate::upstream::{self, UpstreamError};

pub use places::{Coordinates, GooglePlacesClient, PlaceDetails, PlaceSummary, PlacesDirectory, ReviewExcerpt};

/// Shown when the directory reports no price level.
pub const UNKNOWN_PRICE: &str = "Contact for pricing";

// ---------------------------------------------------------------------------
// VendorCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorCategory {
    Venues,
    Photographers,
    Florists,
    Caterers,
    Music,
}

impl VendorCategory {
    pub const ALL: [Self; 5] = [
        Self::Venues,
        Self::Photographers,
        Self::Florists,
        Self::Caterers,
        Self::Music,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Venues => "venues",
            Self::Photographers => "photographers",
            Self::Florists => "florists",
            Self::Caterers => "caterers",
            Self::Music => "music",
        }
    }

    /// Display label stored on each record.
    pub fn label(self) -> &'static str {
        match self {
            Self::Venues => "Venue",
            Self::Photographers => "Photographer",
            Self::Florists => "Florist",
            Self::Caterers => "Caterer",
            Self::Music => "Music",
        }
    }

    pub fn search_term(self) -> &'static str {
        match self {
            Self::Venues => "wedding venues",
            Self::Photographers => "wedding photographers",
            Self::Florists => "wedding florists",
            Self::Caterers => "wedding caterers",
            Self::Music => "wedding DJs and bands",
        }
    }
}

impl fmt::Display for VendorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VendorCategory {
    type Err = VendorCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "venues" | "venue" => Ok(Self::Venues),
            "photographers" | "photographer" | "photography" => Ok(Self::Photographers),
            "florists" | "florist" | "flowers" => Ok(Self::Florists),
            "caterers" | "caterer" | "catering" => Ok(Self::Caterers),
            "music" | "musicians" | "entertainment" | "djs" => Ok(Self::Music),
            other => Err(VendorCategoryParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`VendorCategory`] string.
#[derive(Debug, Clone)]
pub struct VendorCategoryParseError(pub String);

impl fmt::Display for VendorCategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid vendor category: {:?}", self.0)
    }
}

impl std::error::Error for VendorCategoryParseError {}

// ---------------------------------------------------------------------------
// VendorRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: String,
    pub rating: f64,
    pub review_count: u32,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hours: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<ReviewExcerpt>,
}

/// Vendors keyed by category, iterated in [`VendorCategory::ALL`] order.
pub type VendorMap = BTreeMap<VendorCategory, Vec<VendorRecord>>;

/// Fill in an empty list for every category missing from `map`.
pub fn complete(mut map: VendorMap) -> VendorMap {
    for category in VendorCategory::ALL {
        map.entry(category).or_default();
    }
    map
}

/// `"$"` repeated `level` times, or [`UNKNOWN_PRICE`].
pub fn price_label(symbol: &str, level: Option<u8>) -> String {
    match level {
        Some(n) if n > 0 => symbol.repeat(usize::from(n)),
        _ => UNKNOWN_PRICE.to_string(),
    }
}

/// Clamp to 0..=5 and round to two decimals.
pub fn round_rating(rating: f64) -> f64 {
    if !rating.is_finite() {
        return 0.0;
    }
    (rating.clamp(0.0, 5.0) * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Seeds
// ---------------------------------------------------------------------------

/// A vendor suggestion from the generation step.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedVendor {
    Name(String),
    Record(Box<WireVendor>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireVendor {
    id: Option<String>,
    #[serde(alias = "title")]
    name: Option<String>,
    price: Option<String>,
    price_level: Option<u8>,
    rating: Option<f64>,
    review_count: Option<u32>,
    location: Option<String>,
    address: Option<String>,
    website: Option<String>,
    phone: Option<String>,
}

/// Turn the generation step's vendor object into records.
///
/// Unknown category keys and unusable entries are skipped. Name-only
/// suggestions get a synthetic id and a random rating between 4.0 and 5.0.
pub fn seeds_from_value(value: &Value, ctx: &WeddingContext, currency_symbol: &str) -> VendorMap {
    let mut map = VendorMap::new();
    let Some(object) = value.as_object() else {
        return complete(map);
    };
    let mut rng = rand::rng();

    for (key, entries) in object {
        let Ok(category) = key.parse::<VendorCategory>() else {
            tracing::debug!(key, "ignoring unknown vendor category");
            continue;
        };
        let Some(entries) = entries.as_array() else {
            continue;
        };
        let records = map.entry(category).or_default();
        for entry in entries {
            let Ok(seed) = serde_json::from_value::<SeedVendor>(entry.clone()) else {
                continue;
            };
            let index = records.len();
            let record = match seed {
                SeedVendor::Name(name) => {
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    VendorRecord {
                        id: format!("{category}-{index}"),
                        name: name.to_string(),
                        category: category.label().to_string(),
                        price: UNKNOWN_PRICE.to_string(),
                        rating: round_rating(rng.random_range(4.0..=5.0)),
                        review_count: 0,
                        location: ctx.wedding_location.clone(),
                        address: None,
                        website: None,
                        phone: None,
                        coordinates: None,
                        hours: Vec::new(),
                        images: Vec::new(),
                        reviews: Vec::new(),
                    }
                }
                SeedVendor::Record(wire) => {
                    let Some(name) = wire.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
                        continue;
                    };
                    VendorRecord {
                        id: wire
                            .id
                            .clone()
                            .filter(|id| !id.trim().is_empty())
                            .unwrap_or_else(|| format!("{category}-{index}")),
                        name: name.to_string(),
                        category: category.label().to_string(),
                        price: wire
                            .price
                            .clone()
                            .filter(|p| !p.trim().is_empty())
                            .unwrap_or_else(|| price_label(currency_symbol, wire.price_level)),
                        rating: match wire.rating {
                            Some(r) => round_rating(r),
                            None => round_rating(rng.random_range(4.0..=5.0)),
                        },
                        review_count: wire.review_count.unwrap_or(0),
                        location: wire
                            .location
                            .clone()
                            .unwrap_or_else(|| ctx.wedding_location.clone()),
                        address: wire.address.clone(),
                        website: wire.website.clone(),
                        phone: wire.phone.clone(),
                        coordinates: None,
                        hours: Vec::new(),
                        images: Vec::new(),
                        reviews: Vec::new(),
                    }
                }
            };
            records.push(record);
        }
    }
    complete(map)
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Search results kept per category.
    pub max_results: usize,
    /// Detail fetches in flight per category.
    pub detail_concurrency: usize,
    /// Directory calls in flight across all categories of one invocation.
    pub max_in_flight: usize,
    pub call_timeout: Duration,
    /// Rating used when the directory reports none.
    pub default_rating: f64,
    pub currency_symbol: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            detail_concurrency: 3,
            max_in_flight: 5,
            call_timeout: upstream::DEFAULT_TIMEOUT,
            default_rating: 4.5,
            currency_symbol: "$".to_string(),
        }
    }
}

/// Replaces vendor seeds with directory records.
pub struct VendorEnricher {
    directory: Option<Arc<dyn PlacesDirectory>>,
    config: EnrichmentConfig,
}

impl VendorEnricher {
    /// `directory` of `None` disables enrichment; seeds pass through.
    pub fn new(directory: Option<Arc<dyn PlacesDirectory>>, config: EnrichmentConfig) -> Self {
        Self { directory, config }
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Enrich every category concurrently. Never fails; the result always
    /// has all five categories.
    pub async fn enrich(&self, ctx: &WeddingContext, seeds: VendorMap) -> VendorMap {
        let mut vendors = complete(seeds);
        let Some(directory) = self.directory.as_deref() else {
            tracing::info!("no places directory configured, keeping vendor seeds");
            return vendors;
        };
        let location = ctx.wedding_location.as_str();
        if location.is_empty() {
            tracing::info!("no wedding location, skipping vendor search");
            return vendors;
        }

        let semaphore = Semaphore::new(self.config.max_in_flight.max(1));
        let permits = &semaphore;
        let results = join_all(
            VendorCategory::ALL
                .into_iter()
                .map(|category| async move {
                    let result = self
                        .enrich_category(directory, category, location, permits)
                        .await;
                    (category, result)
                })
                .collect::<Vec<_>>(),
        )
        .await;

        for (category, result) in results {
            match result {
                Ok(records) if !records.is_empty() => {
                    tracing::info!(
                        category = %category,
                        count = records.len(),
                        directory = directory.name(),
                        "vendors enriched"
                    );
                    vendors.insert(category, records);
                }
                Ok(_) => {
                    tracing::info!(category = %category, "directory returned no vendors, keeping seeds");
                }
                Err(e) => {
                    tracing::warn!(
                        category = %category,
                        error = %e,
                        kind = e.kind(),
                        "vendor search failed, keeping seeds"
                    );
                }
            }
        }
        vendors
    }

    async fn enrich_category(
        &self,
        directory: &dyn PlacesDirectory,
        category: VendorCategory,
        location: &str,
        permits: &Semaphore,
    ) -> Result<Vec<VendorRecord>, UpstreamError> {
        let query = format!("{} in {location}", category.search_term());
        let hits = {
            let _permit = permits.acquire().await.ok();
            upstream::with_timeout(self.config.call_timeout, directory.search(&query)).await?
        };

        let records = futures::stream::iter(hits.into_iter().take(self.config.max_results))
            .map(|hit| async move {
                let details = {
                    let _permit = permits.acquire().await.ok();
                    upstream::with_timeout(self.config.call_timeout, directory.details(&hit.place_id))
                        .await
                };
                match details {
                    Ok(details) => self.record_from_place(category, location, &hit, Some(details)),
                    Err(e) => {
                        tracing::warn!(
                            category = %category,
                            place_id = %hit.place_id,
                            error = %e,
                            "detail lookup failed, using search fields"
                        );
                        self.record_from_place(category, location, &hit, None)
                    }
                }
            })
            .buffered(self.config.detail_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        Ok(records)
    }

    fn record_from_place(
        &self,
        category: VendorCategory,
        location: &str,
        hit: &PlaceSummary,
        details: Option<PlaceDetails>,
    ) -> VendorRecord {
        let details = details.unwrap_or_default();
        VendorRecord {
            id: hit.place_id.clone(),
            name: hit.name.clone(),
            category: category.label().to_string(),
            price: price_label(&self.config.currency_symbol, hit.price_level),
            rating: round_rating(hit.rating.unwrap_or(self.config.default_rating)),
            review_count: hit.review_count.unwrap_or(0),
            location: location.to_string(),
            address: details.formatted_address.or_else(|| hit.address.clone()),
            website: details.website,
            phone: details.phone,
            coordinates: details.coordinates,
            hours: details.hours,
            images: details.photos,
            reviews: details.reviews,
        }
    }
}
