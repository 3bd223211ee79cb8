//! Places directory access.
//!
//! The directory is a two-stage API: a text search returning candidate
//! places, then a detail lookup per place. [`PlacesDirectory`] is the seam
//! the enricher talks to; [`GooglePlacesClient`] implements it against the
//! Places web service (`textsearch/json`, `details/json`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::upstream::{self, UpstreamError};

/// Default Places web service root.
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Detail fields requested per place.
const DETAIL_FIELDS: &str = "formatted_phone_number,website,opening_hours,geometry,reviews,photos,formatted_address";

/// Longest review excerpt kept, in characters.
const REVIEW_EXCERPT_CHARS: usize = 280;

/// Most reviews kept per place.
const MAX_REVIEWS: usize = 3;

/// Most photos kept per place.
const MAX_PHOTOS: usize = 5;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewExcerpt {
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_time: Option<String>,
}

/// A search hit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceSummary {
    pub place_id: String,
    pub name: String,
    /// Vicinity or formatted address, whichever the directory returned.
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub price_level: Option<u8>,
}

/// Per-place detail fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDetails {
    pub formatted_address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub hours: Vec<String>,
    pub coordinates: Option<Coordinates>,
    pub reviews: Vec<ReviewExcerpt>,
    /// Photo URLs (without credentials).
    pub photos: Vec<String>,
}

/// A read-only, idempotent places directory.
#[async_trait]
pub trait PlacesDirectory: Send + Sync {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// Free-text search. An empty result set is `Ok(vec![])`.
    async fn search(&self, query: &str) -> Result<Vec<PlaceSummary>, UpstreamError>;

    /// Detail lookup for one place id.
    async fn details(&self, place_id: &str) -> Result<PlaceDetails, UpstreamError>;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<WirePlace>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePlace {
    place_id: Option<String>,
    name: Option<String>,
    vicinity: Option<String>,
    formatted_address: Option<String>,
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
    price_level: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    result: Option<WireDetails>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireDetails {
    formatted_address: Option<String>,
    formatted_phone_number: Option<String>,
    website: Option<String>,
    opening_hours: Option<WireHours>,
    geometry: Option<WireGeometry>,
    reviews: Vec<WireReview>,
    photos: Vec<WirePhoto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireHours {
    weekday_text: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireGeometry {
    location: Option<Coordinates>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireReview {
    author_name: Option<String>,
    rating: Option<f64>,
    text: Option<String>,
    relative_time_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePhoto {
    photo_reference: String,
}

/// Map a directory status to an error, treating `OK` and `ZERO_RESULTS`
/// as success.
fn check_status(status: &str, message: Option<&str>) -> Result<(), UpstreamError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(UpstreamError::Malformed(match message {
            Some(m) => format!("directory status {other}: {m}"),
            None => format!("directory status {other}"),
        })),
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= REVIEW_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(REVIEW_EXCERPT_CHARS).collect();
    cut.push('…');
    cut
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// [`PlacesDirectory`] backed by the Places web service.
#[derive(Debug, Clone)]
pub struct GooglePlacesClient {
    http: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GooglePlacesClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        }
    }

    fn photo_url(&self, reference: &str) -> String {
        format!("{}/photo?maxwidth=800&photo_reference={reference}", self.base_url)
    }
}

#[async_trait]
impl PlacesDirectory for GooglePlacesClient {
    fn name(&self) -> &str {
        "google-places"
    }

    async fn search(&self, query: &str) -> Result<Vec<PlaceSummary>, UpstreamError> {
        let request = self
            .http
            .get(format!("{}/textsearch/json", self.base_url))
            .query(&[("query", query), ("key", self.api_key.as_str())]);
        let response: TextSearchResponse = upstream::send_json(request, self.timeout).await?;
        check_status(&response.status, response.error_message.as_deref())?;

        Ok(response
            .results
            .into_iter()
            .filter_map(|p| {
                Some(PlaceSummary {
                    place_id: p.place_id?,
                    name: p.name?,
                    address: p.vicinity.or(p.formatted_address),
                    rating: p.rating,
                    review_count: p.user_ratings_total,
                    price_level: p.price_level,
                })
            })
            .collect())
    }

    async fn details(&self, place_id: &str) -> Result<PlaceDetails, UpstreamError> {
        let request = self
            .http
            .get(format!("{}/details/json", self.base_url))
            .query(&[
                ("place_id", place_id),
                ("fields", DETAIL_FIELDS),
                ("key", self.api_key.as_str()),
            ]);
        let response: DetailsResponse = upstream::send_json(request, self.timeout).await?;
        check_status(&response.status, response.error_message.as_deref())?;
        let d = response
            .result
            .ok_or_else(|| UpstreamError::Malformed(format!("no detail result for {place_id}")))?;

        Ok(PlaceDetails {
            formatted_address: d.formatted_address,
            phone: d.formatted_phone_number,
            website: d.website,
            hours: d.opening_hours.map(|h| h.weekday_text).unwrap_or_default(),
            coordinates: d.geometry.and_then(|g| g.location),
            reviews: d
                .reviews
                .into_iter()
                .filter_map(|r| {
                    let text = r.text.filter(|t| !t.trim().is_empty())?;
                    Some(ReviewExcerpt {
                        author: r.author_name.unwrap_or_else(|| "Anonymous".to_string()),
                        rating: r.rating,
                        text: excerpt(&text),
                        relative_time: r.relative_time_description,
                    })
                })
                .take(MAX_REVIEWS)
                .collect(),
            photos: d
                .photos
                .iter()
                .take(MAX_PHOTOS)
                .map(|p| self.photo_url(&p.photo_reference))
                .collect(),
        })
    }
}
