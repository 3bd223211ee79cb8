//! Shared plumbing for calls to external services.
//!
//! Every outbound request goes through [`send_json`], which applies the
//! per-call timeout and classifies failures into [`UpstreamError`]. Callers
//! never propagate these errors to the user; they log them and fall back.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

/// Default per-request timeout for external services.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a call to an external service produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The wrapped error never carries the request URL, which may hold an
    /// API key in its query string.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    #[error("service responded with status {0}")]
    Status(StatusCode),

    #[error("service returned an empty body")]
    EmptyBody,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("service is not configured")]
    NotConfigured,
}

impl UpstreamError {
    /// Wrap a transport failure, dropping the request URL from it.
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }

    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::EmptyBody => "empty_body",
            Self::Malformed(_) => "malformed",
            Self::NotConfigured => "not_configured",
        }
    }
}

/// Build the HTTP client shared by all outbound calls.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
    use anyhow::Context;

    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("vowplan/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

/// Run `fut` under `limit`, mapping expiry to [`UpstreamError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout(limit)),
    }
}

/// Send a request and return the raw body of a successful response.
///
/// Non-2xx statuses and blank bodies are errors.
pub async fn send_for_text(request: RequestBuilder, limit: Duration) -> Result<String, UpstreamError> {
    with_timeout(limit, async {
        let response = request.send().await.map_err(UpstreamError::transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }
        let body = response.text().await.map_err(UpstreamError::transport)?;
        if body.trim().is_empty() {
            return Err(UpstreamError::EmptyBody);
        }
        Ok(body)
    })
    .await
}

/// Send a request and decode a successful JSON response body.
pub async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    limit: Duration,
) -> Result<T, UpstreamError> {
    let body = send_for_text(request, limit).await?;
    serde_json::from_str(&body).map_err(|e| UpstreamError::Malformed(e.to_string()))
}
