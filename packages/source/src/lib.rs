#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Remote data acquisition for the atlas pipeline.
//!
//! Two fetchers: [`wfs`] retrieves boundary geometry page-by-page from
//! a WFS endpoint with per-source memoization, and [`cbs`] retrieves
//! the municipal statistics table from the CBS OData API.
//!
//! There is deliberately no retry/backoff layer: a transport failure
//! aborts the run, since every downstream layer depends on the same
//! boundary geometry. Callers that want retries wrap the calls
//! themselves.

pub mod cbs;
pub mod wfs;

use std::time::Duration;

/// Per-request transport timeout. A request exceeding this surfaces as
/// [`SourceError::Http`].
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur while talking to remote sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (unreachable endpoint, timeout, bad status).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response parsed as JSON but lacked the expected shape.
    #[error("Unexpected response shape: {message}")]
    Schema {
        /// Description of what was missing or malformed.
        message: String,
    },

    /// The payload declared a coordinate reference system the pipeline
    /// cannot convert.
    #[error(transparent)]
    Crs(#[from] nl_atlas_spatial::SpatialError),
}

/// Options shared by all fetch operations.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Stop fetching once at least this many records have arrived.
    /// Useful for smoke runs; `None` fetches everything.
    pub limit: Option<u64>,
}

/// Builds the shared HTTP client with the per-request timeout applied.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the TLS backend fails to initialize.
pub fn build_http_client() -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}
