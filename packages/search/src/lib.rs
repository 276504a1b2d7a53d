#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live business search used alongside the stored baselines.
//!
//! [`SearchClient`] wraps the remote search API with a persistent
//! response cache and transient-error retry. [`processing`] reduces the
//! raw responses to the figures compared against a baseline.

pub mod client;
pub mod config;
pub mod processing;
pub mod retry;

use dining_atlas_database::DbError;

pub use client::SearchClient;
pub use config::SearchService;
pub use processing::{BusinessDetails, Listing, ReviewExcerpt, SearchSummary, TopBusiness};

/// Errors that can occur during live search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response cache error.
    #[error("Cache error: {0}")]
    Cache(#[from] DbError),

    /// The cache lock was poisoned by a panicking holder.
    #[error("Response cache unavailable")]
    CacheUnavailable,

    /// The API key environment variable is not set.
    #[error("Missing API key: set {var}")]
    MissingApiKey {
        /// Name of the environment variable.
        var: String,
    },

    /// The API answered with a non-success status.
    #[error("API returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Service configuration error.
    #[error("Config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}
