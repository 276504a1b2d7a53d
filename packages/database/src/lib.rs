#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` persistence for the dining atlas.
//!
//! Holds the finalized per-city and per-zip summaries
//! ([`summary_store`]) and the live search response cache
//! ([`response_cache`]). Both live in separate `DuckDB` files under the
//! data directory ([`paths`]).

pub mod paths;
pub mod response_cache;
pub mod summary_store;

pub use response_cache::{ResponseCache, cache_key};
pub use summary_store::{DuckDbSummaryStore, SummaryStore};

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Filesystem error while preparing the data directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
