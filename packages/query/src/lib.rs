#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query-time comparison baselines.
//!
//! Resolves a user-entered location to the stored summary rows that
//! describe it and merges those rows into a single [`QueryBaseline`].
//! Nothing here writes to the store.
//!
//! [`QueryBaseline`]: dining_atlas_summary_models::QueryBaseline

pub mod merger;

use dining_atlas_database::DbError;
use serde::Serialize;

pub use merger::{QueryTimeMerger, ResolvedRows, merge_rows};

/// Errors that can occur while building a baseline.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Summary store error.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// The location was blank.
    #[error("Location must not be empty")]
    EmptyLocation,
}

/// A location to resolve against the summary store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LocationQuery {
    /// City name or prefix of a `"City,ST"` key.
    City(String),
    /// Full or partial zip code.
    Zip(String),
}

impl LocationQuery {
    /// Builds a query from raw input.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyLocation`] if `location` is blank.
    pub fn parse(location: &str, by_zip: bool) -> Result<Self, QueryError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(QueryError::EmptyLocation);
        }
        Ok(if by_zip {
            Self::Zip(location.to_string())
        } else {
            Self::City(location.to_string())
        })
    }

    /// The location text as entered (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::City(s) | Self::Zip(s) => s,
        }
    }
}
