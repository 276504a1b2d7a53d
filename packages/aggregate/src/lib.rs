#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Offline aggregation of a business dataset into geography summaries.
//!
//! The batch pass reads newline-delimited business records
//! ([`dataset`]), decodes their attribute blobs ([`attributes`]), folds
//! them into city and zip rollups ([`aggregator`]) and finally ranks the
//! counters into storable rows ([`finalize`]).

pub mod aggregator;
pub mod attributes;
pub mod dataset;
pub mod finalize;
pub mod progress;

pub use aggregator::{DatasetStats, GeoAccumulator, GeoAggregator, GeoRollup};
pub use dataset::{LoadStats, aggregate_file};
pub use finalize::FinalizedSummaries;

/// Errors that can occur during the batch pass.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// Reading the dataset failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
