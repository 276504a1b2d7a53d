#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Finalized per-geography summaries and query-time baselines.
//!
//! [`CitySummary`] and [`ZipSummary`] are produced once per batch run and
//! persisted. A [`QueryBaseline`] is assembled from one or more stored rows
//! for a single interactive query and then discarded.

pub mod average;
pub mod counter;

use dining_atlas_business_models::Facet;
use serde::{Deserialize, Serialize};

pub use average::{Average, DATA_NOT_AVAILABLE, RunningAverage, round2};
pub use counter::FacetCounter;

/// Placeholder for a facet or category slot with no value.
pub const NOT_APPLICABLE: &str = "N/A";

/// Value stored for zip-level averages that had no samples.
pub const ZIP_SENTINEL: f64 = -1.0;

/// Number of category slots kept per summary row.
pub const TOP_CATEGORY_COUNT: usize = 3;

/// Entries per ranked distribution list shown beside a comparison.
pub const DISTRIBUTION_SIZE: usize = 10;

/// Ranked categorical outputs shared by city and zip rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSummary {
    /// Up to three categories, most frequent first.
    pub top_categories: Vec<String>,
    /// Most common ambience type, or `"N/A"`.
    pub top_ambience: String,
    /// Most common parking type, or `"N/A"`.
    pub top_parking: String,
    /// Most common music type, or `"N/A"`.
    pub top_music: String,
    /// Most common dietary accommodation, or `"N/A"`.
    pub top_dietary_restriction: String,
}

impl Default for FacetSummary {
    fn default() -> Self {
        Self {
            top_categories: Vec::new(),
            top_ambience: NOT_APPLICABLE.to_string(),
            top_parking: NOT_APPLICABLE.to_string(),
            top_music: NOT_APPLICABLE.to_string(),
            top_dietary_restriction: NOT_APPLICABLE.to_string(),
        }
    }
}

impl FacetSummary {
    /// The stored top value for a single-valued facet.
    ///
    /// Returns `None` for [`Facet::Category`] (use `top_categories`) and
    /// [`Facet::PriceTier`] (not ranked in summaries).
    #[must_use]
    pub fn top_value(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::Ambience => Some(&self.top_ambience),
            Facet::BusinessParking => Some(&self.top_parking),
            Facet::Music => Some(&self.top_music),
            Facet::DietaryRestrictions => Some(&self.top_dietary_restriction),
            Facet::Category | Facet::PriceTier => None,
        }
    }

    /// Category slot `i` padded with `"N/A"`.
    #[must_use]
    pub fn category_slot(&self, i: usize) -> &str {
        self.top_categories
            .get(i)
            .map_or(NOT_APPLICABLE, String::as_str)
    }
}

/// One finalized row per city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySummary {
    /// Composite city key (`"Seattle,WA"`).
    pub city: String,
    /// Mean star rating.
    pub average_rating: f64,
    /// Mean review count.
    pub average_review_count: f64,
    /// Mean price tier, `None` when no business reported one.
    pub average_price: Option<f64>,
    /// Ranked facet values.
    #[serde(flatten)]
    pub facets: FacetSummary,
}

/// One finalized row per zip code.
///
/// Averages with no samples hold [`ZIP_SENTINEL`] rather than being
/// omitted, so a zip row exists for every zip seen in the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipSummary {
    /// Postal code.
    pub zip_code: String,
    /// Owning city key, or `"N/A"` if no record carried a city.
    pub city: String,
    /// Mean star rating or [`ZIP_SENTINEL`].
    pub average_rating: f64,
    /// Mean review count or [`ZIP_SENTINEL`].
    pub average_review_count: f64,
    /// Mean price tier or [`ZIP_SENTINEL`].
    pub average_price: f64,
    /// Ranked facet values.
    #[serde(flatten)]
    pub facets: FacetSummary,
}

/// A finalized summary for either geography granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "granularity", rename_all = "snake_case")]
pub enum GeoSummary {
    /// City-level row.
    City(CitySummary),
    /// Zip-level row.
    Zip(ZipSummary),
}

impl GeoSummary {
    /// The geography label this row is keyed by.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::City(c) => &c.city,
            Self::Zip(z) => &z.zip_code,
        }
    }
}

/// Comparison baseline merged from stored rows for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBaseline {
    /// The location as entered.
    pub location: String,
    /// Resolved owning city, if any row identified one.
    pub city: Option<String>,
    /// Unweighted mean of the rows' average ratings.
    pub average_rating: Average,
    /// Unweighted mean of the rows' average review counts.
    pub average_review_count: Average,
    /// Unweighted mean of the rows' average price tiers.
    pub average_price: Average,
    /// How often each category ranked in a row's top three.
    pub categories: FacetCounter,
    /// Top ambience tallies across rows.
    pub ambience: FacetCounter,
    /// Top parking tallies across rows.
    pub parking: FacetCounter,
    /// Top music tallies across rows.
    pub music: FacetCounter,
    /// Top dietary accommodation tallies across rows.
    pub dietary_restrictions: FacetCounter,
    /// Number of zip rows merged.
    pub zip_rows: usize,
    /// Number of city rows merged.
    pub city_rows: usize,
}

impl QueryBaseline {
    /// Whether no stored row contributed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.zip_rows == 0 && self.city_rows == 0
    }

    /// Counter for a facet.
    #[must_use]
    pub const fn counter(&self, facet: Facet) -> Option<&FacetCounter> {
        match facet {
            Facet::Category => Some(&self.categories),
            Facet::Ambience => Some(&self.ambience),
            Facet::BusinessParking => Some(&self.parking),
            Facet::Music => Some(&self.music),
            Facet::DietaryRestrictions => Some(&self.dietary_restrictions),
            Facet::PriceTier => None,
        }
    }

    /// Up to `limit` ranked entries for `facet`.
    #[must_use]
    pub fn top(&self, facet: Facet, limit: usize) -> Vec<(String, u64)> {
        self.counter(facet)
            .map(|c| c.top_counts(limit))
            .unwrap_or_default()
    }
}
