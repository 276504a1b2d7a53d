//! JSON report shapes printed by the CLI.

use dining_atlas_business_models::Facet;
use dining_atlas_search::{BusinessDetails, ReviewExcerpt, SearchSummary};
use dining_atlas_summary_models::{DISTRIBUTION_SIZE, QueryBaseline};
use serde::Serialize;

/// Ranked top-10 lists per facet of a baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Distributions {
    /// Categories with their business counts.
    pub categories: Vec<(String, u64)>,
    /// Ambience types.
    pub ambience: Vec<(String, u64)>,
    /// Parking types.
    pub parking: Vec<(String, u64)>,
    /// Music types.
    pub music: Vec<(String, u64)>,
    /// Dietary accommodations.
    pub dietary_restrictions: Vec<(String, u64)>,
}

impl Distributions {
    /// Ranks every facet of `baseline`, most frequent first.
    #[must_use]
    pub fn of(baseline: &QueryBaseline) -> Self {
        Self {
            categories: baseline.top(Facet::Category, DISTRIBUTION_SIZE),
            ambience: baseline.top(Facet::Ambience, DISTRIBUTION_SIZE),
            parking: baseline.top(Facet::BusinessParking, DISTRIBUTION_SIZE),
            music: baseline.top(Facet::Music, DISTRIBUTION_SIZE),
            dietary_restrictions: baseline.top(Facet::DietaryRestrictions, DISTRIBUTION_SIZE),
        }
    }
}

/// Output of `lookup`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupReport<'a> {
    /// Merged stored rows for the location.
    pub baseline: &'a QueryBaseline,
    /// Ranked facet lists of the baseline.
    pub distributions: Distributions,
}

impl<'a> LookupReport<'a> {
    #[must_use]
    pub fn new(baseline: &'a QueryBaseline) -> Self {
        Self {
            baseline,
            distributions: Distributions::of(baseline),
        }
    }
}

/// Output of `compare`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    /// Search term as entered.
    pub business_name: String,
    /// Location the search and baseline were resolved for.
    pub location: String,
    /// Figures from the live search.
    pub live: SearchSummary,
    /// Live average price as a `"$$"`-style symbol.
    pub live_price: Option<String>,
    /// Stored baseline for the location.
    pub baseline: QueryBaseline,
    /// Ranked facet lists of the baseline.
    pub distributions: Distributions,
    /// Details of the most reviewed listing.
    pub top_business: Option<BusinessDetails>,
    /// First reviews of the most reviewed listing.
    pub reviews: Vec<ReviewExcerpt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distributions_are_capped_and_ranked() {
        let mut baseline = QueryBaseline::default();
        for i in 0..12 {
            baseline.categories.add(&format!("c{i}"), 1);
        }
        baseline.categories.increment("c11");

        let dist = Distributions::of(&baseline);
        assert_eq!(dist.categories.len(), DISTRIBUTION_SIZE);
        assert_eq!(dist.categories[0], ("c11".to_string(), 2));
        assert_eq!(dist.categories[1], ("c0".to_string(), 1));
        assert!(dist.music.is_empty());
    }
}
