//! Converts accumulated counters into persisted summary rows.
//!
//! City and zip rows deliberately treat missing numeric data differently:
//! a city without rating or review-count samples is skipped entirely,
//! while a zip always gets a row with [`ZIP_SENTINEL`] in place of the
//! missing averages.

use dining_atlas_business_models::{CityKey, Facet, GeoKey, ZipCode};
use dining_atlas_summary_models::{
    CitySummary, FacetSummary, NOT_APPLICABLE, TOP_CATEGORY_COUNT, ZIP_SENTINEL, ZipSummary,
};

use crate::aggregator::{GeoAccumulator, GeoAggregator};

/// Output of a full batch pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalizedSummaries {
    /// One row per city with both rating and review-count data.
    pub cities: Vec<CitySummary>,
    /// One row per zip code seen.
    pub zips: Vec<ZipSummary>,
    /// Cities left out for lack of rating or review-count samples.
    pub skipped_cities: Vec<String>,
}

/// Ranks categorical counters into the stored top values.
#[must_use]
pub fn finalize_facets(acc: &GeoAccumulator) -> FacetSummary {
    let top = |facet: Facet| {
        acc.counter(facet)
            .and_then(|c| c.top_one())
            .unwrap_or(NOT_APPLICABLE)
            .to_string()
    };

    FacetSummary {
        top_categories: acc
            .counter(Facet::Category)
            .map(|c| c.top(TOP_CATEGORY_COUNT))
            .unwrap_or_default(),
        top_ambience: top(Facet::Ambience),
        top_parking: top(Facet::BusinessParking),
        top_music: top(Facet::Music),
        top_dietary_restriction: top(Facet::DietaryRestrictions),
    }
}

/// Finalizes a city, or returns `None` when it has no rating or no
/// review-count samples.
#[must_use]
pub fn finalize_city(key: &CityKey, acc: &GeoAccumulator) -> Option<CitySummary> {
    let average_rating = acc.rating.finish().value()?;
    let average_review_count = acc.review_count.finish().value()?;

    Some(CitySummary {
        city: key.as_str().to_string(),
        average_rating,
        average_review_count,
        average_price: acc.price.finish().value(),
        facets: finalize_facets(acc),
    })
}

/// Finalizes a zip code. Always produces a row.
#[must_use]
pub fn finalize_zip(key: &ZipCode, acc: &GeoAccumulator, owner: Option<&CityKey>) -> ZipSummary {
    ZipSummary {
        zip_code: key.as_str().to_string(),
        city: owner.map_or_else(|| NOT_APPLICABLE.to_string(), |c| c.as_str().to_string()),
        average_rating: acc.rating.finish().or_sentinel(ZIP_SENTINEL),
        average_review_count: acc.review_count.finish().or_sentinel(ZIP_SENTINEL),
        average_price: acc.price.finish().or_sentinel(ZIP_SENTINEL),
        facets: finalize_facets(acc),
    }
}

/// Finalizes every key known to the aggregator.
#[must_use]
pub fn finalize_all(agg: &GeoAggregator) -> FinalizedSummaries {
    let mut out = FinalizedSummaries::default();

    for (key, acc) in agg.cities().iter() {
        if let Some(summary) = finalize_city(key, acc) {
            out.cities.push(summary);
        } else {
            log::debug!("Cannot populate data for city: {key}");
            out.skipped_cities.push(key.as_str().to_string());
        }
    }

    for (key, acc) in agg.zips().iter() {
        out.zips.push(finalize_zip(key, acc, agg.city_for_zip(key)));
    }

    log::info!(
        "Finalized {} cities ({} skipped) and {} zip codes",
        out.cities.len(),
        out.skipped_cities.len(),
        out.zips.len()
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dining_atlas_business_models::BusinessRecord;
    use serde_json::json;

    fn seattle(rating: Option<f64>, reviews: Option<u64>, categories: &[&str]) -> BusinessRecord {
        BusinessRecord {
            city: Some("Seattle".to_string()),
            state: Some("WA".to_string()),
            postal_code: Some("98101".to_string()),
            star_rating: rating,
            review_count: reviews,
            categories: categories.iter().map(|c| (*c).to_string()).collect(),
            ..BusinessRecord::default()
        }
    }

    #[test]
    fn averages_ratings_and_review_counts() {
        let mut agg = GeoAggregator::new();
        agg.ingest(&seattle(Some(4.0), Some(10), &[]));
        agg.ingest(&seattle(Some(2.0), Some(20), &[]));
        let out = agg.finalize();

        let city = &out.cities[0];
        assert_eq!(city.city, "Seattle,WA");
        assert_eq!(format!("{:.2}", city.average_rating), "3.00");
        assert_eq!(format!("{:.2}", city.average_review_count), "15.00");
        assert_eq!(city.average_price, None);
    }

    #[test]
    fn city_without_ratings_is_skipped_but_zip_is_sentineled() {
        let mut agg = GeoAggregator::new();
        agg.ingest(&seattle(None, Some(12), &["Thai"]));
        let out = agg.finalize();

        assert!(out.cities.is_empty());
        assert_eq!(out.skipped_cities, vec!["Seattle,WA".to_string()]);

        let zip = &out.zips[0];
        assert_eq!(zip.average_rating, ZIP_SENTINEL);
        assert!((zip.average_review_count - 12.0).abs() < f64::EPSILON);
        assert_eq!(zip.average_price, ZIP_SENTINEL);
        assert_eq!(zip.city, "Seattle,WA");
        assert_eq!(zip.facets.top_categories, vec!["Thai".to_string()]);
    }

    #[test]
    fn top_three_categories_by_count_then_first_seen() {
        let mut agg = GeoAggregator::new();
        agg.ingest(&seattle(Some(4.0), Some(1), &["Bars", "Pizza"]));
        agg.ingest(&seattle(Some(4.0), Some(1), &["Thai", "Pizza"]));
        agg.ingest(&seattle(Some(4.0), Some(1), &["Sushi", "Thai"]));
        agg.ingest(&seattle(Some(4.0), Some(1), &["Cafes"]));
        let out = agg.finalize();

        assert_eq!(
            out.cities[0].facets.top_categories,
            vec!["Pizza".to_string(), "Thai".to_string(), "Bars".to_string()]
        );
    }

    #[test]
    fn repeated_runs_rank_identically() {
        let build = || {
            let mut agg = GeoAggregator::new();
            agg.ingest(&seattle(Some(4.0), Some(1), &["A", "B", "C", "D"]));
            agg.ingest(&seattle(Some(4.0), Some(1), &["D", "C"]));
            agg.finalize()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn empty_facets_are_not_applicable() {
        let mut agg = GeoAggregator::new();
        agg.ingest(&seattle(Some(3.0), Some(1), &[]));
        let out = agg.finalize();
        let facets = &out.cities[0].facets;
        assert!(facets.top_categories.is_empty());
        assert_eq!(facets.top_music, "N/A");
        assert_eq!(facets.top_parking, "N/A");
    }

    #[test]
    fn top_facet_value_and_price() {
        let mut agg = GeoAggregator::new();
        for (ambience, tier) in [
            ("{'casual': True, 'trendy': True}", 2.0),
            ("{'casual': True, 'trendy': False}", 3.0),
        ] {
            let mut r = seattle(Some(4.0), Some(5), &[]);
            r.attributes.insert("Ambience".to_string(), json!(ambience));
            r.price_tier = Some(tier);
            agg.ingest(&r);
        }
        let out = agg.finalize();
        assert_eq!(out.cities[0].facets.top_ambience, "casual");
        assert_eq!(out.cities[0].average_price, Some(2.5));
        assert!((out.zips[0].average_price - 2.5).abs() < f64::EPSILON);
    }
}
