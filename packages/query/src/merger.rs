//! Location resolution and baseline merge.
//!
//! By city, the baseline is every zip row owned by a matching city plus
//! the matching city rows. By zip, it is the exact zip row, or failing
//! that the zips sharing the longest matching prefix, plus the owning
//! city's row as a secondary baseline.
//!
//! Rows are merged with an unweighted mean over their stored averages. A
//! zip holding 3 businesses weighs as much as one holding 300.

use dining_atlas_database::SummaryStore;
use dining_atlas_summary_models::{
    CitySummary, FacetSummary, NOT_APPLICABLE, QueryBaseline, RunningAverage, ZipSummary,
};
use serde::Serialize;

use crate::{LocationQuery, QueryError};

/// Shortest zip prefix tried by the nearby-zip fallback.
pub const NEARBY_MIN_PREFIX: usize = 3;

/// Stored rows resolved for one query, before merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRows {
    /// Owning city key, if one was identified.
    pub city: Option<String>,
    /// Zip-level rows.
    pub zips: Vec<ZipSummary>,
    /// City-level rows.
    pub cities: Vec<CitySummary>,
    /// Whether the zip rows came from the nearby-prefix fallback.
    pub nearby: bool,
}

/// Builds comparison baselines from a [`SummaryStore`].
pub struct QueryTimeMerger<'a, S: SummaryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SummaryStore + ?Sized> QueryTimeMerger<'a, S> {
    /// Creates a merger reading from `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolves and merges the rows for `query`.
    ///
    /// A location with no matching rows yields an empty baseline.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if a store lookup fails.
    pub fn baseline(&self, query: &LocationQuery) -> Result<QueryBaseline, QueryError> {
        let rows = self.resolve(query)?;
        let baseline = merge_rows(query.as_str(), &rows);
        log::debug!(
            "Baseline for {}: {} zip row(s), {} city row(s)",
            query.as_str(),
            baseline.zip_rows,
            baseline.city_rows
        );
        Ok(baseline)
    }

    /// Resolves the stored rows describing `query`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if a store lookup fails.
    pub fn resolve(&self, query: &LocationQuery) -> Result<ResolvedRows, QueryError> {
        match query {
            LocationQuery::City(prefix) => self.resolve_city(prefix),
            LocationQuery::Zip(zip) => self.resolve_zip(zip),
        }
    }

    fn resolve_city(&self, prefix: &str) -> Result<ResolvedRows, QueryError> {
        let zips = self.store.get_zips_in_city(prefix)?;
        let cities = self.store.get_by_city(prefix)?;

        let city = cities
            .first()
            .map(|c| c.city.clone())
            .or_else(|| zips.first().map(|z| z.city.clone()));

        Ok(ResolvedRows {
            city,
            zips,
            cities,
            nearby: false,
        })
    }

    fn resolve_zip(&self, zip: &str) -> Result<ResolvedRows, QueryError> {
        let (zips, nearby) = match self.store.get_by_zip(zip)? {
            Some(exact) => (vec![exact], false),
            None => (self.nearby_zips(zip)?, true),
        };

        let city = zips
            .iter()
            .map(|z| z.city.as_str())
            .find(|c| *c != NOT_APPLICABLE)
            .map(String::from);

        let cities = match &city {
            Some(key) => self
                .store
                .get_by_city(key)?
                .into_iter()
                .filter(|c| c.city == *key)
                .collect(),
            None => Vec::new(),
        };

        Ok(ResolvedRows {
            city,
            zips,
            cities,
            nearby,
        })
    }

    /// Zips sharing the longest prefix of `zip` that matches anything,
    /// shortening down to [`NEARBY_MIN_PREFIX`] characters.
    fn nearby_zips(&self, zip: &str) -> Result<Vec<ZipSummary>, QueryError> {
        let boundaries: Vec<usize> = zip
            .char_indices()
            .map(|(i, _)| i)
            .skip(1)
            .chain(std::iter::once(zip.len()))
            .collect();

        let min_len = NEARBY_MIN_PREFIX.min(boundaries.len());

        for (index, end) in boundaries.iter().enumerate().rev() {
            if index + 1 < min_len {
                break;
            }
            let prefix = &zip[..*end];
            let found = self.store.get_zips_matching_prefix(prefix)?;
            if !found.is_empty() {
                log::debug!(
                    "No exact row for zip {zip}; using {} zip(s) under {prefix}",
                    found.len()
                );
                return Ok(found);
            }
        }

        Ok(Vec::new())
    }
}

/// Merges resolved rows into one baseline.
///
/// Zip rows are tallied before city rows so ranking ties favor the more
/// local value. Negative zip averages mark missing data and are left out
/// of the means.
#[must_use]
pub fn merge_rows(location: &str, rows: &ResolvedRows) -> QueryBaseline {
    let mut baseline = QueryBaseline {
        location: location.to_string(),
        city: rows.city.clone(),
        zip_rows: rows.zips.len(),
        city_rows: rows.cities.len(),
        ..QueryBaseline::default()
    };

    let mut rating = RunningAverage::default();
    let mut reviews = RunningAverage::default();
    let mut price = RunningAverage::default();

    for zip in &rows.zips {
        tally_facets(&mut baseline, &zip.facets);
        push_present(&mut rating, Some(zip.average_rating));
        push_present(&mut reviews, Some(zip.average_review_count));
        push_present(&mut price, Some(zip.average_price));
    }

    for city in &rows.cities {
        tally_facets(&mut baseline, &city.facets);
        push_present(&mut rating, Some(city.average_rating));
        push_present(&mut reviews, Some(city.average_review_count));
        push_present(&mut price, city.average_price);
    }

    baseline.average_rating = rating.finish();
    baseline.average_review_count = reviews.finish();
    baseline.average_price = price.finish();
    baseline
}

fn push_present(avg: &mut RunningAverage, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite() && *v >= 0.0) {
        avg.push(v);
    }
}

fn tally_facets(baseline: &mut QueryBaseline, facets: &FacetSummary) {
    for category in &facets.top_categories {
        if category != NOT_APPLICABLE {
            baseline.categories.increment(category);
        }
    }

    for (counter, value) in [
        (&mut baseline.ambience, &facets.top_ambience),
        (&mut baseline.parking, &facets.top_parking),
        (&mut baseline.music, &facets.top_music),
        (&mut baseline.dietary_restrictions, &facets.top_dietary_restriction),
    ] {
        if value != NOT_APPLICABLE {
            counter.increment(value);
        }
    }
}
