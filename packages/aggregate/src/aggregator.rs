//! Streaming accumulation of business facts per geography.
//!
//! A [`GeoRollup`] holds one [`GeoAccumulator`] per key and is instantiated
//! twice inside [`GeoAggregator`]: once keyed by [`CityKey`], once keyed by
//! [`ZipCode`]. Every update is a sum or a counter increment, so records may
//! arrive in any order and partial aggregators can be merged.

use std::collections::{BTreeMap, BTreeSet};

use dining_atlas_business_models::{
    AttributeValue, BusinessRecord, CityKey, Facet, GeoKey, ZipCode,
};
use dining_atlas_summary_models::{FacetCounter, RunningAverage};
use serde::Serialize;

use crate::attributes;
use crate::finalize::{self, FinalizedSummaries};

/// Raw statistics accumulated for one geography key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoAccumulator {
    /// Star rating samples.
    pub rating: RunningAverage,
    /// Review count samples.
    pub review_count: RunningAverage,
    /// Price tier samples.
    pub price: RunningAverage,
    counters: BTreeMap<Facet, FacetCounter>,
}

impl GeoAccumulator {
    /// The counter for `facet`, if anything was counted for it.
    #[must_use]
    pub fn counter(&self, facet: Facet) -> Option<&FacetCounter> {
        self.counters.get(&facet)
    }

    fn counter_mut(&mut self, facet: Facet) -> &mut FacetCounter {
        self.counters.entry(facet).or_default()
    }

    /// Key-wise addition of another accumulator for the same key.
    pub fn merge(&mut self, other: &Self) {
        self.rating.merge(&other.rating);
        self.review_count.merge(&other.review_count);
        self.price.merge(&other.price);
        for (facet, counter) in &other.counters {
            self.counter_mut(*facet).merge(counter);
        }
    }

    fn record(&mut self, facts: &RecordFacts<'_>) {
        if let Some(rating) = facts.rating {
            self.rating.push(rating);
        }
        if let Some(count) = facts.review_count {
            #[allow(clippy::cast_precision_loss)]
            self.review_count.push(count as f64);
        }
        if let Some(tier) = facts.price_tier {
            self.price.push(tier);
        }
        if !facts.categories.is_empty() {
            let counter = self.counter_mut(Facet::Category);
            for category in &facts.categories {
                counter.increment(category);
            }
        }
        for (facet, value) in facts.facets {
            let counter = self.counter_mut(*facet);
            for label in value.truthy_labels() {
                counter.increment(label);
            }
        }
    }
}

/// One accumulator per key of a single geography granularity.
#[derive(Debug, Clone)]
pub struct GeoRollup<K: GeoKey> {
    buckets: BTreeMap<K, GeoAccumulator>,
}

impl<K: GeoKey> Default for GeoRollup<K> {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }
}

impl<K: GeoKey> GeoRollup<K> {
    /// Creates an empty rollup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, key: &K, facts: &RecordFacts<'_>) {
        self.buckets.entry(key.clone()).or_default().record(facts);
    }

    /// The accumulator for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&GeoAccumulator> {
        self.buckets.get(key)
    }

    /// Iterates keys with their accumulators in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &GeoAccumulator)> {
        self.buckets.iter()
    }

    /// Number of known keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no key is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Key-wise addition of another rollup.
    pub fn merge(&mut self, other: Self) {
        for (key, acc) in other.buckets {
            match self.buckets.get_mut(&key) {
                Some(existing) => existing.merge(&acc),
                None => {
                    self.buckets.insert(key, acc);
                }
            }
        }
    }
}

/// Facts extracted from one record, shared by the city and zip updates.
struct RecordFacts<'a> {
    rating: Option<f64>,
    review_count: Option<u64>,
    price_tier: Option<f64>,
    categories: Vec<&'a str>,
    facets: &'a [(Facet, AttributeValue)],
}

/// Distinct values seen across the whole dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStats {
    /// Records ingested.
    pub records: u64,
    /// Distinct city keys.
    pub cities: BTreeSet<String>,
    /// Distinct zip codes.
    pub zip_codes: BTreeSet<String>,
    /// Distinct category labels.
    pub categories: BTreeSet<String>,
    /// Every attribute name seen, recognized or not.
    pub attribute_names: BTreeSet<String>,
}

impl DatasetStats {
    fn merge(&mut self, other: Self) {
        self.records += other.records;
        self.cities.extend(other.cities);
        self.zip_codes.extend(other.zip_codes);
        self.categories.extend(other.categories);
        self.attribute_names.extend(other.attribute_names);
    }
}

/// Accumulates records into city and zip rollups.
///
/// Constructed empty, fed with [`GeoAggregator::ingest`], then consumed by
/// [`GeoAggregator::finalize`].
#[derive(Debug, Clone, Default)]
pub struct GeoAggregator {
    cities: GeoRollup<CityKey>,
    zips: GeoRollup<ZipCode>,
    zip_to_city: BTreeMap<ZipCode, CityKey>,
    stats: DatasetStats,
}

impl GeoAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one record into both geography rollups.
    ///
    /// Missing fields only drop out of their own rollup: a record without
    /// a rating still contributes its review count, categories and facets.
    pub fn ingest(&mut self, record: &BusinessRecord) {
        let city = record.city_key();
        let zip = record.zip_code();
        let facets = attributes::decode_facets(record);

        let mut seen = BTreeSet::new();
        let categories: Vec<&str> = record
            .categories
            .iter()
            .map(String::as_str)
            .filter(|c| seen.insert(*c))
            .collect();

        let facts = RecordFacts {
            rating: record.star_rating,
            review_count: record.review_count,
            price_tier: record.price_tier,
            categories,
            facets: &facets,
        };

        if let Some(city) = &city {
            self.cities.record(city, &facts);
            self.stats.cities.insert(city.as_str().to_string());
        }

        if let Some(zip) = &zip {
            self.zips.record(zip, &facts);
            self.stats.zip_codes.insert(zip.as_str().to_string());

            // First city seen for a zip owns it; later conflicts are ignored.
            if let Some(city) = &city {
                self.zip_to_city
                    .entry(zip.clone())
                    .or_insert_with(|| city.clone());
            }
        }

        self.stats.records += 1;
        self.stats
            .categories
            .extend(facts.categories.iter().map(|c| (*c).to_string()));
        self.stats
            .attribute_names
            .extend(record.attributes.keys().cloned());
    }

    /// Combines a partial aggregator built from a disjoint slice of the
    /// dataset. Zip ownership already recorded here wins.
    pub fn merge(&mut self, other: Self) {
        self.cities.merge(other.cities);
        self.zips.merge(other.zips);
        for (zip, city) in other.zip_to_city {
            self.zip_to_city.entry(zip).or_insert(city);
        }
        self.stats.merge(other.stats);
    }

    /// City-keyed rollup.
    #[must_use]
    pub const fn cities(&self) -> &GeoRollup<CityKey> {
        &self.cities
    }

    /// Zip-keyed rollup.
    #[must_use]
    pub const fn zips(&self) -> &GeoRollup<ZipCode> {
        &self.zips
    }

    /// Owning city of a zip code.
    #[must_use]
    pub fn city_for_zip(&self, zip: &ZipCode) -> Option<&CityKey> {
        self.zip_to_city.get(zip)
    }

    /// Dataset-wide distinct value sets.
    #[must_use]
    pub const fn stats(&self) -> &DatasetStats {
        &self.stats
    }

    /// Finalizes every known key. The aggregator is consumed.
    #[must_use]
    pub fn finalize(self) -> FinalizedSummaries {
        finalize::finalize_all(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(city: &str, zip: &str, rating: f64, reviews: u64) -> BusinessRecord {
        BusinessRecord {
            city: Some(city.to_string()),
            state: Some("WA".to_string()),
            postal_code: Some(zip.to_string()),
            star_rating: Some(rating),
            review_count: Some(reviews),
            ..BusinessRecord::default()
        }
    }

    #[test]
    fn ingest_updates_city_and_zip() {
        let mut agg = GeoAggregator::new();
        agg.ingest(&record("Seattle", "98101", 4.0, 10));

        let city = CityKey::new("Seattle", "WA");
        let zip = ZipCode::new("98101");
        assert_eq!(agg.cities().get(&city).map(|a| a.rating.count()), Some(1));
        assert_eq!(agg.zips().get(&zip).map(|a| a.review_count.count()), Some(1));
        assert_eq!(agg.city_for_zip(&zip), Some(&city));
    }

    #[test]
    fn repeated_categories_count_once_per_record() {
        let mut r = record("Seattle", "98101", 4.0, 10);
        r.categories = vec!["Thai".into(), "Thai".into(), "Bars".into()];
        let mut agg = GeoAggregator::new();
        agg.ingest(&r);

        let acc = agg.cities().get(&CityKey::new("Seattle", "WA")).unwrap();
        let cats = acc.counter(Facet::Category).unwrap();
        assert_eq!(cats.get("Thai"), 1);
        assert_eq!(cats.get("Bars"), 1);
    }

    #[test]
    fn malformed_facet_still_counts_rating() {
        let mut r = record("Seattle", "98101", 5.0, 3);
        r.attributes
            .insert("Ambience".to_string(), json!("{'casual': Tru"));
        let mut agg = GeoAggregator::new();
        agg.ingest(&r);

        let acc = agg.zips().get(&ZipCode::new("98101")).unwrap();
        assert_eq!(acc.rating.count(), 1);
        assert_eq!(acc.review_count.count(), 1);
        assert!(acc.counter(Facet::Ambience).is_none());
    }

    #[test]
    fn truthy_sub_labels_increment_counters() {
        let mut agg = GeoAggregator::new();
        for parking in ["{'street': True, 'lot': True}", "{'street': True, 'lot': False}"] {
            let mut r = record("Seattle", "98101", 4.0, 1);
            r.attributes
                .insert("BusinessParking".to_string(), json!(parking));
            agg.ingest(&r);
        }

        let acc = agg.cities().get(&CityKey::new("Seattle", "WA")).unwrap();
        let parking = acc.counter(Facet::BusinessParking).unwrap();
        assert_eq!(parking.get("street"), 2);
        assert_eq!(parking.get("lot"), 1);
    }

    #[test]
    fn parking_ties_go_to_first_listed_label() {
        let mut r = record("Seattle", "98101", 4.0, 1);
        r.attributes.insert(
            "BusinessParking".to_string(),
            json!("{'street': True, 'lot': True}"),
        );
        let mut agg = GeoAggregator::new();
        agg.ingest(&r);

        let out = agg.finalize();
        assert_eq!(out.cities[0].facets.top_parking, "street");
        assert_eq!(out.zips[0].facets.top_parking, "street");
    }

    #[test]
    fn sub_label_counts_never_exceed_contributing_records() {
        let ambiences = [
            "{'casual': True, 'trendy': True, 'casual': True}",
            "{'casual': False, 'romantic': True}",
            "{'casual': True, 'romantic': None}",
            "{'trendy': Tru",
            "{'hipster': 1, 'classy': 0}",
        ];
        let mut agg = GeoAggregator::new();
        for (i, ambience) in ambiences.iter().enumerate() {
            let zip = if i % 2 == 0 { "98101" } else { "98109" };
            let mut r = record("Seattle", zip, 4.0, 1);
            r.attributes
                .insert("Ambience".to_string(), json!(ambience));
            agg.ingest(&r);
        }
        // No Ambience attribute at all.
        agg.ingest(&record("Seattle", "98101", 3.0, 2));

        let city = agg.cities().get(&CityKey::new("Seattle", "WA")).unwrap();
        let ambience = city.counter(Facet::Ambience).unwrap();
        let contributing = ambiences.len() as u64;
        for (label, count) in ambience.iter() {
            assert!(count <= contributing, "{label} counted {count} times");
        }
        assert_eq!(ambience.get("casual"), 2);
        assert_eq!(ambience.get("romantic"), 1);
        assert_eq!(ambience.get("classy"), 0);

        let zip_total: u64 = agg
            .zips()
            .iter()
            .filter_map(|(_, acc)| acc.counter(Facet::Ambience))
            .map(|c| c.get("casual"))
            .sum();
        assert_eq!(zip_total, ambience.get("casual"));
    }

    #[test]
    fn first_city_owns_zip() {
        let mut agg = GeoAggregator::new();
        agg.ingest(&record("Seattle", "98101", 4.0, 1));
        agg.ingest(&record("Tacoma", "98101", 4.0, 1));
        assert_eq!(
            agg.city_for_zip(&ZipCode::new("98101")),
            Some(&CityKey::new("Seattle", "WA"))
        );
    }

    #[test]
    fn missing_city_still_feeds_zip() {
        let mut r = record("Seattle", "98101", 3.0, 7);
        r.city = None;
        let mut agg = GeoAggregator::new();
        agg.ingest(&r);
        assert!(agg.cities().is_empty());
        assert_eq!(agg.zips().len(), 1);
        assert!(agg.city_for_zip(&ZipCode::new("98101")).is_none());
    }

    #[test]
    fn merged_partitions_match_single_pass() {
        let records = vec![
            record("Seattle", "98101", 4.0, 10),
            record("Seattle", "98109", 2.0, 20),
            record("Portland", "97201", 3.5, 5),
        ];

        let mut whole = GeoAggregator::new();
        for r in &records {
            whole.ingest(r);
        }

        let mut left = GeoAggregator::new();
        left.ingest(&records[0]);
        let mut right = GeoAggregator::new();
        right.ingest(&records[1]);
        right.ingest(&records[2]);
        left.merge(right);

        let key = CityKey::new("Seattle", "WA");
        assert_eq!(
            left.cities().get(&key).map(|a| a.rating.finish()),
            whole.cities().get(&key).map(|a| a.rating.finish())
        );
        assert_eq!(left.stats(), whole.stats());
        assert_eq!(left.zips().len(), 3);
    }

    #[test]
    fn unrecognized_attributes_are_recorded_as_seen() {
        let mut r = record("Seattle", "98101", 4.0, 1);
        r.attributes.insert("WiFi".to_string(), json!("u'free'"));
        let mut agg = GeoAggregator::new();
        agg.ingest(&r);
        assert!(agg.stats().attribute_names.contains("WiFi"));
    }
}
