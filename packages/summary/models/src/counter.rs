//! Insertion-ordered label counter.
//!
//! Counts are kept in first-seen order so that ranking with a stable sort
//! breaks ties by the order labels were first encountered. Re-running the
//! same input therefore always produces the same ranking.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Occurrence counts per facet-value label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetCounter {
    entries: Vec<(String, u64)>,
    index: BTreeMap<String, usize>,
}

impl FacetCounter {
    /// Creates an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments `label` by one.
    pub fn increment(&mut self, label: &str) {
        self.add(label, 1);
    }

    /// Adds `count` occurrences of `label`.
    pub fn add(&mut self, label: &str, count: u64) {
        if let Some(&i) = self.index.get(label) {
            self.entries[i].1 += count;
        } else {
            self.index.insert(label.to_string(), self.entries.len());
            self.entries.push((label.to_string(), count));
        }
    }

    /// Key-wise sum of `other` into `self`. Labels new to `self` are
    /// appended in `other`'s order.
    pub fn merge(&mut self, other: &Self) {
        for (label, count) in &other.entries {
            self.add(label, *count);
        }
    }

    /// Count for `label`, zero if never seen.
    #[must_use]
    pub fn get(&self, label: &str) -> u64 {
        self.index.get(label).map_or(0, |&i| self.entries[i].1)
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// Number of distinct labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no label has been counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(label, count)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(l, c)| (l.as_str(), *c))
    }

    /// All entries sorted by count descending, ties in first-seen order.
    #[must_use]
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self.iter().collect();
        // sort_by is stable
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// The `k` highest-ranked labels (fewer if fewer exist).
    #[must_use]
    pub fn top(&self, k: usize) -> Vec<String> {
        self.ranked()
            .into_iter()
            .take(k)
            .map(|(label, _)| label.to_string())
            .collect()
    }

    /// The `k` highest-ranked entries with their counts.
    #[must_use]
    pub fn top_counts(&self, k: usize) -> Vec<(String, u64)> {
        self.ranked()
            .into_iter()
            .take(k)
            .map(|(label, count)| (label.to_string(), count))
            .collect()
    }

    /// The single highest-ranked label, if any.
    #[must_use]
    pub fn top_one(&self) -> Option<&str> {
        self.ranked().first().map(|(label, _)| *label)
    }
}

impl<'a> FromIterator<(&'a str, u64)> for FacetCounter {
    fn from_iter<I: IntoIterator<Item = (&'a str, u64)>>(iter: I) -> Self {
        let mut counter = Self::new();
        for (label, count) in iter {
            counter.add(label, count);
        }
        counter
    }
}

impl Serialize for FacetCounter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ranked = self.ranked();
        let mut map = serializer.serialize_map(Some(ranked.len()))?;
        for (label, count) in ranked {
            map.serialize_entry(label, &count)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_shared_labels() {
        let mut a: FacetCounter = [("a", 2)].into_iter().collect();
        let b: FacetCounter = [("a", 3)].into_iter().collect();
        a.merge(&b);
        assert_eq!(a, [("a", 5)].into_iter().collect());
    }

    #[test]
    fn merge_appends_new_labels_in_order() {
        let mut a: FacetCounter = [("x", 1)].into_iter().collect();
        let b: FacetCounter = [("z", 1), ("y", 1)].into_iter().collect();
        a.merge(&b);
        let labels: Vec<&str> = a.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["x", "z", "y"]);
    }

    #[test]
    fn ranking_breaks_ties_by_first_seen() {
        let mut counter = FacetCounter::new();
        for label in ["Pizza", "Bars", "Thai", "Bars", "Pizza", "Sushi"] {
            counter.increment(label);
        }
        assert_eq!(counter.top(3), vec!["Pizza", "Bars", "Thai"]);
    }

    #[test]
    fn top_never_exceeds_available_labels() {
        let counter: FacetCounter = [("only", 4)].into_iter().collect();
        assert_eq!(counter.top(3), vec!["only"]);
        assert!(FacetCounter::new().top_one().is_none());
    }

    #[test]
    fn top_outranks_everything_left_out() {
        let counter: FacetCounter = [("a", 1), ("b", 5), ("c", 3), ("d", 3), ("e", 4)]
            .into_iter()
            .collect();
        let top = counter.top(3);
        let min_in = top.iter().map(|l| counter.get(l)).min().unwrap_or(0);
        for (label, count) in counter.iter() {
            if !top.iter().any(|t| t == label) {
                assert!(count <= min_in, "{label} outranks the top-3");
            }
        }
        assert_eq!(top, vec!["b", "e", "c"]);
    }

    #[test]
    fn totals_and_missing_labels() {
        let counter: FacetCounter = [("street", 2), ("lot", 1)].into_iter().collect();
        assert_eq!(counter.total(), 3);
        assert_eq!(counter.get("valet"), 0);
        assert_eq!(counter.len(), 2);
    }
}
