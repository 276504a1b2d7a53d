//! Streaming averages and their finalized, presentation-ready form.

use std::fmt;

use serde::{Serialize, Serializer};

/// Text shown in place of an average computed from zero samples.
pub const DATA_NOT_AVAILABLE: &str = "Data not available";

/// Rounds to two decimal places.
///
/// Rounds through the `{:.2}` formatter, which works on the exact binary
/// value, so `1.115` (stored as `1.11499...`) becomes `1.11`. Scaling by
/// 100 first would round the inexact product up instead.
#[must_use]
pub fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Running sum and sample count for one numeric field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningAverage {
    sum: f64,
    count: u64,
}

impl RunningAverage {
    /// Records one sample.
    pub fn push(&mut self, sample: f64) {
        self.sum += sample;
        self.count += 1;
    }

    /// Combines two partial accumulations.
    pub fn merge(&mut self, other: &Self) {
        self.sum += other.sum;
        self.count += other.count;
    }

    /// Number of samples recorded.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Finalizes to an [`Average`] rounded to two decimals.
    #[must_use]
    pub fn finish(&self) -> Average {
        if self.count == 0 {
            return Average::NotAvailable;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = self.sum / self.count as f64;
        Average::Value(round2(mean))
    }
}

impl FromIterator<f64> for RunningAverage {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut avg = Self::default();
        for sample in iter {
            avg.push(sample);
        }
        avg
    }
}

/// A finalized average, or the "no data" sentinel.
///
/// Displays as a two-decimal string (`"3.00"`) or [`DATA_NOT_AVAILABLE`].
/// The sentinel is never confused with `0.00`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Average {
    /// Mean of at least one sample.
    Value(f64),
    /// No samples were available.
    NotAvailable,
}

impl Average {
    /// The numeric mean, if any.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::NotAvailable => None,
        }
    }

    /// The numeric mean, or `sentinel` when there were no samples.
    #[must_use]
    pub const fn or_sentinel(self, sentinel: f64) -> f64 {
        match self {
            Self::Value(v) => v,
            Self::NotAvailable => sentinel,
        }
    }
}

impl Default for Average {
    fn default() -> Self {
        Self::NotAvailable
    }
}

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.2}"),
            Self::NotAvailable => f.write_str(DATA_NOT_AVAILABLE),
        }
    }
}

impl Serialize for Average {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_average_is_not_available() {
        let avg = RunningAverage::default().finish();
        assert_eq!(avg, Average::NotAvailable);
        assert_eq!(avg.to_string(), "Data not available");
        assert_eq!(avg.or_sentinel(-1.0), -1.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        let avg: RunningAverage = [3.0, 4.5, 4.0].into_iter().collect();
        assert_eq!(avg.finish().to_string(), "3.83");
    }

    #[test]
    fn halfway_means_round_on_the_exact_value() {
        let avg: RunningAverage = std::iter::repeat_n(1.0, 177)
            .chain(std::iter::repeat_n(2.0, 23))
            .collect();
        let finished = avg.finish();
        assert_eq!(finished, Average::Value(1.11));
        assert_eq!(finished.to_string(), "1.11");
    }

    #[test]
    fn rounding_is_idempotent() {
        for value in [0.125, 2.675, 3.0, 4.999, 15.0] {
            let once = round2(value);
            assert_eq!(round2(once), once);
            assert_eq!(format!("{once:.2}"), format!("{value:.2}"));
        }
    }

    #[test]
    fn order_does_not_change_the_average() {
        let samples = [4.5, 1.0, 3.5, 2.0, 5.0, 3.0, 4.0];
        let forward: RunningAverage = samples.iter().copied().collect();
        let backward: RunningAverage = samples.iter().rev().copied().collect();
        assert_eq!(forward.finish(), backward.finish());
    }

    #[test]
    fn merged_partials_match_single_pass() {
        let mut left: RunningAverage = [10.0, 20.0].into_iter().collect();
        let right: RunningAverage = [30.0].into_iter().collect();
        left.merge(&right);
        assert_eq!(left.count(), 3);
        assert_eq!(left.finish(), Average::Value(20.0));
    }

    #[test]
    fn serializes_as_display_string() {
        let json = serde_json::to_string(&Average::Value(15.0)).unwrap();
        assert_eq!(json, "\"15.00\"");
    }
}
