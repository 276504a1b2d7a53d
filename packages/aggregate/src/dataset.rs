//! Newline-delimited JSON business dataset reader.
//!
//! Each line is one business. Blank lines are ignored and lines that are
//! not valid JSON objects are counted and skipped, so one corrupt line
//! never aborts the batch.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use dining_atlas_business_models::{BusinessRecord, RawBusiness};
use serde_json::Value;

use crate::AggregateError;
use crate::aggregator::GeoAggregator;
use crate::attributes;
use crate::progress::ProgressCallback;

/// Records between progress updates.
const PROGRESS_INTERVAL: u64 = 1_000;

/// Counters for one pass over the dataset file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Non-blank lines read.
    pub lines: u64,
    /// Lines turned into records.
    pub records: u64,
    /// Lines skipped because they were not valid JSON objects.
    pub malformed: u64,
}

/// Normalizes a raw dataset line into a [`BusinessRecord`].
#[must_use]
pub fn record_from_raw(raw: RawBusiness) -> BusinessRecord {
    let attributes: BTreeMap<String, Value> = match raw.attributes {
        Some(Value::Object(map)) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    };

    BusinessRecord {
        city: text_field(raw.city.as_ref()),
        state: text_field(raw.state.as_ref()),
        postal_code: text_field(raw.postal_code.as_ref()),
        star_rating: number_field(raw.stars.as_ref()).filter(|s| (0.0..=5.0).contains(s)),
        review_count: count_field(raw.review_count.as_ref()),
        categories: categories_field(raw.categories.as_ref()),
        price_tier: attributes::price_tier(&attributes),
        attributes,
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_field(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_field(value: Option<&Value>) -> Option<u64> {
    if let Some(n) = value.and_then(Value::as_u64) {
        return Some(n);
    }
    let n = number_field(value)?;
    (n >= 0.0 && n.fract() == 0.0).then_some(n as u64)
}

/// Splits categories given either as `"A, B, C"` or `["A", "B"]`,
/// trimming labels and dropping duplicates while keeping first-seen order.
fn categories_field(value: Option<&Value>) -> Vec<String> {
    let labels: Vec<&str> = match value {
        Some(Value::String(s)) => s.split(',').collect(),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    let mut seen = BTreeSet::new();
    labels
        .into_iter()
        .map(str::trim)
        .filter(|l| !l.is_empty() && seen.insert(*l))
        .map(String::from)
        .collect()
}

/// Parses one dataset line. Returns `None` for malformed lines.
#[must_use]
pub fn parse_line(line: &str) -> Option<BusinessRecord> {
    serde_json::from_str::<RawBusiness>(line)
        .ok()
        .map(record_from_raw)
}

/// Streams records from `reader` into `sink`.
///
/// Stops after `limit` records when given, in which case the limit is
/// also reported as the progress total.
///
/// # Errors
///
/// Returns [`AggregateError::Io`] if reading from `reader` fails.
pub fn read_records<R, F>(
    reader: R,
    limit: Option<u64>,
    progress: &dyn ProgressCallback,
    mut sink: F,
) -> Result<LoadStats, AggregateError>
where
    R: BufRead,
    F: FnMut(BusinessRecord),
{
    let mut stats = LoadStats::default();
    if let Some(max) = limit {
        progress.set_total(max);
    }

    for line in reader.lines() {
        if limit.is_some_and(|max| stats.records >= max) {
            break;
        }

        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        match parse_line(&line) {
            Some(record) => {
                sink(record);
                stats.records += 1;
                if stats.records % PROGRESS_INTERVAL == 0 {
                    progress.inc(PROGRESS_INTERVAL);
                }
            }
            None => {
                stats.malformed += 1;
                log::debug!("Skipping malformed dataset line {}", stats.lines);
            }
        }
    }

    progress.inc(stats.records % PROGRESS_INTERVAL);

    if stats.malformed > 0 {
        log::warn!(
            "Skipped {} malformed line(s) out of {}",
            stats.malformed,
            stats.lines
        );
    }

    Ok(stats)
}

/// Runs the full accumulation pass over a dataset file.
///
/// # Errors
///
/// Returns [`AggregateError::Io`] if the file cannot be opened or read.
pub fn aggregate_file(
    path: &Path,
    limit: Option<u64>,
    progress: &dyn ProgressCallback,
) -> Result<(GeoAggregator, LoadStats), AggregateError> {
    log::info!("Loading business dataset from {}", path.display());
    let file = File::open(path)?;
    if let Some(name) = path.file_name() {
        progress.set_message(format!("Aggregating {}", name.to_string_lossy()));
    }

    let mut aggregator = GeoAggregator::new();
    let stats = read_records(BufReader::new(file), limit, progress, |record| {
        aggregator.ingest(&record);
    })?;

    progress.finish(format!("Aggregated {} businesses", stats.records));
    log::info!(
        "Aggregated {} businesses into {} cities and {} zip codes",
        stats.records,
        aggregator.cities().len(),
        aggregator.zips().len()
    );

    Ok((aggregator, stats))
}
