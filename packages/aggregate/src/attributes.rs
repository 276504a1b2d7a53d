//! Tolerant decoding of free-form business attribute values.
//!
//! The dataset stores most attribute values as Python-literal strings
//! (`"{'garage': False, 'street': True}"`, `"True"`, `"2"`). Decoding
//! rewrites the Python quoting and literals to JSON and parses the result.
//! Anything that still fails to parse becomes
//! [`AttributeValue::Unparseable`] and is dropped by the aggregator.

use std::collections::BTreeMap;

use dining_atlas_business_models::{AttributeValue, BusinessRecord, Facet, PRICE_TIER_ATTRIBUTE};
use serde_json::Value;

/// Decodes one raw attribute value.
#[must_use]
pub fn decode(raw: &Value) -> AttributeValue {
    match raw {
        Value::String(s) => decode_literal(s),
        other => from_json(other),
    }
}

/// Decodes a Python-literal string.
fn decode_literal(s: &str) -> AttributeValue {
    let normalized = normalize_literal(s.trim());
    serde_json::from_str::<Value>(&normalized)
        .map_or(AttributeValue::Unparseable, |v| from_json(&v))
}

/// Rewrites single quotes and Python boolean/null literals to JSON.
fn normalize_literal(s: &str) -> String {
    s.replace('\'', "\"")
        .replace("False", "false")
        .replace("True", "true")
        .replace("None", "null")
}

fn from_json(value: &Value) -> AttributeValue {
    match value {
        Value::Bool(b) => AttributeValue::Boolean(*b),
        Value::Number(n) => n
            .as_f64()
            .map_or(AttributeValue::Unparseable, AttributeValue::Numeric),
        Value::Object(map) => AttributeValue::MultiValued(
            map.iter()
                .map(|(label, v)| (label.clone(), is_truthy(v)))
                .collect(),
        ),
        Value::Null | Value::String(_) | Value::Array(_) => AttributeValue::Unparseable,
    }
}

/// Truthiness of a decoded sub-value: `null`, `false`, zero and empty
/// containers are off; everything else is on.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Decodes the price tier attribute, if present and numeric and positive.
#[must_use]
pub fn price_tier(attributes: &BTreeMap<String, Value>) -> Option<f64> {
    attributes
        .get(PRICE_TIER_ATTRIBUTE)
        .map(decode)
        .and_then(|v| v.as_number())
        .filter(|tier| tier.is_finite() && *tier > 0.0)
}

/// Decodes the multi-valued facets of a record once.
///
/// Returns `(facet, value)` for every recognized nested attribute, with
/// unparseable values already removed. The price tier is carried on the
/// record itself and is not repeated here.
#[must_use]
pub fn decode_facets(record: &BusinessRecord) -> Vec<(Facet, AttributeValue)> {
    record
        .attributes
        .iter()
        .filter_map(|(name, raw)| {
            let facet = Facet::from_attribute_name(name)?;
            if !facet.is_multi_valued() {
                return None;
            }
            match decode(raw) {
                AttributeValue::Unparseable => {
                    log::trace!("Dropping unparseable {name} value: {raw}");
                    None
                }
                value => Some((facet, value)),
            }
        })
        .collect()
}
