#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Business record, facet and geography key types.
//!
//! Every business in the source dataset is normalized into a
//! [`BusinessRecord`] before aggregation. Records are bucketed under two
//! independent geography key spaces, [`CityKey`] and [`ZipCode`], both of
//! which implement [`GeoKey`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Attribute name that carries the restaurant price tier (1-4).
pub const PRICE_TIER_ATTRIBUTE: &str = "RestaurantsPriceRange2";

/// A categorical business dimension that is counted per geography.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Facet {
    /// Free-text business categories ("Restaurants", "Thai", ...).
    Category,
    /// Parking types offered (`street`, `lot`, `valet`, ...).
    BusinessParking,
    /// Ambience types (`casual`, `romantic`, `hipster`, ...).
    Ambience,
    /// Music types (`dj`, `live`, `jukebox`, ...).
    Music,
    /// Dietary accommodations (`vegan`, `halal`, `gluten-free`, ...).
    DietaryRestrictions,
    /// Restaurant price tier.
    PriceTier,
}

impl Facet {
    /// Attribute-backed facets whose raw value is a nested mapping of
    /// sub-label to flag.
    pub const MULTI_VALUED: [Self; 4] = [
        Self::BusinessParking,
        Self::Ambience,
        Self::Music,
        Self::DietaryRestrictions,
    ];

    /// Maps a raw attribute name to the facet it feeds, if any.
    ///
    /// Attribute names outside this fixed set are still recorded as seen
    /// by the aggregator but never counted.
    #[must_use]
    pub fn from_attribute_name(name: &str) -> Option<Self> {
        match name {
            "BusinessParking" => Some(Self::BusinessParking),
            "Ambience" => Some(Self::Ambience),
            "Music" => Some(Self::Music),
            "DietaryRestrictions" => Some(Self::DietaryRestrictions),
            PRICE_TIER_ATTRIBUTE => Some(Self::PriceTier),
            _ => None,
        }
    }

    /// Whether this facet is decoded from a nested multi-valued attribute.
    #[must_use]
    pub fn is_multi_valued(self) -> bool {
        Self::MULTI_VALUED.contains(&self)
    }
}

/// A single decoded attribute value.
///
/// Raw attribute values arrive in several shapes (native booleans,
/// stringified Python-style dicts, numeric strings). They are decoded
/// exactly once per record into this variant.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Simple on/off attribute.
    Boolean(bool),
    /// Nested attribute: sub-labels with whether each applies, in the
    /// order they appear in the source value.
    MultiValued(Vec<(String, bool)>),
    /// Numeric attribute (price tier).
    Numeric(f64),
    /// The value could not be normalized into structured data.
    Unparseable,
}

impl AttributeValue {
    /// Returns the sub-labels whose flag is set, in source order.
    ///
    /// Non-nested variants yield nothing.
    pub fn truthy_labels(&self) -> impl Iterator<Item = &str> {
        let map = match self {
            Self::MultiValued(map) => Some(map),
            _ => None,
        };
        map.into_iter()
            .flat_map(|m| m.iter().filter(|(_, on)| *on).map(|(k, _)| k.as_str()))
    }

    /// Returns the numeric value, if this is a [`AttributeValue::Numeric`].
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Numeric(n) => Some(*n),
            _ => None,
        }
    }
}

/// Identity of a geography bucket used as an aggregation key.
pub trait GeoKey: Ord + Clone + fmt::Debug {
    /// The string label persisted for this key.
    fn as_str(&self) -> &str;
}

/// City identity: `"{city},{state}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityKey(String);

impl CityKey {
    /// Builds the composite city key from a city name and state.
    #[must_use]
    pub fn new(city: &str, state: &str) -> Self {
        Self(format!("{city},{state}"))
    }

    /// Wraps an already-composed city label (e.g. read back from storage).
    #[must_use]
    pub fn from_label(label: impl Into<String>) -> Self {
        Self(label.into())
    }
}

impl GeoKey for CityKey {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Postal code. Compared as a string so prefix matching stays meaningful.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZipCode(String);

impl ZipCode {
    /// Wraps a postal code string.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }
}

impl GeoKey for ZipCode {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One business line as it appears in the newline-delimited JSON dataset.
///
/// Every field is kept as a loose [`serde_json::Value`] so a single
/// mistyped field never rejects the whole line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBusiness {
    /// City name.
    #[serde(default)]
    pub city: Option<serde_json::Value>,
    /// State abbreviation.
    #[serde(default)]
    pub state: Option<serde_json::Value>,
    /// Postal code (string, occasionally numeric).
    #[serde(default)]
    pub postal_code: Option<serde_json::Value>,
    /// Star rating.
    #[serde(default)]
    pub stars: Option<serde_json::Value>,
    /// Review count.
    #[serde(default)]
    pub review_count: Option<serde_json::Value>,
    /// Categories: comma-separated string or array of labels.
    #[serde(default)]
    pub categories: Option<serde_json::Value>,
    /// Free-form attribute bag.
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

/// A business normalized for aggregation. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessRecord {
    /// City name.
    pub city: Option<String>,
    /// State abbreviation.
    pub state: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Star rating, 0-5 in half steps.
    pub star_rating: Option<f64>,
    /// Number of reviews.
    pub review_count: Option<u64>,
    /// Distinct category labels in first-seen order.
    pub categories: Vec<String>,
    /// Raw attribute values keyed by attribute name.
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Price tier decoded from [`PRICE_TIER_ATTRIBUTE`].
    pub price_tier: Option<f64>,
}

impl BusinessRecord {
    /// The composite city key, if both city and state are present.
    #[must_use]
    pub fn city_key(&self) -> Option<CityKey> {
        match (self.city.as_deref(), self.state.as_deref()) {
            (Some(city), Some(state)) => Some(CityKey::new(city, state)),
            _ => None,
        }
    }

    /// The postal code key, if present.
    #[must_use]
    pub fn zip_code(&self) -> Option<ZipCode> {
        self.postal_code.as_deref().map(ZipCode::new)
    }
}
