#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data model for the atlas pipeline.
//!
//! Every stage (fetch, reproject, join, render) exchanges these types.
//! The central invariant is the explicit [`PropertyValue::Absent`]
//! state: a statistic that is missing or unparseable stays absent all
//! the way to the renderer's fallback color and is never conflated
//! with a legitimate zero.

pub mod color;

use std::collections::BTreeMap;
use std::fmt;

pub use color::Color;

/// A scalar attribute value carried on a feature or statistics record.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Free-form text (also used for values of types we don't model).
    Text(String),
    /// A finite numeric value.
    Number(f64),
    /// Explicit "no value". Distinct from `0` and from empty text.
    Absent,
}

impl PropertyValue {
    /// Returns the text content, if this value is textual.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&serde_json::Value> for PropertyValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Absent,
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Absent, Self::Number),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Bool(b) => Self::Text(b.to_string()),
            other => Self::Text(other.to_string()),
        }
    }
}

/// Coordinate reference systems the pipeline understands.
///
/// Everything downstream of the normalizer runs in [`Crs::Wgs84`];
/// the Dutch sources deliver geometry in [`Crs::Rd`] (RD New,
/// EPSG:28992, the national metric grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// RD New / Amersfoort (EPSG:28992), meters.
    Rd,
    /// WGS84 geographic coordinates (EPSG:4326), degrees.
    Wgs84,
}

impl Crs {
    /// The EPSG code for this reference system.
    #[must_use]
    pub const fn epsg(self) -> u32 {
        match self {
            Self::Rd => 28_992,
            Self::Wgs84 => 4_326,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// One geometry plus its attribute properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Polygon, multipolygon, point, etc. in the collection's CRS.
    pub geometry: geo::Geometry<f64>,
    /// Attribute name to scalar value.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Feature {
    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// An ordered sequence of features sharing one CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    /// The reference system every geometry in `features` is expressed in.
    pub crs: Crs,
    /// Features in arrival order.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// An empty collection in the given CRS.
    #[must_use]
    pub const fn empty(crs: Crs) -> Self {
        Self {
            crs,
            features: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Identifies one remote WFS feature query.
///
/// Fetch memoization keys on the fully-resolved request — endpoint plus
/// type name — never on page parameters (see [`QuerySource::cache_key`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySource {
    /// Base WFS endpoint URL.
    pub endpoint: String,
    /// WFS `typeName` to request.
    pub type_name: String,
    /// Features per page request.
    pub page_size: u32,
}

impl QuerySource {
    /// The memoization identity of this source. Page size is
    /// deliberately excluded: two sources differing only in page size
    /// resolve to the same collection.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}#{}", self.endpoint, self.type_name)
    }
}

/// One row of an externally supplied statistics table.
///
/// The source does not guarantee `region_code` uniqueness; the join
/// engine resolves duplicates deterministically (first record wins).
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsRecord {
    /// Join key, whitespace-trimmed at ingestion.
    pub region_code: String,
    /// Statistic name to raw value (numbers may arrive as text).
    pub values: BTreeMap<String, PropertyValue>,
}

impl StatisticsRecord {
    /// Builds a record, trimming surrounding whitespace off the key.
    #[must_use]
    pub fn new(region_code: &str, values: BTreeMap<String, PropertyValue>) -> Self {
        Self {
            region_code: region_code.trim().to_owned(),
            values,
        }
    }
}

/// A boundary feature enriched with joined statistics.
///
/// Produced by the join engine with left-outer semantics: every
/// boundary feature yields exactly one region, matched or not.
/// Unmatched or uncoercible statistics are `None`, never `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRegion {
    /// The geometry-side join key (e.g. `"GM0344"`).
    pub region_code: String,
    /// Human-readable name used in tooltips.
    pub display_name: String,
    /// Boundary geometry in the collection's CRS.
    pub geometry: geo::Geometry<f64>,
    /// Statistic field name to coerced numeric value.
    pub stats: BTreeMap<String, Option<f64>>,
}

impl JoinedRegion {
    /// The coerced value of one statistic, `None` when absent.
    #[must_use]
    pub fn stat(&self, field: &str) -> Option<f64> {
        self.stats.get(field).copied().flatten()
    }
}

/// One row of the city table.
#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub name: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Resident count, if the table provides one.
    pub population: Option<u64>,
}
