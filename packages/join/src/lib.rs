#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Left-outer join of a boundary collection with a statistics table.
//!
//! Every boundary feature appears exactly once in the output whether or
//! not a statistics record matches. The statistics source does not
//! guarantee key uniqueness; when two records share a region code the
//! first one in table order wins, deterministically. Numeric coercion
//! is per-field: one unparseable value degrades only itself to absent
//! and never aborts the join.

use std::collections::BTreeMap;
use std::collections::hash_map::{Entry, HashMap};

use nl_atlas_models::{FeatureCollection, JoinedRegion, PropertyValue, StatisticsRecord};

/// Errors from the join engine.
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    /// The configured join key field is missing (or not text) on a
    /// boundary feature.
    #[error("join key field `{field}` missing from boundary feature at index {index}")]
    MissingKey {
        /// The configured geometry-side key field.
        field: String,
        /// Position of the offending feature in the collection.
        index: usize,
    },
}

/// Coerces a raw statistic to a float.
///
/// Numbers pass through, numeric text (`"12.5"`) converts, and
/// everything else — absent values, placeholders like `"n.v.t."`,
/// non-finite numbers — is `None`.
#[must_use]
pub fn coerce_numeric(value: &PropertyValue) -> Option<f64> {
    match value {
        PropertyValue::Number(n) if n.is_finite() => Some(*n),
        PropertyValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Joins boundary features with statistics records on
/// `geometry_key_field` = [`StatisticsRecord::region_code`].
///
/// Left-outer semantics: the output has exactly one region per boundary
/// feature, in input order. `display_name_field` supplies the tooltip
/// name, falling back to the region code when missing. Each field in
/// `numeric_fields` is coerced independently via [`coerce_numeric`].
///
/// Inputs are borrowed and never mutated.
///
/// # Errors
///
/// Returns [`JoinError::MissingKey`] when a boundary feature lacks the
/// configured key field — boundary identifiers are an external contract
/// validated strictly, unlike the statistics side which degrades softly.
pub fn join(
    boundaries: &FeatureCollection,
    statistics: &[StatisticsRecord],
    geometry_key_field: &str,
    display_name_field: &str,
    numeric_fields: &[&str],
) -> Result<Vec<JoinedRegion>, JoinError> {
    // First record wins: later duplicates never replace an indexed key.
    let mut index: HashMap<&str, &StatisticsRecord> = HashMap::with_capacity(statistics.len());
    for record in statistics {
        match index.entry(record.region_code.as_str()) {
            Entry::Occupied(_) => {
                log::warn!(
                    "duplicate statistics key {}: keeping the first record",
                    record.region_code
                );
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    let mut joined = Vec::with_capacity(boundaries.features.len());
    for (position, feature) in boundaries.features.iter().enumerate() {
        let region_code = feature
            .property(geometry_key_field)
            .and_then(PropertyValue::as_text)
            .map(|code| code.trim().to_owned())
            .ok_or_else(|| JoinError::MissingKey {
                field: geometry_key_field.to_owned(),
                index: position,
            })?;

        let display_name = feature
            .property(display_name_field)
            .and_then(PropertyValue::as_text)
            .map_or_else(|| region_code.clone(), ToOwned::to_owned);

        let record = index.get(region_code.as_str());
        let stats: BTreeMap<String, Option<f64>> = numeric_fields
            .iter()
            .map(|&field| {
                let value = record
                    .and_then(|r| r.values.get(field))
                    .and_then(coerce_numeric);
                (field.to_owned(), value)
            })
            .collect();

        if record.is_none() {
            log::debug!("no statistics match for region {region_code}");
        }

        joined.push(JoinedRegion {
            region_code,
            display_name,
            geometry: feature.geometry.clone(),
            stats,
        });
    }

    Ok(joined)
}
