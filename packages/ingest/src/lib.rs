#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Local dataset loaders.
//!
//! The two pre-loaded collaborators of the pipeline: a hazard polygon
//! collection (historical flooding, GeoJSON on disk) and the city table
//! (CSV with name, lat, lng, population). Individual malformed records
//! degrade with a warning; an unreadable or structurally wrong file is
//! an error.

use std::io::{BufReader, Read};
use std::path::Path;

use nl_atlas_models::{City, Crs, Feature, FeatureCollection, PropertyValue};
use serde::Deserialize;

/// Errors from local dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// File could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GeoJSON parsing failed.
    #[error("GeoJSON parse error: {0}")]
    Geojson(#[from] geojson::Error),

    /// CSV parsing failed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// The file parsed but is not the expected kind of document.
    #[error("Unexpected document shape: {message}")]
    Schema {
        /// Description of what was missing or malformed.
        message: String,
    },
}

/// Loads the hazard polygon collection from a GeoJSON file.
///
/// `crs` declares the reference system the file's coordinates are in;
/// the caller reprojects to the common frame before rendering. Any
/// date-valued properties arrive as plain text in GeoJSON and are kept
/// as such. Features without geometry are skipped with a warning.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read, is not valid
/// GeoJSON, or is not a `FeatureCollection`.
pub fn load_hazard_polygons(path: &Path, crs: Crs) -> Result<FeatureCollection, IngestError> {
    let file = std::fs::File::open(path)?;
    let collection = parse_hazard_polygons(BufReader::new(file), crs)?;
    log::info!(
        "loaded {} hazard polygons from {}",
        collection.len(),
        path.display()
    );
    Ok(collection)
}

fn parse_hazard_polygons<R: Read>(reader: R, crs: Crs) -> Result<FeatureCollection, IngestError> {
    let geojson = geojson::GeoJson::from_reader(reader).map_err(geojson::Error::from)?;
    let geojson::GeoJson::FeatureCollection(raw) = geojson else {
        return Err(IngestError::Schema {
            message: "hazard file is not a GeoJSON FeatureCollection".to_owned(),
        });
    };

    let mut features = Vec::with_capacity(raw.features.len());
    for raw_feature in raw.features {
        let Some(geometry) = raw_feature.geometry.as_ref() else {
            log::warn!("skipping hazard feature without geometry");
            continue;
        };
        let geometry = geo::Geometry::<f64>::try_from(geometry)?;

        let properties = raw_feature
            .properties
            .map(|object| {
                object
                    .iter()
                    .map(|(key, value)| (key.clone(), PropertyValue::from(value)))
                    .collect()
            })
            .unwrap_or_default();

        features.push(Feature {
            geometry,
            properties,
        });
    }

    Ok(FeatureCollection { crs, features })
}

/// One row of the city CSV, as shipped (simplemaps-style columns).
#[derive(Debug, Deserialize)]
struct CityRow {
    city: String,
    lat: f64,
    lng: f64,
    population: Option<f64>,
}

/// Loads the city table from a CSV file.
///
/// Rows that fail to deserialize (missing or non-numeric coordinates)
/// are skipped with a warning; row order is preserved.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or the header is
/// malformed.
pub fn load_cities(path: &Path) -> Result<Vec<City>, IngestError> {
    let file = std::fs::File::open(path)?;
    let cities = parse_cities(BufReader::new(file))?;
    log::info!("loaded {} cities from {}", cities.len(), path.display());
    Ok(cities)
}

fn parse_cities<R: Read>(reader: R) -> Result<Vec<City>, IngestError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut cities = Vec::new();

    for (index, row) in csv_reader.deserialize::<CityRow>().enumerate() {
        match row {
            Ok(row) => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let population = row
                    .population
                    .filter(|p| p.is_finite() && *p >= 0.0)
                    .map(|p| p.round() as u64);
                cities.push(City {
                    name: row.city,
                    latitude: row.lat,
                    longitude: row.lng,
                    population,
                });
            }
            Err(err) => {
                log::warn!("skipping city row {}: {err}", index + 2);
            }
        }
    }

    Ok(cities)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAZARD: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[4.0, 51.0], [4.1, 51.0], [4.1, 51.1], [4.0, 51.0]]]
                },
                "properties": { "naam": "1953 stormvloed", "datum": "1953-02-01" }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": { "naam": "geen geometrie" }
            }
        ]
    }"#;

    #[test]
    fn parses_hazard_collection_and_skips_geometryless_features() {
        let collection = parse_hazard_polygons(HAZARD.as_bytes(), Crs::Rd).unwrap();

        assert_eq!(collection.crs, Crs::Rd);
        assert_eq!(collection.len(), 1);
        assert_eq!(
            collection.features[0].property("datum"),
            Some(&PropertyValue::Text("1953-02-01".to_owned()))
        );
    }

    #[test]
    fn non_collection_document_is_a_schema_error() {
        let point = r#"{ "type": "Point", "coordinates": [4.0, 51.0] }"#;
        assert!(matches!(
            parse_hazard_polygons(point.as_bytes(), Crs::Rd),
            Err(IngestError::Schema { .. })
        ));
    }

    #[test]
    fn parses_cities_and_keeps_row_order() {
        let csv = "city,lat,lng,population\n\
                   Amsterdam,52.3728,4.8936,1166203\n\
                   Utrecht,52.0908,5.1222,361742\n";
        let cities = parse_cities(csv.as_bytes()).unwrap();

        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].name, "Amsterdam");
        assert_eq!(cities[0].population, Some(1_166_203));
        assert_eq!(cities[1].name, "Utrecht");
        assert!((cities[1].latitude - 52.0908).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_population_is_none_and_bad_rows_are_skipped() {
        let csv = "city,lat,lng,population\n\
                   Klein Dorp,52.0,5.0,\n\
                   Kapot,not-a-number,5.0,100\n\
                   Echt,51.1,5.9,5000.0\n";
        let cities = parse_cities(csv.as_bytes()).unwrap();

        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].name, "Klein Dorp");
        assert_eq!(cities[0].population, None);
        assert_eq!(cities[1].name, "Echt");
        assert_eq!(cities[1].population, Some(5000));
    }
}
