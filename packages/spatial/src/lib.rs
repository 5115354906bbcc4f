#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CRS identifier parsing and reprojection between RD New and WGS84.
//!
//! The transform is the Schreutelkamp & Strang van Hees polynomial
//! approximation, accurate to well under a meter across the
//! Netherlands. That is far below the generalization error of the
//! municipal boundary geometry, so no grid correction is applied.

use geo::MapCoords;
use nl_atlas_models::{Crs, Feature, FeatureCollection};

/// Errors from CRS handling.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// The identifier names a reference system this pipeline cannot
    /// convert.
    #[error("unsupported coordinate reference system: {identifier}")]
    UnsupportedCrs {
        /// The identifier as received from the external source.
        identifier: String,
    },
}

/// Parses an external CRS identifier into a supported [`Crs`].
///
/// Accepts the common spellings (`EPSG:28992`,
/// `urn:ogc:def:crs:EPSG::28992`, bare `28992`). External identifiers
/// are an untrusted contract: anything unrecognized is an error, never
/// a silent default.
///
/// # Errors
///
/// Returns [`SpatialError::UnsupportedCrs`] for any other identifier.
pub fn parse_crs(identifier: &str) -> Result<Crs, SpatialError> {
    let code = identifier.trim().rsplit(':').next().unwrap_or_default();
    match code {
        "28992" => Ok(Crs::Rd),
        "4326" | "CRS84" => Ok(Crs::Wgs84),
        _ => Err(SpatialError::UnsupportedCrs {
            identifier: identifier.to_owned(),
        }),
    }
}

/// Reprojects a whole collection into `to`.
///
/// Pure and non-mutating. Reprojecting a collection already in `to` is
/// a no-op clone, so the operation is idempotent.
#[must_use]
pub fn reproject(collection: &FeatureCollection, to: Crs) -> FeatureCollection {
    if collection.crs == to {
        return collection.clone();
    }

    let transform: fn(f64, f64) -> (f64, f64) = match (collection.crs, to) {
        (Crs::Rd, Crs::Wgs84) => rd_to_wgs84,
        (Crs::Wgs84, Crs::Rd) => wgs84_to_rd,
        // Same-CRS pairs are handled by the clone above.
        (Crs::Rd, Crs::Rd) | (Crs::Wgs84, Crs::Wgs84) => unreachable!(),
    };

    let features = collection
        .features
        .iter()
        .map(|feature| Feature {
            geometry: feature.geometry.map_coords(|coord| {
                let (x, y) = transform(coord.x, coord.y);
                geo::Coord { x, y }
            }),
            properties: feature.properties.clone(),
        })
        .collect();

    FeatureCollection { crs: to, features }
}

/// Amersfoort base point of the RD grid.
const RD_X0: f64 = 155_000.0;
const RD_Y0: f64 = 463_000.0;
const PHI0: f64 = 52.155_174_40;
const LAM0: f64 = 5.387_206_21;

/// RD (x, y) in meters to WGS84 (longitude, latitude) in degrees.
fn rd_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    // Power-series terms (p = power of dx, q = power of dy,
    // coefficient in arc seconds).
    const PHI_TERMS: &[(i32, i32, f64)] = &[
        (0, 1, 3235.653_89),
        (2, 0, -32.582_97),
        (0, 2, -0.247_50),
        (2, 1, -0.849_78),
        (0, 3, -0.065_50),
        (2, 2, -0.017_09),
        (1, 0, -0.007_38),
        (4, 0, 0.005_30),
        (2, 3, -0.000_39),
        (4, 1, 0.000_33),
        (1, 1, -0.000_12),
    ];
    const LAM_TERMS: &[(i32, i32, f64)] = &[
        (1, 0, 5260.529_16),
        (1, 1, 105.946_84),
        (1, 2, 2.456_56),
        (3, 0, -0.818_85),
        (1, 3, 0.055_94),
        (3, 1, -0.056_07),
        (0, 1, 0.011_99),
        (3, 2, -0.024_82),
        (1, 4, 0.014_28),
        (0, 2, 0.002_56),
        (2, 0, -0.001_38),
        (5, 0, 0.000_26),
    ];

    let dx = (x - RD_X0) * 1e-5;
    let dy = (y - RD_Y0) * 1e-5;

    let series = |terms: &[(i32, i32, f64)]| {
        terms
            .iter()
            .map(|&(p, q, coefficient)| coefficient * dx.powi(p) * dy.powi(q))
            .sum::<f64>()
    };

    let latitude = PHI0 + series(PHI_TERMS) / 3600.0;
    let longitude = LAM0 + series(LAM_TERMS) / 3600.0;
    (longitude, latitude)
}

/// WGS84 (longitude, latitude) in degrees to RD (x, y) in meters.
fn wgs84_to_rd(longitude: f64, latitude: f64) -> (f64, f64) {
    const X_TERMS: &[(i32, i32, f64)] = &[
        (0, 1, 190_094.945),
        (1, 1, -11_832.228),
        (2, 1, -114.221),
        (0, 3, -32.391),
        (1, 0, -0.705),
        (3, 1, -2.340),
        (1, 3, -0.608),
        (0, 2, -0.008),
        (2, 3, 0.148),
    ];
    const Y_TERMS: &[(i32, i32, f64)] = &[
        (1, 0, 309_056.544),
        (0, 2, 3638.893),
        (2, 0, 73.077),
        (1, 2, -157.984),
        (3, 0, 59.788),
        (0, 1, 0.433),
        (2, 2, -6.439),
        (1, 1, -0.032),
        (0, 4, 0.092),
        (1, 4, -0.054),
    ];

    let dphi = 0.36 * (latitude - PHI0);
    let dlam = 0.36 * (longitude - LAM0);

    let series = |terms: &[(i32, i32, f64)]| {
        terms
            .iter()
            .map(|&(p, q, coefficient)| coefficient * dphi.powi(p) * dlam.powi(q))
            .sum::<f64>()
    };

    (RD_X0 + series(X_TERMS), RD_Y0 + series(Y_TERMS))
}
