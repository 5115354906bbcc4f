//! Map layer construction.
//!
//! Thematic layers bake their fill color and tooltip text into each
//! feature's properties at build time, pairing every layer with the
//! scale it was styled by — there are no styling callbacks left to bind
//! late. Outline color, outline weight, and fill opacity are rendering
//! constants shared by all thematic layers so the layers stay visually
//! comparable.

use nl_atlas_models::{City, Color, FeatureCollection, JoinedRegion};

use crate::RenderError;
use crate::scale::ColorScale;

/// Outline color for all polygon layers.
pub const OUTLINE_COLOR: Color = Color::BLACK;
/// Outline weight in pixels for all polygon layers.
pub const OUTLINE_WEIGHT: f64 = 1.0;
/// Fill opacity for thematic layers.
pub const THEMATIC_FILL_OPACITY: f64 = 0.7;
/// Fill opacity for the hazard overlay.
pub const HAZARD_FILL_OPACITY: f64 = 0.3;
/// Fill color for the hazard overlay.
pub const HAZARD_FILL: Color = Color::BLUE;
/// City marker radius in pixels.
pub const MARKER_RADIUS: u32 = 5;
/// City marker outline color.
pub const MARKER_OUTLINE: Color = Color::GREEN;
/// City marker fill color.
pub const MARKER_FILL: Color = Color::RED;
/// City marker fill opacity.
pub const MARKER_FILL_OPACITY: f64 = 0.7;

/// Tooltip text shown for a region with no value.
pub const NO_DATA_MARKER: &str = "no data";

/// One independently toggleable map layer.
///
/// Layers are self-contained and order-stable: adding or removing one
/// never affects another.
#[derive(Debug, Clone, PartialEq)]
pub enum MapLayer {
    /// Polygon layer with per-feature baked styling.
    Geo(GeoLayer),
    /// Circle-marker point layer.
    Markers(MarkerLayer),
}

impl MapLayer {
    /// The name shown in the layer control.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Geo(layer) => &layer.name,
            Self::Markers(layer) => &layer.name,
        }
    }
}

/// A polygon layer: GeoJSON with `fill` (hex color) and optional
/// `tooltip` (HTML) baked into each feature's properties.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoLayer {
    pub name: String,
    /// GeoJSON `FeatureCollection` value ready for embedding.
    pub geojson: serde_json::Value,
    pub fill_opacity: f64,
    /// Present on thematic layers; the composer renders exactly one
    /// legend per layer carrying one.
    pub legend: Option<Legend>,
}

/// Gradient legend data for one thematic layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub caption: String,
    pub anchors: Vec<Color>,
    pub min: f64,
    pub max: f64,
}

/// A point-marker layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerLayer {
    pub name: String,
    pub markers: Vec<Marker>,
}

/// One circle marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    /// Popup text (plain, escaped at composition time).
    pub popup: String,
}

/// Formats a statistic for tooltip display: integers without a
/// fraction, everything else as-is.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// Builds one choropleth layer for `attribute`.
///
/// Fill color comes from the scale (absent fallback included); every
/// tooltip carries the region's display name and the formatted value or
/// the explicit [`NO_DATA_MARKER`].
///
/// # Errors
///
/// Returns [`RenderError::Json`] if geometry serialization fails.
pub fn build_choropleth_layer(
    regions: &[JoinedRegion],
    attribute: &str,
    scale: &ColorScale,
    display_name: &str,
    name_label: &str,
    value_label: &str,
) -> Result<MapLayer, RenderError> {
    let mut features = Vec::with_capacity(regions.len());
    for region in regions {
        let value = region.stat(attribute);
        let fill = scale.map(value);
        let formatted = value.map_or_else(|| NO_DATA_MARKER.to_owned(), format_value);
        let tooltip = format!(
            "<b>{name_label}</b> {}<br><b>{value_label}</b> {formatted}",
            html_escape(&region.display_name),
        );
        features.push(feature_value(
            &region.geometry,
            serde_json::json!({ "fill": fill.to_hex(), "tooltip": tooltip }),
        )?);
    }

    log::debug!("built layer {display_name}: {} features", features.len());

    Ok(MapLayer::Geo(GeoLayer {
        name: display_name.to_owned(),
        geojson: feature_collection_value(features),
        fill_opacity: THEMATIC_FILL_OPACITY,
        legend: Some(Legend {
            caption: scale.caption().to_owned(),
            anchors: scale.anchors().to_vec(),
            min: scale.min(),
            max: scale.max(),
        }),
    }))
}

/// Builds the hazard overlay layer with its fixed translucent fill.
///
/// # Errors
///
/// Returns [`RenderError::Json`] if geometry serialization fails.
pub fn build_hazard_layer(
    collection: &FeatureCollection,
    name: &str,
) -> Result<MapLayer, RenderError> {
    let fill = HAZARD_FILL.to_hex();
    let mut features = Vec::with_capacity(collection.len());
    for feature in &collection.features {
        features.push(feature_value(
            &feature.geometry,
            serde_json::json!({ "fill": fill }),
        )?);
    }

    Ok(MapLayer::Geo(GeoLayer {
        name: name.to_owned(),
        geojson: feature_collection_value(features),
        fill_opacity: HAZARD_FILL_OPACITY,
        legend: None,
    }))
}

/// Builds the city marker layer, one marker per city in input order.
#[must_use]
pub fn build_city_layer(cities: &[City], name: &str) -> MapLayer {
    let markers = cities
        .iter()
        .map(|city| Marker {
            latitude: city.latitude,
            longitude: city.longitude,
            popup: city.population.map_or_else(
                || city.name.clone(),
                |population| format!("{}, Population: {population}", city.name),
            ),
        })
        .collect();

    MapLayer::Markers(MarkerLayer {
        name: name.to_owned(),
        markers,
    })
}

fn feature_value(
    geometry: &geo::Geometry<f64>,
    properties: serde_json::Value,
) -> Result<serde_json::Value, RenderError> {
    let geometry = geojson::Geometry::new(geojson::Value::from(geometry));
    Ok(serde_json::json!({
        "type": "Feature",
        "geometry": serde_json::to_value(geometry)?,
        "properties": properties,
    }))
}

fn feature_collection_value(features: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({ "type": "FeatureCollection", "features": features })
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
