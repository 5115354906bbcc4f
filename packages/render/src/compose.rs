//! Map composition and artifact serialization.
//!
//! Assembles layers into one self-contained Leaflet HTML document.
//! Layer insertion order is preserved end-to-end (later layers occlude
//! earlier ones), every layer is toggleable through one layer control,
//! and each thematic layer contributes its legend exactly once — a
//! legend follows its layer's visibility.

use std::fmt::Write as _;
use std::path::Path;

use crate::RenderError;
use crate::layer::{
    MARKER_FILL, MARKER_FILL_OPACITY, MARKER_OUTLINE, MARKER_RADIUS, MapLayer, OUTLINE_COLOR,
    OUTLINE_WEIGHT,
};

/// Map center: geographic midpoint of the Netherlands.
pub const DEFAULT_CENTER: (f64, f64) = (52.1326, 5.2913);
/// Initial zoom level.
pub const DEFAULT_ZOOM: u8 = 7;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

/// Serializes the composed map to an HTML document.
///
/// `center` is `(latitude, longitude)`. Layers are added in the order
/// given; each [`MapLayer::Geo`] carrying a legend gets that legend
/// registered once, shown and hidden together with its layer.
///
/// # Errors
///
/// Returns [`RenderError::Json`] if embedding a layer's data fails.
pub fn compose(
    title: &str,
    layers: &[MapLayer],
    center: (f64, f64),
    zoom: u8,
) -> Result<String, RenderError> {
    let mut html = String::new();
    let mut script = String::new();

    let (latitude, longitude) = center;
    push_fmt(&mut script, format_args!(
        "var map = L.map('map').setView([{latitude}, {longitude}], {zoom});\n\
         L.tileLayer({}, {{ attribution: {} }}).addTo(map);\n\
         var overlays = {{}};\n",
        js_string(TILE_URL)?,
        js_string(TILE_ATTRIBUTION)?,
    ));

    for (index, layer) in layers.iter().enumerate() {
        match layer {
            MapLayer::Geo(geo_layer) => {
                push_fmt(&mut script, format_args!(
                    "var layer_{index} = L.geoJSON({data}, {{\n\
                     \x20 style: function (feature) {{\n\
                     \x20   return {{\n\
                     \x20     fillColor: feature.properties.fill,\n\
                     \x20     color: {outline},\n\
                     \x20     weight: {weight},\n\
                     \x20     fillOpacity: {opacity}\n\
                     \x20   }};\n\
                     \x20 }},\n\
                     \x20 onEachFeature: function (feature, layer) {{\n\
                     \x20   if (feature.properties.tooltip) {{\n\
                     \x20     layer.bindTooltip(feature.properties.tooltip);\n\
                     \x20   }}\n\
                     \x20 }}\n\
                     }}).addTo(map);\n\
                     overlays[{name}] = layer_{index};\n",
                    data = serde_json::to_string(&geo_layer.geojson)?,
                    outline = js_string(&OUTLINE_COLOR.to_hex())?,
                    weight = OUTLINE_WEIGHT,
                    opacity = geo_layer.fill_opacity,
                    name = js_string(&geo_layer.name)?,
                ));

                if let Some(legend) = &geo_layer.legend {
                    let gradient = legend
                        .anchors
                        .iter()
                        .map(|color| color.to_hex())
                        .collect::<Vec<_>>()
                        .join(", ");
                    push_fmt(&mut script, format_args!(
                        "var legend_{index} = L.control({{ position: 'bottomright' }});\n\
                         legend_{index}.onAdd = function () {{\n\
                         \x20 var div = L.DomUtil.create('div', 'legend');\n\
                         \x20 div.innerHTML = {caption}\n\
                         \x20   + '<div class=\"bar\" style=\"background: linear-gradient(to right, {gradient})\"></div>'\n\
                         \x20   + '<div class=\"bounds\"><span>{min}</span><span>{max}</span></div>';\n\
                         \x20 return div;\n\
                         }};\n\
                         legend_{index}.addTo(map);\n\
                         map.on('overlayadd', function (e) {{\n\
                         \x20 if (e.layer === layer_{index}) {{ legend_{index}.addTo(map); }}\n\
                         }});\n\
                         map.on('overlayremove', function (e) {{\n\
                         \x20 if (e.layer === layer_{index}) {{ map.removeControl(legend_{index}); }}\n\
                         }});\n",
                        caption = js_string(&format!(
                            "<div class=\"caption\">{}</div>",
                            legend.caption
                        ))?,
                        min = legend.min,
                        max = legend.max,
                    ));
                }
            }
            MapLayer::Markers(marker_layer) => {
                push_fmt(&mut script, format_args!("var layer_{index} = L.layerGroup([\n"));
                for marker in &marker_layer.markers {
                    push_fmt(&mut script, format_args!(
                        "\x20 L.circleMarker([{lat}, {lng}], {{\n\
                         \x20   radius: {radius},\n\
                         \x20   color: {outline},\n\
                         \x20   fill: true,\n\
                         \x20   fillColor: {fill},\n\
                         \x20   fillOpacity: {opacity}\n\
                         \x20 }}).bindPopup({popup}),\n",
                        lat = marker.latitude,
                        lng = marker.longitude,
                        radius = MARKER_RADIUS,
                        outline = js_string(&MARKER_OUTLINE.to_hex())?,
                        fill = js_string(&MARKER_FILL.to_hex())?,
                        opacity = MARKER_FILL_OPACITY,
                        popup = js_string(&marker.popup)?,
                    ));
                }
                push_fmt(&mut script, format_args!(
                    "]).addTo(map);\noverlays[{name}] = layer_{index};\n",
                    name = js_string(&marker_layer.name)?,
                ));
            }
        }
    }

    script.push_str("L.control.layers(null, overlays).addTo(map);\n");

    push_fmt(&mut html, format_args!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <link rel=\"stylesheet\" href=\"{LEAFLET_CSS}\">\n\
         <script src=\"{LEAFLET_JS}\"></script>\n\
         <style>\n\
         html, body, #map {{ height: 100%; margin: 0; }}\n\
         .legend {{ background: white; padding: 6px 8px; font: 12px sans-serif; \
         box-shadow: 0 0 15px rgba(0,0,0,0.2); border-radius: 4px; }}\n\
         .legend .bar {{ height: 10px; width: 180px; margin: 4px 0; }}\n\
         .legend .bounds {{ display: flex; justify-content: space-between; }}\n\
         </style>\n\
         </head>\n\
         <body>\n\
         <div id=\"map\"></div>\n\
         <script>\n{script}</script>\n\
         </body>\n\
         </html>\n",
    ));

    log::info!("composed map with {} layers", layers.len());
    Ok(html)
}

/// Writes the composed document to `path`.
///
/// This is the pipeline's only filesystem side effect and runs last:
/// any earlier failure leaves no partially-rendered artifact behind.
///
/// # Errors
///
/// Returns [`RenderError::Io`] if the write fails.
pub fn write_artifact(path: &Path, html: &str) -> Result<(), RenderError> {
    std::fs::write(path, html)?;
    log::info!("map written to {}", path.display());
    Ok(())
}

/// A JS string literal (quoted, escaped) for safe embedding.
fn js_string(text: &str) -> Result<String, RenderError> {
    Ok(serde_json::to_string(text)?)
}

/// Infallible formatting into a `String`.
fn push_fmt(buffer: &mut String, args: std::fmt::Arguments<'_>) {
    // Writing to a String cannot fail.
    let _ = buffer.write_fmt(args);
}

#[cfg(test)]
mod tests {
    use nl_atlas_models::Color;

    use super::*;
    use crate::layer::{GeoLayer, Legend, Marker, MarkerLayer};

    fn thematic(name: &str, caption: &str) -> MapLayer {
        MapLayer::Geo(GeoLayer {
            name: name.to_owned(),
            geojson: serde_json::json!({ "type": "FeatureCollection", "features": [] }),
            fill_opacity: 0.7,
            legend: Some(Legend {
                caption: caption.to_owned(),
                anchors: vec![Color::WHITE, Color::RED],
                min: 0.0,
                max: 10.0,
            }),
        })
    }

    fn markers(name: &str) -> MapLayer {
        MapLayer::Markers(MarkerLayer {
            name: name.to_owned(),
            markers: vec![Marker {
                latitude: 52.37,
                longitude: 4.89,
                popup: "Amsterdam, Population: 1166203".to_owned(),
            }],
        })
    }

    fn occurrences(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn every_layer_is_registered_once_in_the_control() {
        let layers = vec![
            thematic("Average Income", "Income caption"),
            thematic("Population Density", "Density caption"),
            markers("Cities"),
        ];
        let html = compose("Atlas", &layers, DEFAULT_CENTER, DEFAULT_ZOOM).unwrap();

        assert_eq!(occurrences(&html, "overlays[\"Average Income\"]"), 1);
        assert_eq!(occurrences(&html, "overlays[\"Population Density\"]"), 1);
        assert_eq!(occurrences(&html, "overlays[\"Cities\"]"), 1);
        assert_eq!(occurrences(&html, "L.control.layers"), 1);
    }

    #[test]
    fn each_legend_appears_exactly_once() {
        let layers = vec![
            thematic("Average Income", "Income caption"),
            thematic("Population Density", "Density caption"),
        ];
        let html = compose("Atlas", &layers, DEFAULT_CENTER, DEFAULT_ZOOM).unwrap();

        assert_eq!(occurrences(&html, "Income caption"), 1);
        assert_eq!(occurrences(&html, "Density caption"), 1);
        assert_eq!(occurrences(&html, "legend_0.addTo(map);"), 2); // initial add + overlayadd hook
    }

    #[test]
    fn layer_order_follows_insertion_order() {
        let layers = vec![
            thematic("First", "c1"),
            thematic("Second", "c2"),
            markers("Third"),
        ];
        let html = compose("Atlas", &layers, DEFAULT_CENTER, DEFAULT_ZOOM).unwrap();

        let first = html.find("overlays[\"First\"]").unwrap();
        let second = html.find("overlays[\"Second\"]").unwrap();
        let third = html.find("overlays[\"Third\"]").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn hazard_layer_without_legend_adds_no_legend_control() {
        let layer = MapLayer::Geo(GeoLayer {
            name: "Historical Flooding".to_owned(),
            geojson: serde_json::json!({ "type": "FeatureCollection", "features": [] }),
            fill_opacity: 0.3,
            legend: None,
        });
        let html = compose("Atlas", &[layer], DEFAULT_CENTER, DEFAULT_ZOOM).unwrap();

        assert_eq!(occurrences(&html, "legend_0"), 0);
        assert_eq!(occurrences(&html, "overlays[\"Historical Flooding\"]"), 1);
    }

    #[test]
    fn markers_carry_popup_and_style_constants() {
        let html = compose("Atlas", &[markers("Cities")], DEFAULT_CENTER, DEFAULT_ZOOM).unwrap();

        assert!(html.contains("\"Amsterdam, Population: 1166203\""));
        assert!(html.contains("radius: 5"));
        assert!(html.contains("\"#008000\"")); // green outline
        assert!(html.contains("\"#ff0000\"")); // red fill
    }

    #[test]
    fn document_sets_view_to_requested_center() {
        let html = compose("Atlas", &[], (52.1326, 5.2913), 7).unwrap();
        assert!(html.contains("setView([52.1326, 5.2913], 7)"));
        assert!(html.contains("<title>Atlas</title>"));
    }
}
