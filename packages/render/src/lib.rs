#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Thematic rendering: color scales, map layers, and the final HTML
//! artifact.
//!
//! Scales are derived once from the complete joined dataset so color
//! meaning is stable across the whole map; layers bake their styling
//! per feature (no late-bound styling closures); the composer emits one
//! self-contained Leaflet document with a legend per thematic layer and
//! a layer-visibility control.

pub mod compose;
pub mod layer;
pub mod scale;

pub use compose::{DEFAULT_CENTER, DEFAULT_ZOOM, compose, write_artifact};
pub use layer::{GeoLayer, Legend, MapLayer, MarkerLayer};
pub use scale::{ColorScale, ColorScaleRegistry, ScaleSpec};

/// Errors from scale derivation and artifact rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Every value of an attribute was absent; no color domain can be
    /// derived. The run aborts rather than inventing a default domain.
    #[error("no values to derive a color domain for `{caption}`")]
    EmptyDomain {
        /// Caption of the scale that could not be built.
        caption: String,
    },

    /// A layer referenced an attribute the registry has no scale for.
    #[error("no color scale registered for attribute `{attribute}`")]
    UnknownAttribute {
        /// The attribute name as requested.
        attribute: String,
    },

    /// Embedded GeoJSON serialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
