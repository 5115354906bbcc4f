//! Continuous color scales derived from observed attribute values.

use std::collections::BTreeMap;

use nl_atlas_models::{Color, JoinedRegion};

use crate::RenderError;

/// A continuous linear color mapping for one attribute.
///
/// Built once after the join completes and immutable thereafter; the
/// domain covers only the non-absent values of the attribute across the
/// full joined set.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    min: f64,
    max: f64,
    anchors: Vec<Color>,
    absent_color: Color,
    caption: String,
}

impl ColorScale {
    /// Derives a scale from observed values.
    ///
    /// `values` are the attribute's values across the whole joined set,
    /// absent ones included (they are ignored for the domain but their
    /// presence is why `absent_color` exists). At least one anchor is
    /// required; a single anchor yields a solid-color scale.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyDomain`] when every value is absent.
    ///
    /// # Panics
    ///
    /// Panics if `anchors` is empty — an empty anchor list is a
    /// programming error in the layer catalog, not a data condition.
    pub fn build(
        values: impl IntoIterator<Item = Option<f64>>,
        anchors: &[Color],
        absent_color: Color,
        caption: &str,
    ) -> Result<Self, RenderError> {
        assert!(!anchors.is_empty(), "a color scale needs at least one anchor");

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut seen = false;
        for value in values.into_iter().flatten() {
            seen = true;
            min = min.min(value);
            max = max.max(value);
        }
        if !seen {
            return Err(RenderError::EmptyDomain {
                caption: caption.to_owned(),
            });
        }

        Ok(Self {
            min,
            max,
            anchors: anchors.to_vec(),
            absent_color,
            caption: caption.to_owned(),
        })
    }

    /// Maps a value to a color by linear interpolation across the
    /// anchor sequence. Values at or beyond the domain bounds clamp to
    /// the end anchors. A degenerate domain (`min == max`) maps every
    /// value to the first anchor.
    #[must_use]
    pub fn color_for(&self, value: f64) -> Color {
        let segments = self.anchors.len() - 1;
        if segments == 0 || self.max <= self.min {
            return self.anchors[0];
        }

        let t = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        #[allow(clippy::cast_precision_loss)]
        let scaled = t * segments as f64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = (scaled.floor() as usize).min(segments - 1);
        #[allow(clippy::cast_precision_loss)]
        let fraction = scaled - index as f64;
        self.anchors[index].lerp(self.anchors[index + 1], fraction)
    }

    /// Maps an optional value, falling back to the absent color.
    #[must_use]
    pub fn map(&self, value: Option<f64>) -> Color {
        value.map_or(self.absent_color, |v| self.color_for(v))
    }

    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn anchors(&self) -> &[Color] {
        &self.anchors
    }

    #[must_use]
    pub const fn absent_color(&self) -> Color {
        self.absent_color
    }

    #[must_use]
    pub fn caption(&self) -> &str {
        &self.caption
    }
}

/// How to build the scale for one attribute.
#[derive(Debug, Clone, Copy)]
pub struct ScaleSpec<'a> {
    /// Joined statistic field the scale covers.
    pub attribute: &'a str,
    /// Anchor colors from domain minimum to maximum.
    pub anchors: &'a [Color],
    /// Legend caption.
    pub caption: &'a str,
}

/// All scales for one map, keyed by attribute.
///
/// Built in one pass over the full joined set, before any layer exists,
/// so every layer reads the same stable domains.
#[derive(Debug, Clone)]
pub struct ColorScaleRegistry {
    scales: BTreeMap<String, ColorScale>,
}

impl ColorScaleRegistry {
    /// Derives one scale per spec from the joined regions.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyDomain`] if any attribute has no
    /// non-absent values (for example when the statistics table was
    /// empty).
    pub fn from_joined(
        regions: &[JoinedRegion],
        specs: &[ScaleSpec<'_>],
        absent_color: Color,
    ) -> Result<Self, RenderError> {
        let mut scales = BTreeMap::new();
        for spec in specs {
            let scale = ColorScale::build(
                regions.iter().map(|region| region.stat(spec.attribute)),
                spec.anchors,
                absent_color,
                spec.caption,
            )?;
            log::debug!(
                "scale for {}: domain {} .. {}",
                spec.attribute,
                scale.min(),
                scale.max()
            );
            scales.insert(spec.attribute.to_owned(), scale);
        }
        Ok(Self { scales })
    }

    /// The scale registered for an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownAttribute`] when no scale was
    /// built for `attribute`.
    pub fn scale(&self, attribute: &str) -> Result<&ColorScale, RenderError> {
        self.scales
            .get(attribute)
            .ok_or_else(|| RenderError::UnknownAttribute {
                attribute: attribute.to_owned(),
            })
    }
}
