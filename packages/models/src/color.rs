//! RGB colors, hex parsing, and linear interpolation.
//!
//! The named constants mirror the CSS color keywords the layer catalog
//! uses for its scale anchors.

use std::fmt;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLUE: Self = Self::new(0x00, 0x00, 0xff);
    pub const CYAN: Self = Self::new(0x00, 0xff, 0xff);
    pub const GREEN: Self = Self::new(0x00, 0x80, 0x00);
    pub const YELLOW: Self = Self::new(0xff, 0xff, 0x00);
    pub const ORANGE: Self = Self::new(0xff, 0xa5, 0x00);
    pub const RED: Self = Self::new(0xff, 0x00, 0x00);
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff);
    pub const DARK_BLUE: Self = Self::new(0x00, 0x00, 0x8b);
    pub const PURPLE: Self = Self::new(0x80, 0x00, 0x80);
    pub const PINK: Self = Self::new(0xff, 0xc0, 0xcb);
    pub const BROWN: Self = Self::new(0xa5, 0x2a, 0x2a);
    pub const LIGHT_GRAY: Self = Self::new(0xd3, 0xd3, 0xd3);
    pub const BLACK: Self = Self::new(0x00, 0x00, 0x00);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses a `#rrggbb` hex string (leading `#` optional).
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    /// Formats as `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear interpolation towards `other`. `t` is clamped to `0..=1`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let channel = |a: u8, b: u8| {
            let mixed = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let rounded = mixed.round().clamp(0.0, 255.0) as u8;
            rounded
        };
        Self {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_and_without_hash() {
        assert_eq!(Color::from_hex("#d3d3d3"), Some(Color::LIGHT_GRAY));
        assert_eq!(Color::from_hex("D3D3D3"), Some(Color::LIGHT_GRAY));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert_eq!(Color::from_hex("#fff"), None);
        assert_eq!(Color::from_hex("nothex"), None);
        // Six bytes but a multibyte char straddles a digit boundary.
        assert_eq!(Color::from_hex("a\u{e9}abc"), None);
    }

    #[test]
    fn hex_round_trips() {
        let color = Color::new(0x12, 0xab, 0xef);
        assert_eq!(Color::from_hex(&color.to_hex()), Some(color));
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = Color::new(0, 0, 0);
        let b = Color::new(200, 100, 50);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Color::new(100, 50, 25));
    }

    #[test]
    fn lerp_clamps_out_of_range() {
        let a = Color::new(10, 10, 10);
        let b = Color::new(20, 20, 20);
        assert_eq!(a.lerp(b, -1.0), a);
        assert_eq!(a.lerp(b, 2.0), b);
    }
}
