//! RGBA colors for legend, node and link styling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Alpha applied to Sankey links so overlapping flows stay readable.
pub const LINK_ALPHA: f32 = 0.7;

/// Named colors used by the landcover legends.
const NAMED: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("cornflowerblue", [100, 149, 237]),
    ("limegreen", [50, 205, 50]),
    ("darkred", [139, 0, 0]),
    ("darkgreen", [0, 100, 0]),
    ("goldenrod", [218, 165, 32]),
    ("darkblue", [0, 0, 139]),
    ("lightblue", [173, 216, 230]),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// 0.0 (transparent) to 1.0 (opaque).
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a: a.clamp(0.0, 1.0), ..self }
    }

    /// CSS `rgba(r, g, b, a)` string.
    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a >= 1.0 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.alpha_u8())
        }
    }

    pub fn alpha_u8(&self) -> u8 {
        (self.a * 255.0).round() as u8
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.alpha_u8()]
    }
}

impl FromStr for Rgba {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let t = s.trim();
        let invalid = || Error::InvalidColor(s.to_string());

        if let Some(hex) = t.strip_prefix('#') {
            if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
                return Err(invalid());
            }
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
            let (r, g, b) = (byte(0)?, byte(2)?, byte(4)?);
            let a = if hex.len() == 8 { byte(6)? as f32 / 255.0 } else { 1.0 };
            return Ok(Self { r, g, b, a });
        }

        let lower = t.to_ascii_lowercase();
        NAMED
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|&(_, [r, g, b])| Self::rgb(r, g, b))
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_names() {
        assert_eq!("#6495ED".parse::<Rgba>().unwrap(), Rgba::rgb(100, 149, 237));
        assert_eq!("CornflowerBlue".parse::<Rgba>().unwrap(), Rgba::rgb(100, 149, 237));
        let clear: Rgba = "#FFFFFF00".parse().unwrap();
        assert_eq!(clear.alpha_u8(), 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!("#12345".parse::<Rgba>().is_err());
        assert!("#GG0000".parse::<Rgba>().is_err());
        assert!("mauve-ish".parse::<Rgba>().is_err());
    }

    #[test]
    fn css_output_matches_link_style() {
        let c = Rgba::rgb(139, 0, 0).with_alpha(LINK_ALPHA);
        assert_eq!(c.to_css(), "rgba(139, 0, 0, 0.7)");
        assert_eq!(Rgba::rgb(0, 0, 139).to_css(), "rgba(0, 0, 139, 1)");
    }

    #[test]
    fn hex_roundtrip() {
        for s in ["#DAA520", "#00008B", "#FFFFFF00"] {
            let c: Rgba = s.parse().unwrap();
            assert_eq!(c.to_hex(), s);
        }
    }
}
