//! A `#rrggbb` border color, as used by `set-color` (spec.md §6) and [crate::frame::Frame].
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// An RGB color, stored as packed `0x00rrggbb` for cheap comparison and for
/// handing straight to the X server as a pixel value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(u32);

impl Color {
    /// Construct a [Color] from raw 8-bit components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// The packed `0xrrggbb` pixel value, as passed to `set_client_attributes`.
    pub fn pixel(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl TryFrom<&str> for Color {
    type Error = Error;

    /// Parse a canonical `#rrggbb` string (spec.md §3, Frame attributes).
    fn try_from(s: &str) -> Result<Self, Error> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| Error::InvalidColor(s.to_string()))?;

        if hex.len() != 6 {
            return Err(Error::InvalidColor(s.to_string()));
        }

        let value =
            u32::from_str_radix(hex, 16).map_err(|_| Error::InvalidColor(s.to_string()))?;

        Ok(Color(value))
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        Color::try_from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("#ff0000", Color::rgb(0xff, 0, 0); "red")]
    #[test_case("#00ff00", Color::rgb(0, 0xff, 0); "green")]
    #[test_case("#000000", Color::rgb(0, 0, 0); "black")]
    #[test]
    fn parses_valid_hex(s: &str, expected: Color) {
        assert_eq!(Color::try_from(s).unwrap(), expected);
    }

    #[test_case("ff0000"; "missing hash")]
    #[test_case("#fff"; "too short")]
    #[test_case("#gggggg"; "not hex")]
    #[test]
    fn rejects_invalid_hex(s: &str) {
        assert!(Color::try_from(s).is_err());
    }

    #[test]
    fn round_trips_through_display() {
        let c = Color::rgb(0xcc, 0x24, 0x1d);
        assert_eq!(c.to_string(), "#cc241d");
        assert_eq!(Color::try_from(c.to_string().as_str()).unwrap(), c);
    }
}
