// src/color.rs
//
// Background color used when flattening transparency for JPEG output.
// Accepts any CSS color string: hex, rgb()/hsl()/hwb() and the CSS names.

use crate::error::{Result, SizeFitError};
use std::fmt;
use std::str::FromStr;

/// Opaque RGB background. Any alpha given in the source string is ignored:
/// flattening always produces a fully opaque image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BackgroundColor {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Parse a CSS color string, case-insensitively.
    pub fn parse(value: &str) -> Result<Self> {
        let color = csscolorparser::parse(value.trim())
            .map_err(|_| SizeFitError::invalid_color(value.to_string()))?;
        let [r, g, b, _alpha] = color.to_rgba8();
        Ok(Self::new(r, g, b))
    }
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for BackgroundColor {
    type Err = SizeFitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(BackgroundColor::parse("#ffffff").unwrap(), BackgroundColor::WHITE);
        assert_eq!(
            BackgroundColor::parse("#1a2B3c").unwrap(),
            BackgroundColor::new(0x1a, 0x2b, 0x3c)
        );
        assert_eq!(
            BackgroundColor::parse("#f80").unwrap(),
            BackgroundColor::new(0xff, 0x88, 0x00)
        );
    }

    #[test]
    fn hex_alpha_is_ignored() {
        assert_eq!(
            BackgroundColor::parse("#10203000").unwrap(),
            BackgroundColor::new(0x10, 0x20, 0x30)
        );
        assert_eq!(
            BackgroundColor::parse("#0000").unwrap(),
            BackgroundColor::BLACK
        );
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(BackgroundColor::parse("White").unwrap(), BackgroundColor::WHITE);
        assert_eq!(
            BackgroundColor::parse("  grey ").unwrap(),
            BackgroundColor::new(128, 128, 128)
        );
    }

    #[test]
    fn parses_the_full_css_name_table() {
        let cases = [
            ("coral", (255, 127, 80)),
            ("darkblue", (0, 0, 139)),
            ("RebeccaPurple", (102, 51, 153)),
            ("lightgoldenrodyellow", (250, 250, 210)),
            ("papayawhip", (255, 239, 213)),
        ];
        for (name, (r, g, b)) in cases {
            assert_eq!(
                BackgroundColor::parse(name).unwrap(),
                BackgroundColor::new(r, g, b),
                "{name}"
            );
        }
    }

    #[test]
    fn parses_color_functions() {
        assert_eq!(
            BackgroundColor::parse("rgb(12, 34, 56)").unwrap(),
            BackgroundColor::new(12, 34, 56)
        );
        assert_eq!(
            BackgroundColor::parse("rgb(100%, 0%, 100%)").unwrap(),
            BackgroundColor::new(255, 0, 255)
        );
        assert_eq!(
            BackgroundColor::parse("hsl(0, 100%, 50%)").unwrap(),
            BackgroundColor::new(255, 0, 0)
        );
        assert!(BackgroundColor::parse("rgb(1, 2)").is_err());
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "#", "#12", "#gggggg", "#1234567", "notacolor"] {
            let err = BackgroundColor::parse(bad).unwrap_err();
            assert!(matches!(err, SizeFitError::InvalidColor { .. }), "{bad}");
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        let color = BackgroundColor::new(1, 128, 255);
        assert_eq!(color.to_string(), "#0180ff");
        assert_eq!(color.to_string().parse::<BackgroundColor>().unwrap(), color);
    }
}
