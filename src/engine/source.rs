// src/engine/source.rs
//
// Decoded image handed to the normalizer and encoders.

use image::{DynamicImage, GenericImageView};
use std::fmt;

/// Color mode of a decoded image.
///
/// Palette images are expanded to RGB/RGBA pixels at decode time; the mode
/// remembers that the source was indexed and whether it carried a
/// transparency entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Single channel (grayscale)
    Luma,
    /// Luminance + alpha
    LumaAlpha,
    Rgb,
    Rgba,
    /// Palette-indexed, `transparent` when the palette has a tRNS entry
    Palette { transparent: bool },
}

impl ColorMode {
    /// Derive the mode from the decoded buffer layout.
    pub fn of(img: &DynamicImage) -> Self {
        let color = img.color();
        match (color.channel_count(), color.has_alpha()) {
            (1, _) => ColorMode::Luma,
            (2, _) => ColorMode::LumaAlpha,
            (_, true) => ColorMode::Rgba,
            _ => ColorMode::Rgb,
        }
    }

    pub fn has_alpha(&self) -> bool {
        match self {
            ColorMode::LumaAlpha | ColorMode::Rgba => true,
            ColorMode::Palette { transparent } => *transparent,
            ColorMode::Luma | ColorMode::Rgb => false,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorMode::Luma => "L",
            ColorMode::LumaAlpha => "LA",
            ColorMode::Rgb => "RGB",
            ColorMode::Rgba => "RGBA",
            ColorMode::Palette { transparent: false } => "P",
            ColorMode::Palette { transparent: true } => "P+tRNS",
        };
        f.write_str(name)
    }
}

/// An immutable decoded image. Normalization builds a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pixels: DynamicImage,
    mode: ColorMode,
    icc_profile: Option<Vec<u8>>,
}

impl SourceImage {
    /// Wrap a decoded buffer, deriving the mode from its layout.
    pub fn new(pixels: DynamicImage) -> Self {
        let mode = ColorMode::of(&pixels);
        Self {
            pixels,
            mode,
            icc_profile: None,
        }
    }

    /// Wrap a decoded buffer with a mode known from the container
    /// (palette detection needs the original header).
    pub fn with_mode(pixels: DynamicImage, mode: ColorMode) -> Self {
        Self {
            pixels,
            mode,
            icc_profile: None,
        }
    }

    pub fn with_icc_profile(mut self, icc: Option<Vec<u8>>) -> Self {
        self.icc_profile = icc;
        self
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn icc_profile(&self) -> Option<&[u8]> {
        self.icc_profile.as_deref()
    }

    pub fn has_alpha(&self) -> bool {
        self.mode.has_alpha()
    }
}

impl From<DynamicImage> for SourceImage {
    fn from(pixels: DynamicImage) -> Self {
        Self::new(pixels)
    }
}
