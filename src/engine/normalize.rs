// src/engine/normalize.rs
//
// Pre-encode normalization: make a decoded image safe for the target format.
// JPEG cannot carry transparency, so alpha is flattened onto an opaque
// background; everything else passes through untouched.

use crate::color::BackgroundColor;
use crate::engine::source::{ColorMode, SourceImage};
use crate::request::OutputFormat;
use image::{DynamicImage, Rgb, RgbImage};

/// Prepare `image` for encoding as `format`. Never mutates the input.
pub fn normalize(
    image: &SourceImage,
    format: OutputFormat,
    background: BackgroundColor,
) -> SourceImage {
    if format.supports_transparency() {
        return image.clone();
    }

    let icc = image.icc_profile().map(<[u8]>::to_vec);
    let pixels = if image.has_alpha() {
        tracing::debug!(
            target: "sizefit::normalize",
            mode = %image.mode(),
            %background,
            "flattening alpha"
        );
        DynamicImage::ImageRgb8(flatten_alpha(image.pixels(), background))
    } else if image.mode() == ColorMode::Rgb && matches!(image.pixels(), DynamicImage::ImageRgb8(_))
    {
        return image.clone();
    } else {
        DynamicImage::ImageRgb8(image.pixels().to_rgb8())
    };

    SourceImage::with_mode(pixels, ColorMode::Rgb).with_icc_profile(icc)
}

/// Composite `img` over an opaque `background`:
/// `out = src * a + bg * (1 - a)` per channel, rounded to nearest.
pub fn flatten_alpha(img: &DynamicImage, background: BackgroundColor) -> RgbImage {
    let rgba = img.to_rgba8();
    let bg = background.to_array();
    let (w, h) = rgba.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let px = rgba.get_pixel(x, y).0;
        let alpha = u32::from(px[3]);
        let inv = 255 - alpha;
        let blend = |src: u8, back: u8| {
            ((u32::from(src) * alpha + u32::from(back) * inv + 127) / 255) as u8
        };
        Rgb([
            blend(px[0], bg[0]),
            blend(px[1], bg[1]),
            blend(px[2], bg[2]),
        ])
    })
}
