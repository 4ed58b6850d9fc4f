// src/engine/decoder.rs
//
// Decoder operations: JPEG (mozjpeg), WebP (libwebp), everything else through
// the image crate. Dimensions are checked before any pixel buffer is allocated.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::SizeFitError;
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, RgbImage};
use mozjpeg::{ColorSpace, Decompress};
use std::io::Cursor;
use webp::{BitstreamFeatures, Decoder as WebPDecoder};

/// Decode JPEG using mozjpeg. Grayscale sources stay single-channel.
pub fn decode_jpeg_mozjpeg(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:mozjpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(SizeFitError::decode_failed(
                "mozjpeg: missing JPEG EOI marker",
            ));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            SizeFitError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let (width, height) = (decompress.width(), decompress.height());
        if width > MAX_DIMENSION as usize || height > MAX_DIMENSION as usize {
            return Err(SizeFitError::dimension_exceeds_limit(
                width.max(height).min(u32::MAX as usize) as u32,
                MAX_DIMENSION,
            ));
        }
        let width = width as u32;
        let height = height as u32;
        check_dimensions(width, height)?;

        if matches!(decompress.color_space(), ColorSpace::JCS_GRAYSCALE) {
            let mut started = decompress.grayscale().map_err(|e| {
                SizeFitError::decode_failed(format!("mozjpeg grayscale start failed: {e:?}"))
            })?;
            let luma: Vec<u8> = started.read_scanlines().map_err(|e| {
                SizeFitError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
            })?;
            let gray = GrayImage::from_raw(width, height, luma).ok_or_else(|| {
                SizeFitError::decode_failed("mozjpeg: scanline buffer does not match dimensions")
            })?;
            return Ok(DynamicImage::ImageLuma8(gray));
        }

        let mut started = decompress.rgb().map_err(|e| {
            SizeFitError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
        })?;
        let pixels: Vec<[u8; 3]> = started.read_scanlines().map_err(|e| {
            SizeFitError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
        })?;
        let flat: Vec<u8> = pixels.into_iter().flatten().collect();
        let rgb = RgbImage::from_raw(width, height, flat).ok_or_else(|| {
            SizeFitError::decode_failed("mozjpeg: scanline buffer does not match dimensions")
        })?;

        Ok(DynamicImage::ImageRgb8(rgb))
    })
}

/// Decode still WebP with libwebp; animated files go through the image crate.
pub fn decode_webp_libwebp(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:webp", || {
        let features = BitstreamFeatures::new(data).ok_or_else(|| {
            SizeFitError::decode_failed("webp: failed to read bitstream features")
        })?;

        if features.has_animation() {
            return decode_with_image_crate(data);
        }

        check_dimensions(features.width(), features.height())?;

        let decoded = WebPDecoder::new(data)
            .decode()
            .ok_or_else(|| SizeFitError::decode_failed("webp: decode failed"))?;
        check_dimensions(decoded.width(), decoded.height())?;

        Ok(decoded.to_image())
    })
}

/// Decode PNG and the remaining formats through the image crate.
pub fn decode_with_image_crate(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        let img = image::load_from_memory(data)
            .map_err(|e| SizeFitError::decode_failed(format!("decode failed: {e}")))?;
        // 16-bit and float buffers are reduced to 8 bits per channel.
        Ok(match img {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_) => img,
            DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(img.to_luma8()),
            DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
            other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        })
    })
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Unified decode entrypoint: detect the format once and route to a decoder.
pub fn decode_image(bytes: &[u8]) -> EngineResult<(DynamicImage, Option<ImageFormat>)> {
    let detected = detect_format(bytes);
    let img = match detected {
        Some(ImageFormat::Jpeg) => decode_jpeg_mozjpeg(bytes)?,
        Some(ImageFormat::WebP) => decode_webp_libwebp(bytes)?,
        _ => decode_with_image_crate(bytes)?,
    };
    Ok((img, detected))
}

/// Reject images whose dimensions could be a decompression bomb.
pub fn check_dimensions(width: u32, height: u32) -> EngineResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(SizeFitError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_PIXELS {
        return Err(SizeFitError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Read dimensions from the header and check them before decoding.
/// Headers the image crate cannot parse are left for the decoder to reject.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> EngineResult<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}
