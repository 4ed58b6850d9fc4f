// src/engine/encoder.rs
//
// Encoder operations: JPEG (mozjpeg), PNG (image + oxipng), WebP (libwebp).
// Every encode is pure: same image, format and quality give the same bytes.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::source::SourceImage;
use crate::error::SizeFitError;
use crate::request::{OutputFormat, MAX_QUALITY};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use img_parts::{jpeg::Jpeg, png::Png, ImageICC};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use std::borrow::Cow;

use crate::engine::MAX_DIMENSION;

/// oxipng preset used for the lossless bitmap output. 6 is the highest
/// preset available without zopfli.
const PNG_OPTIMIZE_PRESET: u8 = 6;

/// Turns an image into bytes for a given format and quality.
///
/// The quality search only talks to this trait, so tests can drive it with a
/// scripted size curve instead of a real codec.
pub trait Encoder {
    /// Encode `image` as `format`. `quality` is required for the searched
    /// formats and ignored for the lossless bitmap.
    fn encode(
        &self,
        image: &SourceImage,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> EngineResult<Vec<u8>>;
}

impl<E: Encoder + ?Sized> Encoder for &E {
    fn encode(
        &self,
        image: &SourceImage,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> EngineResult<Vec<u8>> {
        (**self).encode(image, format, quality)
    }
}

/// The real codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecEncoder {
    keep_icc: bool,
}

impl CodecEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed the source ICC profile (if any) into every output.
    pub fn with_icc(keep_icc: bool) -> Self {
        Self { keep_icc }
    }
}

impl Encoder for CodecEncoder {
    fn encode(
        &self,
        image: &SourceImage,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> EngineResult<Vec<u8>> {
        let icc = if self.keep_icc {
            image.icc_profile()
        } else {
            None
        };
        match format {
            OutputFormat::Lossy8bit => {
                if image.has_alpha() {
                    return Err(SizeFitError::encode_contract_violation(
                        "jpg",
                        format!("{} image reached the JPEG encoder unflattened", image.mode()),
                    ));
                }
                encode_jpeg(image.pixels(), require_quality(format, quality)?, icc)
            }
            OutputFormat::HybridLossyLossless => {
                encode_webp(image.pixels(), require_quality(format, quality)?, icc)
            }
            OutputFormat::LosslessBitmap => encode_png(image.pixels(), icc),
        }
    }
}

fn require_quality(format: OutputFormat, quality: Option<u8>) -> EngineResult<u8> {
    quality.ok_or_else(|| {
        SizeFitError::invalid_argument(
            "quality",
            "none",
            format!("{format} output needs a quality level"),
        )
    })
}

/// Quality-banded tuning for libwebp.
/// - High (>=85): sharper filtering, lower SNS
/// - Balanced (70-84)
/// - Fast (<70): stronger SNS, softer filtering
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    quality: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityBand {
    High,
    Balanced,
    Fast,
}

impl QualitySettings {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.min(MAX_QUALITY) as f32,
        }
    }

    fn band(&self) -> QualityBand {
        if self.quality >= 85.0 {
            QualityBand::High
        } else if self.quality >= 70.0 {
            QualityBand::Balanced
        } else {
            QualityBand::Fast
        }
    }

    pub fn webp_method(&self) -> i32 {
        4
    }

    pub fn webp_sns_strength(&self) -> i32 {
        match self.band() {
            QualityBand::High => 50,
            QualityBand::Balanced => 70,
            QualityBand::Fast => 80,
        }
    }

    pub fn webp_filter_strength(&self) -> i32 {
        if self.quality >= 80.0 {
            20
        } else if self.quality >= 60.0 {
            30
        } else {
            40
        }
    }

    pub fn webp_filter_sharpness(&self) -> i32 {
        match self.band() {
            QualityBand::High => 2,
            QualityBand::Balanced | QualityBand::Fast => 0,
        }
    }

    /// mozjpeg smoothing factor; low qualities get more smoothing so the
    /// size curve keeps falling.
    pub fn jpeg_smoothing(&self) -> u8 {
        if self.quality >= 90.0 {
            0
        } else if self.quality >= 70.0 {
            5
        } else if self.quality >= 60.0 {
            10
        } else {
            18
        }
    }
}

/// Encode to JPEG using mozjpeg (progressive, optimized coding, 4:2:0).
///
/// Rejects images with an alpha channel: flattening is the normalizer's job.
pub fn encode_jpeg(img: &DynamicImage, quality: u8, icc: Option<&[u8]>) -> EngineResult<Vec<u8>> {
    if img.color().has_alpha() {
        return Err(SizeFitError::encode_contract_violation(
            "jpg",
            format!("{:?} buffer carries alpha", img.color()),
        ));
    }

    run_with_panic_policy("encode:jpeg", || {
        let settings = QualitySettings::new(quality);

        // Zero-copy when already RGB8
        let rgb: Cow<'_, image::RgbImage> = match img {
            DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
            _ => Cow::Owned(img.to_rgb8()),
        };
        let (w, h) = rgb.dimensions();
        let pixels: &[u8] = rgb.as_raw();

        if w == 0 || h == 0 {
            return Err(SizeFitError::encode_failed(
                "jpg",
                "image width or height is zero",
            ));
        }
        if w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(SizeFitError::dimension_exceeds_limit(
                w.max(h),
                MAX_DIMENSION,
            ));
        }

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(settings.quality);
        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);
        comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);
        comp.set_smoothing_factor(settings.jpeg_smoothing());

        let estimated_size = (w as usize * h as usize * 3 / 10).max(4096);
        let mut output = Vec::with_capacity(estimated_size);

        {
            let mut writer = comp.start_compress(&mut output).map_err(|e| {
                SizeFitError::encode_failed(
                    "jpg",
                    format!("mozjpeg: failed to start compress: {e:?}"),
                )
            })?;

            let stride = w as usize * 3;
            for row in pixels.chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    SizeFitError::encode_failed(
                        "jpg",
                        format!("mozjpeg: failed to write scanlines: {e:?}"),
                    )
                })?;
            }

            writer.finish().map_err(|e| {
                SizeFitError::encode_failed("jpg", format!("mozjpeg: failed to finish: {e:?}"))
            })?;
        }

        match icc {
            Some(icc_data) => embed_icc_jpeg(output, icc_data),
            None => Ok(output),
        }
    })
}

/// Embed ICC profile into JPEG (APP2 marker) using img-parts
pub fn embed_icc_jpeg(jpeg_data: Vec<u8>, icc: &[u8]) -> EngineResult<Vec<u8>> {
    use img_parts::jpeg::{markers::APP2, JpegSegment};
    use img_parts::Bytes;

    let mut jpeg = Jpeg::from_bytes(Bytes::from(jpeg_data)).map_err(|e| {
        SizeFitError::encode_failed("jpg", format!("failed to parse JPEG for ICC: {e}"))
    })?;

    let mut marker_data = Vec::with_capacity(14 + icc.len());
    marker_data.extend_from_slice(b"ICC_PROFILE\0");
    marker_data.push(1);
    marker_data.push(1);
    marker_data.extend_from_slice(icc);

    let segment = JpegSegment::new_with_contents(APP2, Bytes::from(marker_data));
    jpeg.segments_mut().insert(0, segment);

    let mut output = Vec::new();
    jpeg.encoder().write_to(&mut output).map_err(|e| {
        SizeFitError::encode_failed("jpg", format!("failed to write JPEG with ICC: {e}"))
    })?;
    Ok(output)
}

/// Encode to PNG with maximum lossless effort: best zlib level and adaptive
/// filtering from the image crate, then an oxipng pass.
pub fn encode_png(img: &DynamicImage, icc: Option<&[u8]>) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let mut buf = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive);
        img.write_with_encoder(encoder)
            .map_err(|e| SizeFitError::encode_failed("png", format!("PNG encode failed: {e}")))?;

        let mut options = oxipng::Options::from_preset(PNG_OPTIMIZE_PRESET);
        // Keep ancillary chunks; ICC is handled explicitly below
        options.strip = oxipng::StripChunks::None;

        let optimized = oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
            SizeFitError::encode_failed("png", format!("oxipng optimization failed: {e}"))
        })?;

        match icc {
            Some(icc_data) => embed_icc_png(optimized, icc_data),
            None => Ok(optimized),
        }
    })
}

/// Embed ICC profile into PNG (iCCP chunk) using img-parts
pub fn embed_icc_png(png_data: Vec<u8>, icc: &[u8]) -> EngineResult<Vec<u8>> {
    use img_parts::Bytes;

    let mut png = Png::from_bytes(Bytes::from(png_data)).map_err(|e| {
        SizeFitError::encode_failed("png", format!("failed to parse PNG for ICC: {e}"))
    })?;
    png.set_icc_profile(Some(Bytes::from(icc.to_vec())));

    let mut output = Vec::new();
    png.encoder().write_to(&mut output).map_err(|e| {
        SizeFitError::encode_failed("png", format!("failed to write PNG with ICC: {e}"))
    })?;
    Ok(output)
}

/// Encode to lossy WebP. Alpha is kept when the image has it.
pub fn encode_webp(img: &DynamicImage, quality: u8, icc: Option<&[u8]>) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:webp", || {
        let settings = QualitySettings::new(quality);

        let mut config = webp::WebPConfig::new()
            .map_err(|_| SizeFitError::internal_panic("failed to create WebPConfig"))?;
        config.quality = settings.quality;
        config.method = settings.webp_method();
        config.pass = 1;
        config.preprocessing = 0;
        config.sns_strength = settings.webp_sns_strength();
        config.autofilter = 1;
        config.filter_strength = settings.webp_filter_strength();
        config.filter_sharpness = settings.webp_filter_sharpness();

        let encoded = if img.color().has_alpha() {
            let rgba: Cow<'_, image::RgbaImage> = match img {
                DynamicImage::ImageRgba8(rgba_img) => Cow::Borrowed(rgba_img),
                _ => Cow::Owned(img.to_rgba8()),
            };
            let (w, h) = rgba.dimensions();
            webp::Encoder::from_rgba(&rgba, w, h)
                .encode_advanced(&config)
                .map_err(|e| {
                    SizeFitError::encode_failed("webp", format!("WebP encode failed: {e:?}"))
                })?
                .to_vec()
        } else {
            let rgb: Cow<'_, image::RgbImage> = match img {
                DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
                _ => Cow::Owned(img.to_rgb8()),
            };
            let (w, h) = rgb.dimensions();
            webp::Encoder::from_rgb(&rgb, w, h)
                .encode_advanced(&config)
                .map_err(|e| {
                    SizeFitError::encode_failed("webp", format!("WebP encode failed: {e:?}"))
                })?
                .to_vec()
        };

        match icc {
            Some(icc_data) => embed_icc_webp(encoded, icc_data),
            None => Ok(encoded),
        }
    })
}

/// Embed ICC profile into WebP (ICCP chunk) using img-parts
pub fn embed_icc_webp(webp_data: Vec<u8>, icc: &[u8]) -> EngineResult<Vec<u8>> {
    use img_parts::webp::WebP;
    use img_parts::Bytes;

    let mut webp = WebP::from_bytes(Bytes::from(webp_data)).map_err(|e| {
        SizeFitError::encode_failed("webp", format!("failed to parse WebP for ICC: {e}"))
    })?;
    webp.set_icc_profile(Some(Bytes::from(icc.to_vec())));

    let mut output = Vec::new();
    webp.encoder().write_to(&mut output).map_err(|e| {
        SizeFitError::encode_failed("webp", format!("failed to write WebP with ICC: {e}"))
    })?;
    Ok(output)
}
