// src/engine/io.rs
//
// I/O operations: file loading, container inspection (palette, ICC profile),
// output naming and writing.

use crate::engine::common::EngineResult;
use crate::engine::decoder::{decode_image, ensure_dimensions_safe};
use crate::engine::source::{ColorMode, SourceImage};
use crate::error::SizeFitError;
use crate::request::OutputFormat;
use image::ImageFormat;
use img_parts::{jpeg::Jpeg, png::Png, webp::WebP, ImageICC};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// PNG IHDR color type for indexed images.
const PNG_COLOR_TYPE_PALETTE: u8 = 3;

/// Load and decode the image at `path`.
pub fn load_image(path: &Path) -> EngineResult<SourceImage> {
    let shown = path.to_string_lossy().into_owned();
    if !path.exists() {
        return Err(SizeFitError::input_not_found(shown));
    }
    let data = fs::read(path).map_err(|e| SizeFitError::file_read_failed(shown, e))?;
    let image = decode_source(&data)?;
    debug!(
        target: "sizefit::io",
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        mode = %image.mode(),
        icc = image.icc_profile().is_some(),
        "loaded"
    );
    Ok(image)
}

/// Decode in-memory bytes into a [`SourceImage`], keeping the container
/// facts the pixel buffer loses (palette, ICC profile).
pub fn decode_source(data: &[u8]) -> EngineResult<SourceImage> {
    ensure_dimensions_safe(data)?;
    let (pixels, detected) = decode_image(data)?;

    let mode = match detected {
        Some(ImageFormat::Png) => png_palette_mode(data).unwrap_or_else(|| ColorMode::of(&pixels)),
        _ => ColorMode::of(&pixels),
    };

    Ok(SourceImage::with_mode(pixels, mode).with_icc_profile(extract_icc_profile(data)))
}

/// `Some(Palette { .. })` when the PNG header declares an indexed image.
/// The transparency flag follows the presence of a tRNS chunk.
pub fn png_palette_mode(data: &[u8]) -> Option<ColorMode> {
    let png = Png::from_bytes(data.to_vec().into()).ok()?;
    let ihdr = png.chunk_by_type(*b"IHDR")?;
    let color_type = *ihdr.contents().get(9)?;
    if color_type != PNG_COLOR_TYPE_PALETTE {
        return None;
    }
    Some(ColorMode::Palette {
        transparent: png.chunk_by_type(*b"tRNS").is_some(),
    })
}

/// Extract the ICC profile from JPEG (APP2), PNG (iCCP) or WebP (ICCP).
/// Profiles with a malformed header are dropped.
pub fn extract_icc_profile(data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < 12 {
        return None;
    }

    let icc = if data.starts_with(&[0xFF, 0xD8]) {
        Jpeg::from_bytes(data.to_vec().into()).ok()?.icc_profile()?
    } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Png::from_bytes(data.to_vec().into()).ok()?.icc_profile()?
    } else if &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        WebP::from_bytes(data.to_vec().into()).ok()?.icc_profile()?
    } else {
        return None;
    };

    if validate_icc_profile(&icc) {
        Some(icc.to_vec())
    } else {
        debug!(target: "sizefit::io", len = icc.len(), "dropping malformed ICC profile");
        None
    }
}

/// Minimal ICC header check: 128-byte header, size field equal to the data
/// length, plausible major version, ASCII signatures.
pub(crate) fn validate_icc_profile(icc: &[u8]) -> bool {
    if icc.len() < 128 {
        return false;
    }

    let declared = u32::from_be_bytes([icc[0], icc[1], icc[2], icc[3]]) as usize;
    if declared != icc.len() {
        return false;
    }

    if icc[8] > 10 {
        return false;
    }

    let ascii = |range: std::ops::Range<usize>| {
        icc[range]
            .iter()
            .all(|&b| b == 0 || (32..=126).contains(&b))
    };
    // CMM type, profile class, data color space, PCS
    ascii(4..8) && ascii(12..16) && ascii(16..20) && ascii(20..24)
}

/// `{out_dir}/{input_stem}_out.{ext}`
pub fn output_path(input: &Path, out_dir: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    out_dir.join(format!("{stem}_out.{}", format.extension()))
}

/// Write `bytes` to `path`, creating missing parent directories.
pub fn write_output(path: &Path, bytes: &[u8]) -> EngineResult<()> {
    let shown = || path.to_string_lossy().into_owned();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SizeFitError::file_write_failed(shown(), e))?;
    }
    fs::write(path, bytes).map_err(|e| SizeFitError::file_write_failed(shown(), e))?;
    debug!(target: "sizefit::io", path = %path.display(), bytes = bytes.len(), "written");
    Ok(())
}
