// src/engine.rs
//
// The core of sizefit. Given a decoded image and a byte budget:
// 1. Normalize the pixels for the target format
// 2. Search encoder quality for the largest output that still fits
// 3. Report what was chosen and why
//
// This file is a facade over the modules in engine/.

use crate::error::Result;
use crate::request::CompressionRequest;
use std::path::{Path, PathBuf};

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod common;
mod decoder;
mod encoder;
mod io;
mod normalize;
mod policy;
mod probe;
mod search;
mod source;

pub use common::EngineResult;
pub use decoder::{check_dimensions, decode_image, detect_format, ensure_dimensions_safe};
pub use encoder::{
    embed_icc_jpeg, embed_icc_png, embed_icc_webp, encode_jpeg, encode_png, encode_webp,
    CodecEncoder, Encoder, QualitySettings,
};
pub use io::{
    decode_source, extract_icc_profile, load_image, output_path, png_palette_mode, write_output,
};
pub use normalize::{flatten_alpha, normalize};
pub use policy::{
    compress, compress_with, CompressionReport, CompressionResult, CompressionStatus,
    LOSSLESS_NOTE,
};
pub use probe::{fits, round_kb, size_kb};
pub use search::{max_encodes, max_iterations, search, QualitySearch, SearchOutcome};
pub use source::{ColorMode, SourceImage};

/// Load `input`, compress it per `request` and write
/// `{out_dir}/{stem}_out.{ext}`. Returns the written path and the result.
pub fn compress_file(
    input: &Path,
    out_dir: &Path,
    request: &CompressionRequest,
) -> Result<(PathBuf, CompressionResult)> {
    let image = load_image(input)?;
    let result = compress(&image, request)?;
    let path = output_path(input, out_dir, request.format());
    write_output(&path, &result.bytes)?;
    Ok((path, result))
}
