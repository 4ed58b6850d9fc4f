// src/engine/policy.rs
//
// Compression policy: route a request to the quality search (JPEG, WebP) or
// to a single lossless encode (PNG), and package the result with its
// diagnostic metadata. Owns no state.

use crate::engine::common::EngineResult;
use crate::engine::encoder::{CodecEncoder, Encoder};
use crate::engine::normalize::normalize;
use crate::engine::probe::{fits, round_kb, size_kb};
use crate::engine::search::QualitySearch;
use crate::engine::source::SourceImage;
use crate::request::{CompressionRequest, OutputFormat, QualityBounds};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Note attached to lossless results.
pub const LOSSLESS_NOTE: &str = "lossless output; only lossless optimization applied";

/// Outcome tag. Budget misses are statuses, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionStatus {
    /// Best quality found and it fits the budget
    Ok,
    /// q_max already fits; nothing lower was tried
    #[serde(rename = "already_ok_at_qmax")]
    AlreadyOkAtMax,
    /// Even q_min exceeds the budget; the q_min output is returned
    NoSolutionWithinBounds,
    /// Lossless output exceeds the budget
    OverTarget,
}

impl CompressionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::AlreadyOkAtMax => "already_ok_at_qmax",
            Self::NoSolutionWithinBounds => "no_solution_within_bounds",
            Self::OverTarget => "over_target",
        }
    }

    pub fn meets_budget(&self) -> bool {
        match self {
            Self::Ok | Self::AlreadyOkAtMax => true,
            Self::NoSolutionWithinBounds | Self::OverTarget => false,
        }
    }
}

impl fmt::Display for CompressionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded output plus everything needed to explain it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub bytes: Vec<u8>,
    pub status: CompressionStatus,
    pub format: OutputFormat,
    /// Chosen quality; `None` for the lossless bitmap
    pub quality: Option<u8>,
    pub iterations: u32,
    /// Exact measured size of `bytes` in KB (unrounded)
    pub final_kb: f64,
    pub width: u32,
    pub height: u32,
    pub target_kb: u32,
    pub bounds: QualityBounds,
    pub note: Option<&'static str>,
}

impl CompressionResult {
    /// Metadata view for printing or JSON output. Sizes rounded to 2 dp.
    pub fn report(&self) -> CompressionReport {
        CompressionReport {
            status: self.status,
            out_fmt: self.format.extension(),
            quality: self.quality,
            iterations: self.iterations,
            width: self.width,
            height: self.height,
            final_kb: round_kb(self.final_kb),
            target_kb: self.target_kb,
            q_min: self.bounds.min,
            q_max: self.bounds.max,
            note: self.note,
        }
    }
}

impl fmt::Display for CompressionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status={} format={} quality={} iterations={} size={}x{} final_kb={:.2} target_kb={} bounds={}..={}",
            self.status,
            self.format,
            self.quality
                .map_or_else(|| "-".to_string(), |q| q.to_string()),
            self.iterations,
            self.width,
            self.height,
            self.final_kb,
            self.target_kb,
            self.bounds.min,
            self.bounds.max,
        )?;
        if let Some(note) = self.note {
            write!(f, " note=\"{note}\"")?;
        }
        Ok(())
    }
}

/// Serializable metadata of a [`CompressionResult`] (no pixel data).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionReport {
    pub status: CompressionStatus,
    pub out_fmt: &'static str,
    pub quality: Option<u8>,
    pub iterations: u32,
    pub width: u32,
    pub height: u32,
    pub final_kb: f64,
    pub target_kb: u32,
    pub q_min: u8,
    pub q_max: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// Normalize `image` for the requested format and compress it with the real
/// codecs.
pub fn compress(image: &SourceImage, request: &CompressionRequest) -> EngineResult<CompressionResult> {
    let encoder = CodecEncoder::with_icc(request.keep_icc());
    let prepared = normalize(image, request.format(), request.background());
    compress_with(&encoder, &prepared, request)
}

/// Compress an already-normalized image with any encoder.
pub fn compress_with<E>(
    encoder: &E,
    image: &SourceImage,
    request: &CompressionRequest,
) -> EngineResult<CompressionResult>
where
    E: Encoder + Sync + ?Sized,
{
    let format = request.format();
    let (width, height) = image.dimensions();

    let result = match format {
        OutputFormat::Lossy8bit | OutputFormat::HybridLossyLossless => {
            let outcome = QualitySearch::new(encoder)
                .parallel_probes(request.parallel_probes())
                .run(image, format, request.target_kb(), request.bounds())?;
            CompressionResult {
                final_kb: size_kb(&outcome.bytes),
                bytes: outcome.bytes,
                status: outcome.status,
                format,
                quality: Some(outcome.quality),
                iterations: outcome.iterations,
                width,
                height,
                target_kb: request.target_kb(),
                bounds: request.bounds(),
                note: None,
            }
        }
        OutputFormat::LosslessBitmap => {
            let bytes = encoder.encode(image, format, None)?;
            let final_kb = size_kb(&bytes);
            let status = if fits(final_kb, request.target_kb()) {
                CompressionStatus::Ok
            } else {
                CompressionStatus::OverTarget
            };
            CompressionResult {
                bytes,
                status,
                format,
                quality: None,
                iterations: 0,
                final_kb,
                width,
                height,
                target_kb: request.target_kb(),
                bounds: request.bounds(),
                note: Some(LOSSLESS_NOTE),
            }
        }
    };

    info!(
        target: "sizefit::policy",
        status = %result.status,
        %format,
        quality = ?result.quality,
        iterations = result.iterations,
        final_kb = result.final_kb,
        target_kb = result.target_kb,
        "compressed"
    );
    Ok(result)
}
