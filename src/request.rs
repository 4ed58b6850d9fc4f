// src/request.rs
//
// Compression request: the immutable, validated configuration handed to the
// engine. Cheap to build and clone; all expensive work happens in compress().

use crate::color::BackgroundColor;
use crate::error::{Result, SizeFitError};
use std::fmt;
use std::str::FromStr;

/// Default lower quality bound for searched formats.
pub const DEFAULT_Q_MIN: u8 = 25;
/// Default upper quality bound for searched formats.
pub const DEFAULT_Q_MAX: u8 = 95;
/// Highest quality accepted by every lossy encoder.
pub const MAX_QUALITY: u8 = 100;

/// Output format. A closed set: adding a format means touching every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Lossy 8-bit output (JPEG). Cannot carry transparency.
    Lossy8bit,
    /// Lossless bitmap output (PNG). Not quality-searched.
    LosslessBitmap,
    /// Hybrid lossy/lossless output (WebP). Keeps transparency.
    HybridLossyLossless,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [
        OutputFormat::Lossy8bit,
        OutputFormat::LosslessBitmap,
        OutputFormat::HybridLossyLossless,
    ];

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Lossy8bit => "jpg",
            Self::LosslessBitmap => "png",
            Self::HybridLossyLossless => "webp",
        }
    }

    pub fn supports_transparency(&self) -> bool {
        match self {
            Self::Lossy8bit => false,
            Self::LosslessBitmap | Self::HybridLossyLossless => true,
        }
    }

    /// Whether the encoder takes a quality parameter, i.e. whether the
    /// format goes through the quality search.
    pub fn uses_quality(&self) -> bool {
        match self {
            Self::Lossy8bit | Self::HybridLossyLossless => true,
            Self::LosslessBitmap => false,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = SizeFitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Lossy8bit),
            "png" => Ok(Self::LosslessBitmap),
            "webp" => Ok(Self::HybridLossyLossless),
            other => Err(SizeFitError::unsupported_format(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Inclusive quality range searched by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QualityBounds {
    pub min: u8,
    pub max: u8,
}

impl QualityBounds {
    pub fn new(min: u8, max: u8) -> Result<Self> {
        if max > MAX_QUALITY {
            return Err(SizeFitError::invalid_argument(
                "q_max",
                max.to_string(),
                format!("must be at most {MAX_QUALITY}"),
            ));
        }
        if min > max {
            return Err(SizeFitError::invalid_argument(
                "q_min",
                min.to_string(),
                format!("must be <= q_max ({max})"),
            ));
        }
        Ok(Self { min, max })
    }

    /// Number of quality levels in the range.
    pub fn levels(&self) -> u32 {
        u32::from(self.max - self.min) + 1
    }
}

impl Default for QualityBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_Q_MIN,
            max: DEFAULT_Q_MAX,
        }
    }
}

/// Validated compression configuration.
///
/// Build with [`CompressionRequest::builder`]; validation happens once in
/// `build()` so a bad budget or inverted bounds never reach the search.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionRequest {
    format: OutputFormat,
    target_kb: u32,
    bounds: QualityBounds,
    background: BackgroundColor,
    keep_icc: bool,
    parallel_probes: bool,
}

impl CompressionRequest {
    pub fn builder(format: OutputFormat, target_kb: u32) -> CompressionRequestBuilder {
        CompressionRequestBuilder {
            format,
            target_kb,
            q_min: DEFAULT_Q_MIN,
            q_max: DEFAULT_Q_MAX,
            background: BackgroundColor::default(),
            keep_icc: false,
            parallel_probes: false,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn target_kb(&self) -> u32 {
        self.target_kb
    }

    pub fn bounds(&self) -> QualityBounds {
        self.bounds
    }

    pub fn background(&self) -> BackgroundColor {
        self.background
    }

    /// Embed the source ICC profile in the output.
    pub fn keep_icc(&self) -> bool {
        self.keep_icc
    }

    /// Run the q_max and q_min probes concurrently.
    pub fn parallel_probes(&self) -> bool {
        self.parallel_probes
    }
}

#[derive(Debug, Clone)]
pub struct CompressionRequestBuilder {
    format: OutputFormat,
    target_kb: u32,
    q_min: u8,
    q_max: u8,
    background: BackgroundColor,
    keep_icc: bool,
    parallel_probes: bool,
}

impl CompressionRequestBuilder {
    pub fn quality_bounds(mut self, q_min: u8, q_max: u8) -> Self {
        self.q_min = q_min;
        self.q_max = q_max;
        self
    }

    pub fn background(mut self, background: BackgroundColor) -> Self {
        self.background = background;
        self
    }

    pub fn keep_icc(mut self, keep: bool) -> Self {
        self.keep_icc = keep;
        self
    }

    pub fn parallel_probes(mut self, parallel: bool) -> Self {
        self.parallel_probes = parallel;
        self
    }

    pub fn build(self) -> Result<CompressionRequest> {
        if self.target_kb == 0 {
            return Err(SizeFitError::invalid_argument(
                "target_kb",
                "0",
                "must be a positive number of kilobytes",
            ));
        }
        let bounds = QualityBounds::new(self.q_min, self.q_max)?;
        Ok(CompressionRequest {
            format: self.format,
            target_kb: self.target_kb,
            bounds,
            background: self.background,
            keep_icc: self.keep_icc,
            parallel_probes: self.parallel_probes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_accepts_aliases() {
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Lossy8bit);
        assert_eq!("JPEG".parse::<OutputFormat>().unwrap(), OutputFormat::Lossy8bit);
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::LosslessBitmap);
        assert_eq!(
            "WebP".parse::<OutputFormat>().unwrap(),
            OutputFormat::HybridLossyLossless
        );
    }

    #[test]
    fn format_parsing_rejects_unknown() {
        let err = "gif".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, SizeFitError::UnsupportedFormat { .. }));
    }

    #[test]
    fn format_capabilities() {
        assert!(!OutputFormat::Lossy8bit.supports_transparency());
        assert!(OutputFormat::LosslessBitmap.supports_transparency());
        assert!(OutputFormat::HybridLossyLossless.supports_transparency());
        assert!(!OutputFormat::LosslessBitmap.uses_quality());
        for format in OutputFormat::ALL {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
        }
    }

    #[test]
    fn builder_defaults() {
        let req = CompressionRequest::builder(OutputFormat::Lossy8bit, 200)
            .build()
            .unwrap();
        assert_eq!(req.bounds(), QualityBounds { min: 25, max: 95 });
        assert_eq!(req.background(), BackgroundColor::WHITE);
        assert!(!req.keep_icc());
        assert!(!req.parallel_probes());
    }

    #[test]
    fn builder_rejects_zero_budget() {
        let err = CompressionRequest::builder(OutputFormat::Lossy8bit, 0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SizeFitError::InvalidArgument { .. }));
    }

    #[test]
    fn builder_rejects_inverted_bounds() {
        let err = CompressionRequest::builder(OutputFormat::HybridLossyLossless, 10)
            .quality_bounds(90, 30)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("q_min"));
    }

    #[test]
    fn builder_rejects_quality_above_100() {
        let err = CompressionRequest::builder(OutputFormat::Lossy8bit, 10)
            .quality_bounds(50, 101)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("q_max"));
    }

    #[test]
    fn equal_bounds_are_allowed() {
        let req = CompressionRequest::builder(OutputFormat::Lossy8bit, 10)
            .quality_bounds(60, 60)
            .build()
            .unwrap();
        assert_eq!(req.bounds().levels(), 1);
    }
}
