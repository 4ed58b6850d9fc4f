// lib.rs
//
// sizefit: compress one raster image to a file-size budget while keeping as
// much quality as the budget allows.
//
// Design goals:
// - Highest integer quality that fits, found in O(log n) encodes
// - Transparency handled explicitly before lossy encoding
// - Budget misses reported as statuses, not errors

pub mod color;
pub mod engine;
pub mod error;
pub mod request;

pub use color::BackgroundColor;
pub use engine::{
    compress, compress_file, compress_with, load_image, CompressionReport, CompressionResult,
    CompressionStatus, SourceImage,
};
pub use error::{ErrorCategory, Result, SizeFitError};
pub use request::{CompressionRequest, CompressionRequestBuilder, OutputFormat, QualityBounds};
