// src/engine/common.rs
//
// Common utilities shared across engine modules.

use crate::error::SizeFitError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Engine-wide Result type. Always SizeFitError so codec failures keep their
/// category instead of collapsing into a generic error.
pub type EngineResult<T> = std::result::Result<T, SizeFitError>;

/// Run a codec call, converting a panic inside native code into
/// `SizeFitError::InternalPanic` tagged with `stage`.
pub(crate) fn run_with_panic_policy<T, F>(stage: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            tracing::error!(target: "sizefit::engine", %stage, %detail, "codec panicked");
            Err(SizeFitError::internal_panic(format!("{stage}: {detail}")))
        }
    }
}
