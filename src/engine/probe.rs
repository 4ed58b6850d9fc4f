// src/engine/probe.rs
//
// Size measurement. Kilobytes are 1024 bytes; nothing is rounded here.

/// Size of `bytes` in kilobytes, exactly `len / 1024`.
pub fn size_kb(bytes: &[u8]) -> f64 {
    bytes.len() as f64 / 1024.0
}

/// Round a kilobyte figure to 2 decimal places for display.
pub fn round_kb(kb: f64) -> f64 {
    (kb * 100.0).round() / 100.0
}

/// Whether a measured size fits in `target_kb`. The budget is inclusive.
pub fn fits(kb: f64, target_kb: u32) -> bool {
    kb <= f64::from(target_kb)
}
