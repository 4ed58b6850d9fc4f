#![no_main]

//! Fuzz target for container inspection: ICC extraction from JPEG, PNG and
//! WebP, and PNG palette detection.

use libfuzzer_sys::fuzz_target;
use sizefit::engine::{extract_icc_profile, png_palette_mode};

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let _ = extract_icc_profile(data);
    let _ = png_palette_mode(data);

    // Prefix magic bytes so the fuzzer reaches each container parser.
    let mut jpeg_data = vec![0xFF, 0xD8];
    jpeg_data.extend_from_slice(data);
    let _ = extract_icc_profile(&jpeg_data);

    let mut png_data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    png_data.extend_from_slice(data);
    let _ = extract_icc_profile(&png_data);
    let _ = png_palette_mode(&png_data);

    let mut webp_data = vec![
        0x52, 0x49, 0x46, 0x46, // RIFF
        0x00, 0x00, 0x00, 0x00, // size placeholder
        0x57, 0x45, 0x42, 0x50, // WEBP
    ];
    webp_data.extend_from_slice(data);
    let _ = extract_icc_profile(&webp_data);
});
