#![no_main]

//! Fuzz target for normalization plus the quality search over real codecs.
//! Arbitrary pixels, alpha, background and bounds must never panic, and any
//! result must honor the size bookkeeping.

use arbitrary::{Arbitrary, Unstructured};
use image::{DynamicImage, RgbaImage};
use libfuzzer_sys::fuzz_target;
use sizefit::engine::{compress, max_iterations, size_kb, SourceImage};
use sizefit::{BackgroundColor, CompressionRequest, OutputFormat};

#[derive(Arbitrary, Debug)]
struct Seed {
    format: u8,
    width: u8,
    height: u8,
    target_kb: u8,
    q_min: u8,
    q_max: u8,
    bg: [u8; 3],
}

fn build_image(data: &[u8], width: u8, height: u8) -> DynamicImage {
    // Keep images small so every search finishes quickly (max 64x64 RGBA)
    let w = (u32::from(width) % 64).max(1);
    let h = (u32::from(height) % 64).max(1);
    let len = (w * h * 4) as usize;

    let buffer: Vec<u8> = (0..len)
        .map(|i| data.get(i % data.len().max(1)).copied().unwrap_or(128))
        .collect();
    let rgba = RgbaImage::from_raw(w, h, buffer)
        .unwrap_or_else(|| RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255])));
    DynamicImage::ImageRgba8(rgba)
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let seed = match Seed::arbitrary(&mut unstructured) {
        Ok(s) => s,
        Err(_) => return,
    };

    let format = OutputFormat::ALL[usize::from(seed.format) % OutputFormat::ALL.len()];
    let (lo, hi) = (seed.q_min % 101, seed.q_max % 101);
    let request = match CompressionRequest::builder(format, u32::from(seed.target_kb).max(1))
        .quality_bounds(lo.min(hi), lo.max(hi))
        .background(BackgroundColor::new(seed.bg[0], seed.bg[1], seed.bg[2]))
        .build()
    {
        Ok(r) => r,
        Err(_) => return,
    };

    let image = SourceImage::new(build_image(data, seed.width, seed.height));
    if let Ok(result) = compress(&image, &request) {
        assert_eq!(result.final_kb, size_kb(&result.bytes));
        assert!(result.iterations <= max_iterations(request.bounds()));
    }
});
