use image::{DynamicImage, RgbImage, RgbaImage};
use proptest::prelude::*;
use sizefit::engine::{
    flatten_alpha, max_encodes, max_iterations, normalize, search, size_kb, ColorMode, Encoder,
    EngineResult, SourceImage,
};
use sizefit::{BackgroundColor, CompressionStatus, OutputFormat, QualityBounds};
use std::sync::Mutex;

/// Encoder with a monotone size curve: size(q) = base + q * step bytes.
struct LinearCurve {
    base: usize,
    step: usize,
    calls: Mutex<Vec<u8>>,
}

impl LinearCurve {
    fn new(base: usize, step: usize) -> Self {
        Self {
            base,
            step,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn size(&self, q: u8) -> usize {
        self.base + usize::from(q) * self.step
    }
}

impl Encoder for LinearCurve {
    fn encode(
        &self,
        _image: &SourceImage,
        _format: OutputFormat,
        quality: Option<u8>,
    ) -> EngineResult<Vec<u8>> {
        let q = quality.unwrap_or(0);
        self.calls.lock().unwrap().push(q);
        Ok(vec![0; self.size(q)])
    }
}

fn tiny_image() -> SourceImage {
    SourceImage::new(DynamicImage::ImageRgb8(RgbImage::new(2, 2)))
}

fn bounds_strategy() -> impl Strategy<Value = QualityBounds> {
    (0u8..=100)
        .prop_flat_map(|min| (Just(min), min..=100))
        .prop_map(|(min, max)| QualityBounds::new(min, max).unwrap())
}

fn rgba_image_strategy() -> impl Strategy<Value = RgbaImage> {
    (1u32..=8, 1u32..=8).prop_flat_map(|(w, h)| {
        proptest::collection::vec(any::<u8>(), (w * h * 4) as usize)
            .prop_map(move |raw| RgbaImage::from_raw(w, h, raw).unwrap())
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn search_returns_highest_fitting_quality(
        bounds in bounds_strategy(),
        base in 0usize..4096,
        step in 1usize..2048,
        target_kb in 1u32..300,
    ) {
        let enc = LinearCurve::new(base, step);
        let out = search(&enc, &tiny_image(), OutputFormat::Lossy8bit, target_kb, bounds).unwrap();
        let target = f64::from(target_kb);
        let fits = |q: u8| enc.size(q) as f64 / 1024.0 <= target;

        prop_assert!(out.iterations <= max_iterations(bounds));
        let encodes = enc.calls.lock().unwrap().len();
        prop_assert!(encodes <= out.iterations as usize);
        prop_assert!(encodes as u32 <= max_encodes(bounds));
        prop_assert_eq!(size_kb(&out.bytes), enc.size(out.quality) as f64 / 1024.0);

        match out.status {
            CompressionStatus::AlreadyOkAtMax => {
                prop_assert_eq!(out.quality, bounds.max);
                prop_assert!(fits(bounds.max));
            }
            CompressionStatus::NoSolutionWithinBounds => {
                prop_assert_eq!(out.quality, bounds.min);
                prop_assert!(!fits(bounds.min));
            }
            CompressionStatus::Ok => {
                prop_assert!(fits(out.quality));
                prop_assert!(out.quality < bounds.max);
                prop_assert!(!fits(out.quality + 1));
            }
            CompressionStatus::OverTarget => prop_assert!(false, "search never reports over_target"),
        }
    }

    #[test]
    fn search_never_repeats_a_level(
        bounds in bounds_strategy(),
        target_kb in 1u32..120,
    ) {
        let enc = LinearCurve::new(0, 1024);
        search(&enc, &tiny_image(), OutputFormat::HybridLossyLossless, target_kb, bounds).unwrap();
        let mut calls = enc.calls.lock().unwrap().clone();
        let total = calls.len();
        calls.sort_unstable();
        calls.dedup();
        prop_assert_eq!(calls.len(), total);
        prop_assert!(calls.iter().all(|q| (bounds.min..=bounds.max).contains(q)));
    }

    #[test]
    fn flattening_is_opaque_and_sized(img in rgba_image_strategy(), r: u8, g: u8, b: u8) {
        let bg = BackgroundColor::new(r, g, b);
        let source = SourceImage::new(DynamicImage::ImageRgba8(img.clone()));
        let out = normalize(&source, OutputFormat::Lossy8bit, bg);

        prop_assert_eq!(out.mode(), ColorMode::Rgb);
        prop_assert!(!out.has_alpha());
        prop_assert_eq!(out.dimensions(), img.dimensions());
    }

    #[test]
    fn flattening_matches_blend_formula(img in rgba_image_strategy(), r: u8, g: u8, b: u8) {
        let bg = [r, g, b];
        let flat = flatten_alpha(&DynamicImage::ImageRgba8(img.clone()), BackgroundColor::new(r, g, b));

        for (src, dst) in img.pixels().zip(flat.pixels()) {
            let a = f64::from(src.0[3]) / 255.0;
            for c in 0..3 {
                let expected = f64::from(src.0[c]) * a + f64::from(bg[c]) * (1.0 - a);
                prop_assert!((f64::from(dst.0[c]) - expected).abs() <= 0.5 + 1e-9);
            }
            if src.0[3] == 255 {
                prop_assert_eq!(&dst.0[..], &src.0[..3]);
            }
            if src.0[3] == 0 {
                prop_assert_eq!(dst.0, bg);
            }
        }
    }

    #[test]
    fn transparency_capable_formats_are_untouched(img in rgba_image_strategy()) {
        let source = SourceImage::new(DynamicImage::ImageRgba8(img));
        for format in [OutputFormat::LosslessBitmap, OutputFormat::HybridLossyLossless] {
            let out = normalize(&source, format, BackgroundColor::BLACK);
            prop_assert_eq!(&out, &source);
        }
    }
}
