use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, RgbImage};
use sizefit::engine::{compress, normalize, CodecEncoder, Encoder, SourceImage};
use sizefit::{BackgroundColor, CompressionRequest, OutputFormat};
use std::hint::black_box;

fn gradient(width: u32, height: u32) -> SourceImage {
    SourceImage::new(DynamicImage::ImageRgb8(RgbImage::from_fn(
        width,
        height,
        |x, y| {
            let t = ((x * 31) ^ (y * 17)) % 48;
            image::Rgb([
                ((x * 255) / width) as u8,
                ((y * 255) / height) as u8,
                (128 + t) as u8,
            ])
        },
    )))
}

fn bench_single_encode(c: &mut Criterion) {
    let image = gradient(512, 512);
    let encoder = CodecEncoder::new();
    let mut group = c.benchmark_group("encode_512");
    for format in OutputFormat::ALL {
        let quality = format.uses_quality().then_some(80);
        group.bench_with_input(BenchmarkId::from_parameter(format), &format, |b, &format| {
            b.iter(|| encoder.encode(black_box(&image), format, quality).unwrap())
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let image = gradient(512, 512);
    let mut group = c.benchmark_group("search_512");
    group.sample_size(10);
    for format in [OutputFormat::Lossy8bit, OutputFormat::HybridLossyLossless] {
        for parallel in [false, true] {
            let request = CompressionRequest::builder(format, 20)
                .parallel_probes(parallel)
                .build()
                .unwrap();
            let id = format!("{format}/parallel={parallel}");
            group.bench_function(id, |b| {
                b.iter(|| compress(black_box(&image), &request).unwrap())
            });
        }
    }
    group.finish();
}

fn bench_flatten(c: &mut Criterion) {
    let rgba = DynamicImage::ImageRgba8(gradient(1024, 1024).pixels().to_rgba8());
    let image = SourceImage::new(rgba);
    c.bench_function("normalize_rgba_1024", |b| {
        b.iter(|| normalize(black_box(&image), OutputFormat::Lossy8bit, BackgroundColor::WHITE))
    });
}

criterion_group!(benches, bench_single_encode, bench_search, bench_flatten);
criterion_main!(benches);
