use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qrscan::capture::PixelFormat;
use qrscan::decode::to_luma_into;

fn bench_luma(c: &mut Criterion) {
    let rgba: Vec<u8> = (0..1280 * 720 * 4).map(|i| (i % 251) as u8).collect();
    let rgb: Vec<u8> = (0..1280 * 720 * 3).map(|i| (i % 251) as u8).collect();
    let mut out = Vec::with_capacity(1280 * 720);

    c.bench_function("luma_rgba_720p", |b| {
        b.iter(|| to_luma_into(black_box(&rgba), PixelFormat::Rgba32, &mut out))
    });
    c.bench_function("luma_rgb_720p", |b| {
        b.iter(|| to_luma_into(black_box(&rgb), PixelFormat::Rgb24, &mut out))
    });
}

criterion_group!(benches, bench_luma);
criterion_main!(benches);
