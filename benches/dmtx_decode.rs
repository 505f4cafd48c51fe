use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_dmtx::decoder::encodation::decode_data_words;
use rust_dmtx::decoder::reed_solomon::{correct_symbol, encode_symbol};
use rust_dmtx::{DecodeOptions, SymbolSize, decode_all, decode_luma};

#[path = "../tests/common/mod.rs"]
mod common;

use common::{Layout, ascii_codewords, render_single};

fn bench_decode_12x12(c: &mut Criterion) {
    let size = SymbolSize::from_dimensions(12, 12).unwrap();
    let canvas = render_single(size, &ascii_codewords("A1", size.data_words), &Layout::default());
    c.bench_function("decode_12x12_luma", |b| {
        b.iter(|| decode_luma(black_box(&canvas.pixels), canvas.width, canvas.height))
    });
}

fn bench_decode_rotated_32x32(c: &mut Criterion) {
    let size = SymbolSize::from_dimensions(32, 32).unwrap();
    let layout = Layout {
        module_px: 5,
        angle_deg: 30.0,
        ..Layout::default()
    };
    let canvas = render_single(size, &ascii_codewords("Rotated benchmark payload 2024", size.data_words), &layout);
    c.bench_function("decode_32x32_rotated_luma", |b| {
        b.iter(|| decode_luma(black_box(&canvas.pixels), canvas.width, canvas.height))
    });
}

fn bench_empty_scan(c: &mut Criterion) {
    let image = vec![128u8; 640 * 480];
    let opts = DecodeOptions::default();
    c.bench_function("scan_640x480_uniform", |b| {
        b.iter(|| decode_all(black_box(&image), 640, 480, 1, &opts))
    });
}

fn bench_reed_solomon_144(c: &mut Criterion) {
    let size = SymbolSize::from_dimensions(144, 144).unwrap();
    let data: Vec<u8> = (0..size.data_words).map(|i| (i * 7 + 3) as u8).collect();
    let mut damaged = encode_symbol(size, &data);
    for i in (0..damaged.len()).step_by(31) {
        damaged[i] ^= 0x5a;
    }
    c.bench_function("correct_symbol_144x144", |b| {
        b.iter(|| {
            let mut words = damaged.clone();
            correct_symbol(size, black_box(&mut words))
        })
    });
}

fn bench_encodation(c: &mut Criterion) {
    let size = SymbolSize::from_dimensions(64, 64).unwrap();
    let words = ascii_codewords(&"0123456789ABCDEF".repeat(12), size.data_words);
    c.bench_function("decode_data_words_64x64", |b| {
        b.iter(|| decode_data_words(black_box(&words), None))
    });
}

criterion_group!(
    benches,
    bench_decode_12x12,
    bench_decode_rotated_32x32,
    bench_empty_scan,
    bench_reed_solomon_144,
    bench_encodation
);
criterion_main!(benches);
