use std::hint::black_box;

use cast_lib::codec::FallbackCodec;
use cast_lib::{compress_block, CompressOptions};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

/// Generates deterministic pseudo-random text lines using a Linear
/// Congruential Generator, so the "Random" scenario is reproducible across
/// runs without pulling in a dependency purely for benchmark fixtures.
fn generate_random_lines(target_size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(target_size);
    let mut seed: u64 = 0xDEAD_BEEF;
    while out.len() < target_size {
        let mut line = String::from("evt=");
        for _ in 0..8 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223) & 0xFFFF_FFFF;
            line.push(char::from(b'a' + (seed >> 24) as u8 % 26));
        }
        line.push('\n');
        out.extend_from_slice(line.as_bytes());
    }
    out.truncate(target_size);
    out
}

/// Generates a templated access-log-shaped scenario: a handful of distinct
/// skeletons repeated with varying columnar values, representative of the
/// structured text this engine is built for.
fn generate_templated_log(target_size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(target_size);
    let mut i: u64 = 0;
    while out.len() < target_size {
        let line = match i % 3 {
            0 => format!("GET /users/{i} 200 {}ms\n", i % 50),
            1 => format!("POST /orders/{i} 201 {}ms\n", i % 80),
            _ => format!("GET /health 200 {}ms\n", i % 5),
        };
        out.extend_from_slice(line.as_bytes());
        i += 1;
    }
    out.truncate(target_size);
    out
}

/// Generates a block of repeated, fully literal lines (no masked
/// variables), the cheapest possible shape for the templating engine.
fn generate_repetitive_literal(target_size: usize) -> Vec<u8> {
    let line = b"----- log rotation boundary -----\n";
    let mut out = Vec::with_capacity(target_size);
    while out.len() < target_size {
        out.extend_from_slice(line);
    }
    out.truncate(target_size);
    out
}

/// Benchmarks `compress_block` across the three scenarios above using the
/// in-process LZMA2 codec (no external helper, for determinism across
/// machines that may not have `7z` installed).
fn bench_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("CAST Compression");
    let size = 256 * 1024;
    let codec = FallbackCodec::in_process_only();
    let options = CompressOptions::default();

    let scenarios = [
        ("Templated", generate_templated_log(size)),
        ("RepetitiveLiteral", generate_repetitive_literal(size)),
        ("Random", generate_random_lines(size)),
    ];

    for (name, input_data) in &scenarios {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{name} 256KB"), |b| {
            b.iter(|| {
                compress_block(black_box(input_data), &codec, &options).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmarks `decompress_block` for the same scenarios; throughput is
/// reported against the *uncompressed* size, matching the compression
/// benchmark's convention.
fn bench_decompression(c: &mut Criterion) {
    let mut group = c.benchmark_group("CAST Decompression");
    let size = 256 * 1024;
    let codec = FallbackCodec::in_process_only();
    let options = CompressOptions::default();

    let scenarios = [
        ("Templated", generate_templated_log(size)),
        ("RepetitiveLiteral", generate_repetitive_literal(size)),
        ("Random", generate_random_lines(size)),
    ];

    for (name, source_data) in &scenarios {
        let frame = compress_block(source_data, &codec, &options).unwrap().into_frame();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{name} 256KB"), |b| {
            b.iter(|| {
                cast_lib::decompress_block(black_box(&frame), &codec).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compression, bench_decompression);
criterion_main!(benches);
