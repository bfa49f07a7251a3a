//! Decode Path Benchmarks
//!
//! One second of LTC through the decoder at several sample and frame rates.
//!
//! Run with: `cargo bench --bench decode`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ltc_sync::codec::{FrameEncoder, LtcDecoder};
use ltc_sync::config::DecoderConfig;
use ltc_sync::{FrameRate, Timecode};

fn one_second(sample_rate: u32, frame_rate: FrameRate) -> Vec<f32> {
    let start = Timecode::zero(frame_rate);
    FrameEncoder::new(sample_rate, frame_rate).encode_sequence(start, frame_rate.nominal_fps() as usize)
}

fn bench_decode_second(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_one_second");

    let cases = [
        (48000, FrameRate::Fps30, "48k_30fps"),
        (44100, FrameRate::Fps25, "44k1_25fps"),
        (96000, FrameRate::Fps24, "96k_24fps"),
    ];

    for (sample_rate, frame_rate, name) in cases {
        let samples = one_second(sample_rate, frame_rate);
        let config = DecoderConfig {
            frame_rate,
            ..Default::default()
        };

        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &samples, |bench, samples| {
            bench.iter(|| {
                let mut decoder = LtcDecoder::new(sample_rate, &config);
                black_box(decoder.decode(black_box(samples)));
            });
        });
    }

    group.finish();
}

fn bench_decode_segments(c: &mut Criterion) {
    let samples = one_second(48000, FrameRate::Fps30);
    let config = DecoderConfig::default();

    c.bench_function("decode_480_sample_segments", |bench| {
        bench.iter(|| {
            let mut decoder = LtcDecoder::new(48000, &config);
            for chunk in samples.chunks(480) {
                black_box(decoder.decode(black_box(chunk)));
            }
        });
    });
}

criterion_group!(benches, bench_decode_second, bench_decode_segments);
criterion_main!(benches);
