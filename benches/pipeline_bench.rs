//! Benchmarks for the voiceover pipeline
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use sdkwork_voiceover::audio::DspChain;
use sdkwork_voiceover::config::{DspConfig, EqPreset};
use sdkwork_voiceover::subtitle::TimestampAligner;
use sdkwork_voiceover::text::{MarkupSegmenter, PronunciationDictionary};

/// Benchmark markup segmentation
fn bench_segmentation(c: &mut Criterion) {
    let segmenter = MarkupSegmenter::new(PronunciationDictionary::from_entries([
        ("SQL", "sequel"),
        ("NYC", "New York City"),
    ]));
    let texts = vec![
        "Hello world.",
        "Hello <break time=\"500ms\"/> <prosody rate=\"1.2\" pitch=\"2\">world</prosody>",
        "Welcome to NYC. <emphasis level=\"strong\">SQL</emphasis> is <breath/> everywhere. \
         <prosody volume=\"0.8\">Quietly now.</prosody> <break time=\"2s\"/> The end.",
    ];

    let mut group = c.benchmark_group("segmentation");
    for (i, text) in texts.iter().enumerate() {
        group.bench_with_input(BenchmarkId::new("segment", i), text, |b, text| {
            b.iter(|| segmenter.segment(black_box(*text), "en-US"))
        });
    }
    group.finish();
}

fn tone(seconds: f32) -> Vec<f32> {
    let n = (seconds * 44100.0) as usize;
    (0..n)
        .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 44100.0).sin() * 0.4)
        .collect()
}

/// Benchmark the full DSP chain over different buffer lengths
fn bench_dsp_chain(c: &mut Criterion) {
    let chain = DspChain::new(DspConfig {
        eq_preset: EqPreset::Narration,
        ..Default::default()
    });

    let mut group = c.benchmark_group("dsp_chain");
    group.measurement_time(Duration::from_secs(10));
    for seconds in [1.0f32, 5.0, 30.0] {
        let input = tone(seconds);
        group.bench_with_input(BenchmarkId::new("process", seconds as u32), &input, |b, input| {
            b.iter(|| chain.process(black_box(input.clone())))
        });
    }
    group.finish();
}

/// Benchmark word and phoneme alignment
fn bench_alignment(c: &mut Criterion) {
    let aligner = TimestampAligner::default();
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(50);

    let mut group = c.benchmark_group("alignment");
    group.bench_function("words", |b| {
        b.iter(|| aligner.align_duration(black_box(&text), 120.0, false))
    });
    group.bench_function("phonemes", |b| {
        b.iter(|| aligner.align_duration(black_box(&text), 120.0, true))
    });
    group.finish();
}

criterion_group!(benches, bench_segmentation, bench_dsp_chain, bench_alignment);
criterion_main!(benches);
