use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use vt_audio::analyzer::VoiceAnalyzer;
use vt_audio::pitch::track_pitch;
use vt_core::config::AnalysisConfig;

/// 2 s sustained vowel at 44.1 kHz with a slow vibrato.
fn vowel() -> Vec<f32> {
    let sr = 44_100.0f32;
    let mut phase = 0.0f32;
    (0..88_200)
        .map(|i| {
            let t = i as f32 / sr;
            let f0 = 140.0 + 3.0 * (2.0 * std::f32::consts::PI * 5.0 * t).sin();
            phase += 2.0 * std::f32::consts::PI * f0 / sr;
            0.4 * phase.sin() + 0.2 * (2.0 * phase).sin() + 0.1 * (3.0 * phase).sin()
        })
        .collect()
}

fn bench_analyzer(c: &mut Criterion) {
    let samples = vowel();
    let analyzer = VoiceAnalyzer::default();
    let config = AnalysisConfig::default();

    c.bench_function("track_pitch_2s", |b| {
        b.iter(|| track_pitch(black_box(&samples), 44_100, &config));
    });
    c.bench_function("analyze_samples_2s", |b| {
        b.iter(|| analyzer.analyze_samples("bench", black_box(&samples), 44_100));
    });
}

criterion_group!(benches, bench_analyzer);
criterion_main!(benches);
