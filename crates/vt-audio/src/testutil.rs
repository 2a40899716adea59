//! Signal generators and WAV fixtures for tests.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sine of `freq` Hz, `secs` long, peak `amp`.
pub fn sine(freq: f32, sample_rate: u32, secs: f32, amp: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * secs) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * freq * t).sin() * amp
        })
        .collect()
}

/// Fundamental plus two decaying harmonics, closer to a sustained vowel.
pub fn vowel(freq: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * secs) as usize;
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32;
            0.4 * phase.sin() + 0.2 * (2.0 * phase).sin() + 0.1 * (3.0 * phase).sin()
        })
        .collect()
}

/// Seeded uniform noise in [-amp, amp].
pub fn noise(len: usize, amp: f32) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(12_345);
    (0..len).map(|_| rng.random_range(-amp..=amp)).collect()
}

/// Write 16-bit PCM mono WAV.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> hound::Result<()> {
    write_interleaved(path, samples, 1, sample_rate)
}

/// Write 16-bit PCM WAV from interleaved samples.
pub fn write_interleaved(path: &Path, samples: &[f32], channels: u16, sample_rate: u32) -> hound::Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
    }
    writer.finalize()
}
