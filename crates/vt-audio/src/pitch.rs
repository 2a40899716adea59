use vt_core::config::AnalysisConfig;

use crate::autocorr::Autocorrelator;

/// Cost per octave below the ceiling, favours the shortest lag among near-equal peaks.
const OCTAVE_COST: f64 = 0.01;

/// Analysis result for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchFrame {
    /// First sample of the frame.
    pub start: usize,
    /// F0 in Hz, `None` for unvoiced/silent frames.
    pub f0_hz: Option<f64>,
    /// Height of the chosen autocorrelation peak, [0, 1).
    pub strength: f64,
}

/// Frame-wise pitch contour of a signal.
#[derive(Clone, Debug, Default)]
pub struct PitchTrack {
    pub frames: Vec<PitchFrame>,
    /// Samples per frame.
    pub window_len: usize,
    /// Samples between frame starts.
    pub hop: usize,
    pub sample_rate: u32,
}

/// Summary statistics over voiced frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchStats {
    pub mean_hz: f64,
    /// Population standard deviation.
    pub std_hz: f64,
    pub min_hz: f64,
    pub max_hz: f64,
}

impl PitchStats {
    #[must_use]
    pub fn range_hz(&self) -> f64 {
        self.max_hz - self.min_hz
    }
}

impl PitchTrack {
    /// F0 of every voiced frame, in order.
    #[must_use]
    pub fn voiced_f0(&self) -> Vec<f64> {
        self.frames.iter().filter_map(|f| f.f0_hz).collect()
    }

    /// Mean, spread, and extremes of the voiced F0 values, `None` when no
    /// frame is voiced.
    #[must_use]
    pub fn stats(&self) -> Option<PitchStats> {
        let f0 = self.voiced_f0();
        if f0.is_empty() {
            return None;
        }
        let n = f0.len() as f64;
        let mean = f0.iter().sum::<f64>() / n;
        let variance = f0.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let min = f0.iter().copied().fold(f64::INFINITY, f64::min);
        let max = f0.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(PitchStats {
            mean_hz: mean,
            std_hz: variance.sqrt(),
            min_hz: min,
            max_hz: max,
        })
    }

    /// Runs of consecutive voiced frames.
    #[must_use]
    pub fn voiced_runs(&self) -> Vec<&[PitchFrame]> {
        self.frames
            .split(|f| f.f0_hz.is_none())
            .filter(|run| !run.is_empty())
            .collect()
    }
}

/// Track F0 with short-term normalized autocorrelation.
///
/// The window spans three periods of `pitch_floor_hz`. A frame is voiced when
/// its RMS reaches `silence_threshold` × the global peak and the best
/// autocorrelation peak in the floor..ceiling lag range reaches
/// `voicing_threshold`.
///
/// # Example
/// ```
/// use vt_audio::pitch::track_pitch;
/// use vt_core::config::AnalysisConfig;
///
/// let sr = 44_100;
/// let samples: Vec<f32> = (0..sr)
///     .map(|i| (2.0 * std::f32::consts::PI * 150.0 * i as f32 / sr as f32).sin() * 0.5)
///     .collect();
/// let track = track_pitch(&samples, sr as u32, &AnalysisConfig::default());
/// let stats = track.stats().unwrap();
/// assert!((stats.mean_hz - 150.0).abs() < 2.0);
/// ```
#[must_use]
pub fn track_pitch(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> PitchTrack {
    let sr = f64::from(sample_rate);
    let window_len = (3.0 / config.pitch_floor_hz * sr).round() as usize;
    let hop = ((config.time_step_secs * sr).round() as usize).max(1);

    let mut track = PitchTrack {
        frames: Vec::new(),
        window_len,
        hop,
        sample_rate,
    };
    if sample_rate == 0 || window_len < 4 || samples.len() < window_len {
        return track;
    }

    let global_peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if global_peak <= f32::EPSILON {
        track.frames = (0..=(samples.len() - window_len) / hop)
            .map(|i| PitchFrame {
                start: i * hop,
                f0_hz: None,
                strength: 0.0,
            })
            .collect();
        return track;
    }
    let silence_rms = f64::from(global_peak) * config.silence_threshold;

    let mut ac = Autocorrelator::new(window_len);
    let min_lag = ((sr / config.pitch_ceiling_hz).floor() as usize).max(2);
    let max_lag = ((sr / config.pitch_floor_hz).ceil() as usize).min(ac.max_lag().saturating_sub(2));

    let mut start = 0;
    while start + window_len <= samples.len() {
        let frame = &samples[start..start + window_len];
        let rms = (frame.iter().map(|s| f64::from(*s).powi(2)).sum::<f64>() / window_len as f64).sqrt();

        let mut result = PitchFrame {
            start,
            f0_hz: None,
            strength: 0.0,
        };
        if rms >= silence_rms && min_lag < max_lag {
            let r = ac.process(frame);
            if let Some((lag, strength)) = best_peak(r, min_lag, max_lag, config.pitch_floor_hz, sr) {
                result.strength = strength;
                if strength >= config.voicing_threshold {
                    result.f0_hz = Some(sr / lag);
                }
            }
        }
        track.frames.push(result);
        start += hop;
    }

    log::debug!(
        "pitch: {} frames, {} voiced",
        track.frames.len(),
        track.frames.iter().filter(|f| f.f0_hz.is_some()).count()
    );
    track
}

/// Best local maximum of `r` in `min_lag..=max_lag`, refined by parabolic
/// interpolation. Returns `(lag, strength)`, strength clamped below 1.
fn best_peak(r: &[f32], min_lag: usize, max_lag: usize, floor_hz: f64, sr: f64) -> Option<(f64, f64)> {
    let mut best: Option<(f64, f64, f64)> = None;
    for lag in min_lag.max(1)..=max_lag.min(r.len().saturating_sub(2)) {
        let (prev, cur, next) = (f64::from(r[lag - 1]), f64::from(r[lag]), f64::from(r[lag + 1]));
        if !(cur > prev && cur >= next) || cur <= 0.0 {
            continue;
        }
        let (offset, height) = parabolic(prev, cur, next);
        let refined = lag as f64 + offset;
        let score = height - OCTAVE_COST * (floor_hz * refined / sr).log2();
        if best.is_none_or(|(_, _, s)| score > s) {
            best = Some((refined, height, score));
        }
    }
    best.map(|(lag, height, _)| (lag, height.clamp(0.0, 1.0 - 1e-7)))
}

/// Vertex of the parabola through three equally spaced points: `(offset, height)`,
/// offset relative to the middle point.
pub(crate) fn parabolic(prev: f64, cur: f64, next: f64) -> (f64, f64) {
    let denom = prev - 2.0 * cur + next;
    if denom.abs() < 1e-12 {
        return (0.0, cur);
    }
    let offset = (0.5 * (prev - next) / denom).clamp(-0.5, 0.5);
    (offset, cur - 0.25 * (prev - next) * offset)
}
