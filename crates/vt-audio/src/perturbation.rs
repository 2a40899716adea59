use vt_core::config::AnalysisConfig;

use crate::pitch::{PitchFrame, PitchTrack, parabolic};

/// Fraction of the local period searched on each side of the expected pulse.
const SEARCH_FRACTION: f64 = 0.2;

/// Minimum number of accepted periods for jitter/shimmer to be defined.
pub const MIN_PERIODS: usize = 3;

/// One glottal pulse: waveform peak of a cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pulse {
    /// Position in samples, sub-sample refined.
    pub position: f64,
    /// Absolute peak amplitude.
    pub amplitude: f64,
}

/// Cycle-to-cycle perturbation measures.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Perturbation {
    /// Local jitter, %.
    pub jitter_pct: Option<f64>,
    /// Local shimmer, %.
    pub shimmer_pct: Option<f64>,
    /// Periods that passed the floor/ceiling filter.
    pub valid_periods: usize,
}

/// Pick glottal pulses in every voiced run of `track`.
///
/// The first pulse is the strongest peak of the run's first period; each
/// next one is the peak of the same polarity within ±20% of one local
/// period after the previous. Pulses never cross an unvoiced gap.
#[must_use]
pub fn find_pulses(samples: &[f32], track: &PitchTrack) -> Vec<Vec<Pulse>> {
    let sr = f64::from(track.sample_rate);
    track
        .voiced_runs()
        .into_iter()
        .map(|run| pulses_in_run(samples, run, track.window_len, track.hop, sr))
        .filter(|p| !p.is_empty())
        .collect()
}

fn pulses_in_run(samples: &[f32], run: &[PitchFrame], window_len: usize, hop: usize, sr: f64) -> Vec<Pulse> {
    let (Some(first), Some(last)) = (run.first(), run.last()) else {
        return Vec::new();
    };
    let region_start = first.start;
    let region_end = (last.start + window_len).min(samples.len());

    let period_at = |pos: f64| -> Option<f64> {
        let idx = ((pos - region_start as f64) / hop as f64).max(0.0) as usize;
        run[idx.min(run.len() - 1)].f0_hz.map(|f0| sr / f0)
    };

    let Some(t0) = period_at(region_start as f64) else {
        return Vec::new();
    };
    let first_end = (region_start + t0.ceil() as usize).min(region_end);
    let Some(seed) = (region_start..first_end).max_by(|&a, &b| samples[a].abs().total_cmp(&samples[b].abs()))
    else {
        return Vec::new();
    };
    let polarity = if samples[seed] < 0.0 { -1.0 } else { 1.0 };

    let mut pulses = Vec::new();
    let Some(mut current) = refine(samples, seed, polarity) else {
        return pulses;
    };
    pulses.push(current);

    while let Some(period) = period_at(current.position) {
        let expected = current.position + period;
        let lo = (expected - SEARCH_FRACTION * period).floor().max(0.0) as usize;
        let hi = (expected + SEARCH_FRACTION * period).ceil() as usize;
        if hi + 1 >= region_end {
            break;
        }
        let Some(peak) = (lo..=hi).max_by(|&a, &b| (polarity * f64::from(samples[a])).total_cmp(&(polarity * f64::from(samples[b]))))
        else {
            break;
        };
        let Some(next) = refine(samples, peak, polarity) else {
            break;
        };
        if next.position <= current.position + 0.5 * period {
            break;
        }
        pulses.push(next);
        current = next;
    }
    pulses
}

fn refine(samples: &[f32], idx: usize, polarity: f64) -> Option<Pulse> {
    if idx == 0 || idx + 1 >= samples.len() {
        return None;
    }
    let at = |i: usize| polarity * f64::from(samples[i]);
    let (offset, height) = parabolic(at(idx - 1), at(idx), at(idx + 1));
    Some(Pulse {
        position: idx as f64 + offset,
        amplitude: height.abs(),
    })
}

/// Local jitter and shimmer over all runs of pulses.
///
/// A period is accepted inside `[period_floor_secs, period_ceiling_secs]`.
/// Jitter uses consecutive accepted periods whose ratio is at most
/// `max_period_factor`; shimmer uses consecutive amplitudes across an
/// accepted period whose ratio is at most `max_amplitude_factor`.
/// Both are `None` below [`MIN_PERIODS`] accepted periods.
#[must_use]
pub fn measure(runs: &[Vec<Pulse>], sample_rate: u32, config: &AnalysisConfig) -> Perturbation {
    let sr = f64::from(sample_rate);
    let accepted = |p: f64| p >= config.period_floor_secs && p <= config.period_ceiling_secs;

    let mut period_sum = 0.0;
    let mut valid_periods = 0usize;
    let mut period_diffs = Vec::new();
    let mut amp_sum = 0.0;
    let mut amp_count = 0usize;
    let mut amp_diffs = Vec::new();

    for run in runs {
        let mut prev_period: Option<f64> = None;
        for pair in run.windows(2) {
            let period = (pair[1].position - pair[0].position) / sr;
            if !accepted(period) {
                prev_period = None;
                continue;
            }
            valid_periods += 1;
            period_sum += period;

            if let Some(prev) = prev_period
                && ratio(prev, period) <= config.max_period_factor
            {
                period_diffs.push((period - prev).abs());
            }
            prev_period = Some(period);

            let (a, b) = (pair[0].amplitude, pair[1].amplitude);
            amp_sum += a + b;
            amp_count += 2;
            if ratio(a, b) <= config.max_amplitude_factor {
                amp_diffs.push((a - b).abs());
            }
        }
    }

    if valid_periods < MIN_PERIODS {
        log::debug!("perturbation: only {valid_periods} valid periods");
        return Perturbation {
            valid_periods,
            ..Perturbation::default()
        };
    }

    let mean_period = period_sum / valid_periods as f64;
    let mean_amp = amp_sum / amp_count as f64;

    Perturbation {
        jitter_pct: mean_of(&period_diffs).map(|d| d / mean_period * 100.0),
        shimmer_pct: mean_of(&amp_diffs)
            .filter(|_| mean_amp > f64::EPSILON)
            .map(|d| d / mean_amp * 100.0),
        valid_periods,
    }
}

fn ratio(a: f64, b: f64) -> f64 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    if lo <= 0.0 { f64::INFINITY } else { hi / lo }
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::track_pitch;
    use crate::testutil::sine;

    const SR: u32 = 44_100;

    /// Concatenated single sine cycles with the given lengths and amplitudes.
    fn cycles(lengths: impl Iterator<Item = usize>, amp: impl Fn(usize) -> f32) -> Vec<f32> {
        let mut out = Vec::new();
        for (i, len) in lengths.enumerate() {
            let a = amp(i);
            out.extend((0..len).map(|n| a * (2.0 * std::f32::consts::PI * n as f32 / len as f32).sin()));
        }
        out
    }

    fn analyse(samples: &[f32]) -> Perturbation {
        let config = AnalysisConfig::default();
        let track = track_pitch(samples, SR, &config);
        measure(&find_pulses(samples, &track), SR, &config)
    }

    #[test]
    fn steady_tone_has_near_zero_perturbation() {
        let p = analyse(&sine(225.0, SR, 1.0, 0.5));
        assert!(p.valid_periods > 100);
        assert!(p.jitter_pct.is_some_and(|j| j < 0.1), "{p:?}");
        assert!(p.shimmer_pct.is_some_and(|s| s < 0.1), "{p:?}");
    }

    #[test]
    fn alternating_periods_give_expected_jitter() {
        // 198/202-sample cycles: peak-to-peak periods alternate 199/201 → 1 %
        let samples = cycles((0..220).map(|i| if i % 2 == 0 { 198 } else { 202 }), |_| 0.5);
        let p = analyse(&samples);
        assert!(p.jitter_pct.is_some_and(|j| (0.7..1.3).contains(&j)), "{p:?}");
        assert!(p.shimmer_pct.is_some_and(|s| s < 0.5), "{p:?}");
    }

    #[test]
    fn varying_amplitude_gives_expected_shimmer() {
        const AMPS: [f32; 4] = [0.5, 0.46, 0.5, 0.54];
        let samples = cycles(std::iter::repeat_n(200, 220), |i| AMPS[i % 4]);
        let p = analyse(&samples);
        // |ΔA| = 0.04 every cycle, mean A = 0.5 → 8 %
        assert!(p.shimmer_pct.is_some_and(|s| (6.0..10.0).contains(&s)), "{p:?}");
        assert!(p.jitter_pct.is_some_and(|j| j < 0.3), "{p:?}");
    }

    #[test]
    fn too_few_periods_is_undefined() {
        let pulses = vec![vec![
            Pulse { position: 0.0, amplitude: 0.5 },
            Pulse { position: 200.0, amplitude: 0.5 },
            Pulse { position: 400.0, amplitude: 0.5 },
        ]];
        let p = measure(&pulses, SR, &AnalysisConfig::default());
        assert_eq!(p.valid_periods, 2);
        assert_eq!(p.jitter_pct, None);
        assert_eq!(p.shimmer_pct, None);
    }

    #[test]
    fn out_of_range_periods_are_rejected() {
        // 0.05 s periods exceed the 0.02 s ceiling
        let pulses = vec![
            (0..10)
                .map(|i| Pulse {
                    position: f64::from(i) * 2205.0,
                    amplitude: 0.5,
                })
                .collect(),
        ];
        let p = measure(&pulses, SR, &AnalysisConfig::default());
        assert_eq!(p.valid_periods, 0);
        assert_eq!(p.jitter_pct, None);
    }

    #[test]
    fn silence_has_no_pulses() {
        let samples = vec![0.0; 22_050];
        let track = track_pitch(&samples, SR, &AnalysisConfig::default());
        assert!(find_pulses(&samples, &track).is_empty());
    }
}
