use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

/// Windowed, normalized autocorrelation through realfft.
///
/// Each frame is de-meaned, Hann-windowed, zero-padded to twice its length,
/// then `r(τ) = IFFT(|FFT(x)|²)`. The result is divided by `r(0)` and by the
/// window's own normalized autocorrelation, which removes the taper bias at
/// long lags. Buffers and plans are allocated once in the constructor.
///
/// # Example
/// ```
/// use vt_audio::autocorr::Autocorrelator;
/// let mut ac = Autocorrelator::new(1024);
/// let frame: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.1).sin()).collect();
/// let r = ac.process(&frame);
/// assert!((r[0] - 1.0).abs() < 1e-4);
/// ```
pub struct Autocorrelator {
    window_len: usize,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    output_buf: Vec<f32>,
    scratch_fwd: Vec<Complex<f32>>,
    scratch_inv: Vec<Complex<f32>>,
    /// Hann window coefficients.
    window: Vec<f32>,
    /// Normalized autocorrelation of the window itself.
    window_acf: Vec<f32>,
    /// Normalized result, lags `0..max_lag()`.
    result: Vec<f32>,
}

impl Autocorrelator {
    /// Create an autocorrelator for frames of `window_len` samples.
    ///
    /// # Panics
    /// Panics if `window_len` is 0.
    #[must_use]
    pub fn new(window_len: usize) -> Self {
        assert!(window_len > 0, "window length must be > 0");

        let fft_len = (2 * window_len).next_power_of_two();
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        let window: Vec<f32> = (0..window_len)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / (window_len as f32 - 1.0).max(1.0))
                        .cos())
            })
            .collect();

        let mut ac = Self {
            window_len,
            input_buf: forward.make_input_vec(),
            spectrum_buf: forward.make_output_vec(),
            output_buf: inverse.make_output_vec(),
            scratch_fwd: forward.make_scratch_vec(),
            scratch_inv: inverse.make_scratch_vec(),
            forward,
            inverse,
            window,
            window_acf: Vec::new(),
            result: vec![0.0; usable_lags(window_len)],
        };

        // Autocorrelation of the bare window, used as the bias correction.
        ac.input_buf.fill(0.0);
        ac.input_buf[..window_len].copy_from_slice(&ac.window);
        let raw = if ac.transform() { ac.output_buf.clone() } else { Vec::new() };
        ac.window_acf = normalized(&raw, usable_lags(window_len));
        ac
    }

    /// Number of lags returned by [`process`](Self::process).
    ///
    /// The window spans three periods of the lowest pitch, so lags stop a
    /// little past a third of it; beyond that the taper correction amplifies noise.
    #[must_use]
    pub fn max_lag(&self) -> usize {
        self.result.len()
    }

    /// Normalized autocorrelation of `frame`; `r[0] == 1` for non-silent input,
    /// all zeros for a silent frame. Shorter frames are zero-padded.
    pub fn process(&mut self, frame: &[f32]) -> &[f32] {
        let n = self.window_len.min(frame.len());
        let mean = if n == 0 {
            0.0
        } else {
            frame[..n].iter().sum::<f32>() / n as f32
        };

        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n {
                (frame[i] - mean) * self.window[i]
            } else {
                0.0
            };
        }

        self.result.fill(0.0);
        if !self.transform() {
            return &self.result;
        }

        let r0 = self.output_buf[0];
        if r0 <= f32::EPSILON {
            return &self.result;
        }
        for (lag, slot) in self.result.iter_mut().enumerate() {
            let w = self.window_acf.get(lag).copied().unwrap_or(0.0);
            *slot = if w > 1e-6 {
                self.output_buf[lag] / r0 / w
            } else {
                0.0
            };
        }
        &self.result
    }

    /// `input_buf` → power spectrum → `output_buf` (raw autocorrelation).
    fn transform(&mut self) -> bool {
        if self
            .forward
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch_fwd)
            .is_err()
        {
            return false;
        }
        for c in &mut self.spectrum_buf {
            *c = Complex::new(c.re * c.re + c.im * c.im, 0.0);
        }
        self.inverse
            .process_with_scratch(&mut self.spectrum_buf, &mut self.output_buf, &mut self.scratch_inv)
            .is_ok()
    }
}

fn usable_lags(window_len: usize) -> usize {
    (window_len / 3 + 2).min(window_len)
}

fn normalized(raw: &[f32], len: usize) -> Vec<f32> {
    let Some(&r0) = raw.first() else {
        return vec![0.0; len];
    };
    if r0 <= f32::EPSILON {
        return vec![0.0; len];
    }
    raw.iter().take(len).map(|v| v / r0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{noise, sine};

    #[test]
    fn silent_frame_is_all_zero() {
        let mut ac = Autocorrelator::new(512);
        let r = ac.process(&[0.0; 512]);
        assert_eq!(r.len(), 172);
        assert!(r.iter().all(|v| v.abs() < f32::EPSILON));
    }

    #[test]
    fn periodic_frame_peaks_at_period() {
        // 200 Hz at 16 kHz: period of 80 samples
        let frame = sine(200.0, 16_000, 0.05, 0.5);
        let mut ac = Autocorrelator::new(frame.len());
        let r = ac.process(&frame).to_vec();
        let peak_lag = (40..r.len().min(120))
            .max_by(|&a, &b| r[a].total_cmp(&r[b]))
            .unwrap_or(0);
        assert_eq!(peak_lag, 80);
        assert!(r[80] > 0.9, "corrected peak {}", r[80]);
    }

    #[test]
    fn noise_has_no_strong_peak() {
        // 40 ms at 44.1 kHz, the frame length used for a 75 Hz floor
        let frame = noise(1764, 0.3);
        let mut ac = Autocorrelator::new(frame.len());
        let r = ac.process(&frame);
        let best = r[88..].iter().fold(0.0f32, |m, &v| m.max(v));
        assert!(best < 0.6, "noise peak {best}");
    }
}
