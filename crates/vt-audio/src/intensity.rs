/// Squared reference pressure (2e-5 Pa), samples are treated as pascals.
const REFERENCE_POWER: f64 = 4.0e-10;

/// Mean intensity in dB, energy-averaged over the whole signal.
///
/// Returns `None` for an empty or fully silent signal, where the level is undefined.
///
/// # Example
/// ```
/// use vt_audio::intensity::mean_intensity_db;
/// // full-scale square wave: mean power 1.0
/// let db = mean_intensity_db(&[1.0, -1.0, 1.0, -1.0]).unwrap();
/// assert!((db - 93.98).abs() < 0.01);
/// assert_eq!(mean_intensity_db(&[0.0; 64]), None);
/// ```
#[must_use]
pub fn mean_intensity_db(samples: &[f32]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let power = samples.iter().map(|s| f64::from(*s).powi(2)).sum::<f64>() / samples.len() as f64;
    if power <= f64::MIN_POSITIVE {
        return None;
    }
    Some(10.0 * (power / REFERENCE_POWER).log10())
}
