use crate::pitch::PitchTrack;

/// Mean harmonics-to-noise ratio over voiced frames, dB.
///
/// Each voiced frame's autocorrelation peak `r` is the harmonic share of its
/// energy, so HNR = 10·log10(r / (1 − r)). Unvoiced frames are skipped.
/// `None` when no frame is voiced.
#[must_use]
pub fn mean_hnr_db(track: &PitchTrack) -> Option<f64> {
    let values: Vec<f64> = track
        .frames
        .iter()
        .filter(|f| f.f0_hz.is_some())
        .map(|f| hnr_db(f.strength))
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// HNR of one autocorrelation peak height.
///
/// # Example
/// ```
/// use vt_audio::harmonicity::hnr_db;
/// assert!(hnr_db(0.5).abs() < 1e-9);
/// assert!((hnr_db(0.99) - 19.956).abs() < 0.01);
/// ```
#[must_use]
pub fn hnr_db(strength: f64) -> f64 {
    let r = strength.clamp(1e-7, 1.0 - 1e-7);
    10.0 * (r / (1.0 - r)).log10()
}
