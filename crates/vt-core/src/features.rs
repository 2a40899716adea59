use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scalar voice features tracked across sessions.
///
/// # Example
/// ```
/// use vt_core::features::Feature;
/// assert_eq!(Feature::ALL.len(), 6);
/// assert_eq!(Feature::HnrDb.key(), "hnr_db");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Mean intensity (loudness), dB.
    IntensityDb,
    /// Mean F0 over voiced frames, Hz.
    PitchMeanHz,
    /// max F0 - min F0 over voiced frames, Hz.
    PitchRangeHz,
    /// Local jitter, %.
    JitterPct,
    /// Local shimmer, %.
    ShimmerPct,
    /// Harmonics-to-noise ratio, dB.
    HnrDb,
}

impl Feature {
    /// All features, in report order.
    pub const ALL: [Feature; 6] = [
        Feature::IntensityDb,
        Feature::PitchMeanHz,
        Feature::PitchRangeHz,
        Feature::JitterPct,
        Feature::ShimmerPct,
        Feature::HnrDb,
    ];

    /// Stable snake_case key, identical to the serde / TOML name.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Feature::IntensityDb => "intensity_db",
            Feature::PitchMeanHz => "pitch_mean_hz",
            Feature::PitchRangeHz => "pitch_range_hz",
            Feature::JitterPct => "jitter_pct",
            Feature::ShimmerPct => "shimmer_pct",
            Feature::HnrDb => "hnr_db",
        }
    }

    /// Unit suffix for display.
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Feature::IntensityDb | Feature::HnrDb => "dB",
            Feature::PitchMeanHz | Feature::PitchRangeHz => "Hz",
            Feature::JitterPct | Feature::ShimmerPct => "%",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Measurements extracted from one recording.
///
/// A `None` feature is missing: the analyzer could not compute it (e.g. no
/// voiced frame for pitch). Missing values are never replaced by zero.
///
/// # Example
/// ```
/// use vt_core::features::{Feature, FeatureSet};
/// let set = FeatureSet::new("a.wav").with(Feature::IntensityDb, 62.5);
/// assert_eq!(set.get(Feature::IntensityDb), Some(62.5));
/// assert_eq!(set.get(Feature::HnrDb), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct FeatureSet {
    /// File name or other identifier of the recording.
    pub source_id: String,
    pub intensity_db: Option<f64>,
    pub pitch_mean_hz: Option<f64>,
    pub pitch_range_hz: Option<f64>,
    pub jitter_pct: Option<f64>,
    pub shimmer_pct: Option<f64>,
    pub hnr_db: Option<f64>,

    // === Metadata (reported, never compared) ===
    /// F0 standard deviation, Hz.
    #[serde(default)]
    pub pitch_std_hz: Option<f64>,
    /// Lowest voiced F0, Hz.
    #[serde(default)]
    pub pitch_min_hz: Option<f64>,
    /// Highest voiced F0, Hz.
    #[serde(default)]
    pub pitch_max_hz: Option<f64>,
    /// Recording length in seconds.
    #[serde(default)]
    pub duration_secs: f64,
    /// Native sample rate of the decoded file.
    #[serde(default)]
    pub sample_rate: u32,
    /// When the analysis ran, used to order history entries.
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl FeatureSet {
    /// Empty set: every feature missing.
    #[must_use]
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Self::default()
        }
    }

    /// Builder-style setter, used by analyzers and tests.
    #[must_use]
    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, Some(value));
        self
    }

    /// Value of `feature`, `None` if missing.
    ///
    /// Non-finite values are reported as missing so they cannot leak into means.
    #[must_use]
    pub fn get(&self, feature: Feature) -> Option<f64> {
        let v = match feature {
            Feature::IntensityDb => self.intensity_db,
            Feature::PitchMeanHz => self.pitch_mean_hz,
            Feature::PitchRangeHz => self.pitch_range_hz,
            Feature::JitterPct => self.jitter_pct,
            Feature::ShimmerPct => self.shimmer_pct,
            Feature::HnrDb => self.hnr_db,
        };
        v.filter(|x| x.is_finite())
    }

    /// Sets or clears one feature.
    pub fn set(&mut self, feature: Feature, value: Option<f64>) {
        let slot = match feature {
            Feature::IntensityDb => &mut self.intensity_db,
            Feature::PitchMeanHz => &mut self.pitch_mean_hz,
            Feature::PitchRangeHz => &mut self.pitch_range_hz,
            Feature::JitterPct => &mut self.jitter_pct,
            Feature::ShimmerPct => &mut self.shimmer_pct,
            Feature::HnrDb => &mut self.hnr_db,
        };
        *slot = value;
    }

    /// Features that are missing in this set.
    #[must_use]
    pub fn missing(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|&f| self.get(f).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_reads_as_missing() {
        let mut set = FeatureSet::new("x");
        set.set(Feature::JitterPct, Some(f64::NAN));
        set.set(Feature::HnrDb, Some(f64::INFINITY));
        assert_eq!(set.get(Feature::JitterPct), None);
        assert_eq!(set.get(Feature::HnrDb), None);
        assert_eq!(set.missing().len(), 6);
    }

    #[test]
    fn set_and_clear_round_through_accessors() {
        let mut set = FeatureSet::new("x").with(Feature::PitchRangeHz, 42.0);
        assert_eq!(set.pitch_range_hz, Some(42.0));
        set.set(Feature::PitchRangeHz, None);
        assert!(set.missing().contains(&Feature::PitchRangeHz));
    }

    #[test]
    fn feature_keys_match_serde_names() {
        for feature in Feature::ALL {
            let json = toml::Value::try_from(feature).map(|v| v.to_string());
            assert_eq!(
                json.ok().as_deref().map(|s| s.trim_matches('"').to_string()),
                Some(feature.key().to_string())
            );
        }
    }
}
