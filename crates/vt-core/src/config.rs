use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::features::Feature;

/// Noise threshold used when neither the band nor the file sets one.
pub const DEFAULT_NOISE_THRESHOLD: f64 = 0.5;

/// Direction of change a band counts as improvement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Higher is better (intensity, pitch range, HNR).
    Increase,
    /// Lower is better (jitter, shimmer).
    Decrease,
}

/// Expected change for one feature, as a closed interval.
///
/// Increase bands have `0 <= low <= high`, decrease bands `low <= high <= 0`.
/// The endpoint nearest zero is where improvement starts, the far one is the
/// top of the expected range.
///
/// # Example
/// ```
/// use vt_core::config::{Direction, ExpectedBand};
/// let band = ExpectedBand::new(-1.0, -0.2);
/// assert_eq!(band.direction(), Direction::Decrease);
/// assert!((band.onset() - 0.2).abs() < 1e-12);
/// assert!((band.ceiling() - 1.0).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExpectedBand {
    /// Lower endpoint.
    pub low: f64,
    /// Upper endpoint.
    pub high: f64,
    /// Per-band override of the global noise threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_threshold: Option<f64>,
}

impl ExpectedBand {
    #[must_use]
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
            noise_threshold: None,
        }
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.low >= 0.0 {
            Direction::Increase
        } else {
            Direction::Decrease
        }
    }

    /// Magnitude at which improvement starts.
    #[must_use]
    pub fn onset(&self) -> f64 {
        match self.direction() {
            Direction::Increase => self.low,
            Direction::Decrease => -self.high,
        }
    }

    /// Magnitude of the far end of the expected range.
    #[must_use]
    pub fn ceiling(&self) -> f64 {
        match self.direction() {
            Direction::Increase => self.high,
            Direction::Decrease => -self.low,
        }
    }

    /// Check the band is finite, ordered, and on one side of zero.
    ///
    /// # Errors
    /// [`CoreError::InvalidBand`] describing the first problem found.
    pub fn validate(&self, feature: Feature) -> Result<(), CoreError> {
        let invalid = |reason| CoreError::InvalidBand {
            feature,
            low: self.low,
            high: self.high,
            reason,
        };
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(invalid("non-finite endpoint"));
        }
        if self.low > self.high {
            return Err(invalid("low is above high"));
        }
        if self.low < 0.0 && self.high > 0.0 {
            return Err(invalid("band straddles zero"));
        }
        if let Some(noise) = self.noise_threshold
            && !(noise.is_finite() && noise >= 0.0)
        {
            return Err(invalid("noise threshold must be finite and >= 0"));
        }
        Ok(())
    }
}

/// Expected-improvement table and noise threshold used by `compare`.
///
/// Defaults follow the LSVT LOUD expectations. Features without a band are
/// reported but not assessed.
///
/// # Example
/// ```
/// use vt_core::config::ComparisonConfig;
/// use vt_core::features::Feature;
/// let config = ComparisonConfig::default();
/// assert!(config.band(Feature::IntensityDb).is_some());
/// assert!(config.band(Feature::PitchMeanHz).is_none());
/// assert!((config.noise_threshold - 0.5).abs() < f64::EPSILON);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ComparisonConfig {
    /// Minimum magnitude of a change against the expected direction that counts as a decline.
    pub noise_threshold: f64,
    /// Band per feature.
    pub bands: BTreeMap<Feature, ExpectedBand>,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self::lsvt_loud()
    }
}

impl ComparisonConfig {
    /// LSVT LOUD expected changes.
    #[must_use]
    pub fn lsvt_loud() -> Self {
        let bands = BTreeMap::from([
            (Feature::IntensityDb, ExpectedBand::new(3.0, 10.0)),
            (Feature::PitchRangeHz, ExpectedBand::new(10.0, 40.0)),
            (Feature::HnrDb, ExpectedBand::new(2.0, 5.0)),
            (Feature::JitterPct, ExpectedBand::new(-1.0, -0.2)),
            (Feature::ShimmerPct, ExpectedBand::new(-3.0, -0.5)),
        ]);
        Self {
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
            bands,
        }
    }

    /// Empty table: no feature is assessed until bands are added.
    ///
    /// # Errors
    /// [`CoreError::Config`] if `noise_threshold` is negative or not finite.
    pub fn without_bands(noise_threshold: f64) -> Result<Self, CoreError> {
        let config = Self {
            noise_threshold,
            bands: BTreeMap::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Builder-style band override.
    ///
    /// # Errors
    /// [`CoreError::InvalidBand`] if `band` straddles zero, is inverted, or
    /// has a bad noise override.
    ///
    /// # Example
    /// ```
    /// use vt_core::config::{ComparisonConfig, ExpectedBand};
    /// use vt_core::features::Feature;
    /// let config = ComparisonConfig::without_bands(0.5)
    ///     .and_then(|c| c.with_band(Feature::PitchMeanHz, ExpectedBand::new(5.0, 20.0)));
    /// assert!(config.is_ok());
    /// assert!(ComparisonConfig::default()
    ///     .with_band(Feature::JitterPct, ExpectedBand::new(-1.0, 1.0))
    ///     .is_err());
    /// ```
    pub fn with_band(mut self, feature: Feature, band: ExpectedBand) -> Result<Self, CoreError> {
        band.validate(feature)?;
        self.bands.insert(feature, band);
        Ok(self)
    }

    #[must_use]
    pub fn band(&self, feature: Feature) -> Option<&ExpectedBand> {
        self.bands.get(&feature)
    }

    /// Noise threshold for `feature`: band override, else global.
    #[must_use]
    pub fn noise_for(&self, feature: Feature) -> f64 {
        self.band(feature)
            .and_then(|b| b.noise_threshold)
            .unwrap_or(self.noise_threshold)
    }

    /// Validate every band and the global threshold.
    ///
    /// # Errors
    /// Returns the first invalid band or threshold.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.noise_threshold.is_finite() && self.noise_threshold >= 0.0) {
            return Err(CoreError::Config(format!(
                "noise_threshold must be finite and >= 0, got {}",
                self.noise_threshold
            )));
        }
        for (&feature, band) in &self.bands {
            band.validate(feature)?;
        }
        Ok(())
    }
}

/// Voice analysis parameters. Defaults mirror the usual Praat settings for
/// periodic point processes and cross-correlation harmonicity.
///
/// # Example
/// ```
/// use vt_core::config::AnalysisConfig;
/// let config = AnalysisConfig::default();
/// assert!(!config.strict);
/// assert!((config.pitch_floor_hz - 75.0).abs() < f64::EPSILON);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Fail the whole file when any feature is undefined instead of marking it missing.
    pub strict: bool,
    /// Lowest F0 searched, Hz.
    pub pitch_floor_hz: f64,
    /// Highest F0 searched, Hz.
    pub pitch_ceiling_hz: f64,
    /// Minimum normalized autocorrelation peak for a frame to be voiced [0, 1].
    pub voicing_threshold: f64,
    /// Frame RMS relative to the global peak below which a frame is silent [0, 1].
    pub silence_threshold: f64,
    /// Hop between analysis frames, seconds.
    pub time_step_secs: f64,
    /// Shortest glottal period kept for jitter/shimmer, seconds.
    pub period_floor_secs: f64,
    /// Longest glottal period kept for jitter/shimmer, seconds.
    pub period_ceiling_secs: f64,
    /// Max ratio between consecutive periods.
    pub max_period_factor: f64,
    /// Max ratio between consecutive amplitudes.
    pub max_amplitude_factor: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            strict: false,
            pitch_floor_hz: 75.0,
            pitch_ceiling_hz: 500.0,
            voicing_threshold: 0.45,
            silence_threshold: 0.03,
            time_step_secs: 0.01,
            period_floor_secs: 0.0001,
            period_ceiling_secs: 0.02,
            max_period_factor: 1.3,
            max_amplitude_factor: 1.6,
        }
    }
}

impl AnalysisConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.pitch_floor_hz = self.pitch_floor_hz.clamp(30.0, 600.0);
        self.pitch_ceiling_hz = self
            .pitch_ceiling_hz
            .clamp(self.pitch_floor_hz + 50.0, 2000.0);
        self.voicing_threshold = self.voicing_threshold.clamp(0.0, 1.0);
        self.silence_threshold = self.silence_threshold.clamp(0.0, 1.0);
        self.time_step_secs = self.time_step_secs.clamp(0.001, 0.1);
        self.period_floor_secs = self.period_floor_secs.clamp(0.0, 0.01);
        self.period_ceiling_secs = self
            .period_ceiling_secs
            .clamp(self.period_floor_secs + 0.001, 0.1);
        self.max_period_factor = self.max_period_factor.clamp(1.0, 5.0);
        self.max_amplitude_factor = self.max_amplitude_factor.clamp(1.0, 5.0);
    }
}

/// Complete configuration of the tool.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct VoiceConfig {
    pub comparison: ComparisonConfig,
    pub analysis: AnalysisConfig,
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize, Default)]
struct ConfigFile {
    comparison: Option<ComparisonSection>,
    bands: Option<BTreeMap<Feature, ExpectedBand>>,
    analysis: Option<AnalysisSection>,
}

/// Comparison section, all fields optional for partial override.
#[derive(Deserialize)]
struct ComparisonSection {
    noise_threshold: Option<f64>,
    /// Start from an empty band table instead of the LSVT LOUD defaults.
    #[serde(default)]
    replace_bands: bool,
}

/// Analysis section, all fields optional for partial override.
#[derive(Deserialize)]
struct AnalysisSection {
    strict: Option<bool>,
    pitch_floor_hz: Option<f64>,
    pitch_ceiling_hz: Option<f64>,
    voicing_threshold: Option<f64>,
    silence_threshold: Option<f64>,
    time_step_secs: Option<f64>,
    period_floor_secs: Option<f64>,
    period_ceiling_secs: Option<f64>,
    max_period_factor: Option<f64>,
    max_amplitude_factor: Option<f64>,
}

/// Parse TOML text and merge it over the defaults.
///
/// `[bands.<feature>]` tables replace the default band of that feature only,
/// unless `[comparison] replace_bands = true`.
///
/// # Errors
/// Returns an error if the TOML is malformed or a band is invalid.
///
/// # Example
/// ```
/// use vt_core::config::parse_config;
/// use vt_core::features::Feature;
/// let config = parse_config("[bands.intensity_db]\nlow = 2.0\nhigh = 8.0\n").unwrap();
/// let band = config.comparison.band(Feature::IntensityDb).unwrap();
/// assert!((band.low - 2.0).abs() < f64::EPSILON);
/// assert!(config.comparison.band(Feature::HnrDb).is_some());
/// ```
pub fn parse_config(content: &str) -> Result<VoiceConfig> {
    let file: ConfigFile = toml::from_str(content).context("TOML parse error")?;
    let mut config = VoiceConfig::default();

    if let Some(c) = file.comparison {
        if c.replace_bands {
            config.comparison.bands.clear();
        }
        if let Some(v) = c.noise_threshold {
            config.comparison.noise_threshold = v;
        }
    }
    if let Some(bands) = file.bands {
        config.comparison.bands.extend(bands);
    }

    if let Some(a) = file.analysis {
        let target = &mut config.analysis;
        if let Some(v) = a.strict {
            target.strict = v;
        }
        if let Some(v) = a.pitch_floor_hz {
            target.pitch_floor_hz = v;
        }
        if let Some(v) = a.pitch_ceiling_hz {
            target.pitch_ceiling_hz = v;
        }
        if let Some(v) = a.voicing_threshold {
            target.voicing_threshold = v;
        }
        if let Some(v) = a.silence_threshold {
            target.silence_threshold = v;
        }
        if let Some(v) = a.time_step_secs {
            target.time_step_secs = v;
        }
        if let Some(v) = a.period_floor_secs {
            target.period_floor_secs = v;
        }
        if let Some(v) = a.period_ceiling_secs {
            target.period_ceiling_secs = v;
        }
        if let Some(v) = a.max_period_factor {
            target.max_period_factor = v;
        }
        if let Some(v) = a.max_amplitude_factor {
            target.max_amplitude_factor = v;
        }
    }

    config.analysis.clamp_all();
    config.comparison.validate()?;
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or validated.
///
/// # Example
/// ```no_run
/// use vt_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<VoiceConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
}
