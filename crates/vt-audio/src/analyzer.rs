use std::path::Path;

use chrono::Utc;
use vt_core::config::AnalysisConfig;
use vt_core::error::ExtractError;
use vt_core::features::{Feature, FeatureSet};
use vt_core::traits::AcousticExtractor;

use crate::decode::decode_file;
use crate::harmonicity::mean_hnr_db;
use crate::intensity::mean_intensity_db;
use crate::perturbation::{self, MIN_PERIODS};
use crate::pitch::track_pitch;

/// Result of analysing one in-memory signal.
#[derive(Clone, Debug)]
pub struct VoiceAnalysis {
    pub features: FeatureSet,
    /// Missing features with the reason they could not be computed.
    pub gaps: Vec<(Feature, &'static str)>,
}

/// Native voice analyzer: intensity, F0, jitter, shimmer, HNR.
///
/// # Example
/// ```
/// use vt_audio::analyzer::VoiceAnalyzer;
/// use vt_core::features::Feature;
///
/// let sr = 44_100;
/// let samples: Vec<f32> = (0..sr)
///     .map(|i| (2.0 * std::f32::consts::PI * 200.0 * i as f32 / sr as f32).sin() * 0.5)
///     .collect();
/// let analysis = VoiceAnalyzer::default().analyze_samples("tone", &samples, sr as u32);
/// let f0 = analysis.features.get(Feature::PitchMeanHz).unwrap();
/// assert!((f0 - 200.0).abs() < 2.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct VoiceAnalyzer {
    config: AnalysisConfig,
}

impl VoiceAnalyzer {
    #[must_use]
    pub fn new(mut config: AnalysisConfig) -> Self {
        config.clamp_all();
        Self { config }
    }

    /// Compute every feature of a mono signal. Features that are undefined
    /// for this signal stay missing and are listed in `gaps`.
    #[must_use]
    pub fn analyze_samples(&self, source_id: &str, samples: &[f32], sample_rate: u32) -> VoiceAnalysis {
        let mut set = FeatureSet::new(source_id);
        set.analyzed_at = Some(Utc::now());
        let mut gaps = Vec::new();

        if sample_rate == 0 || samples.is_empty() {
            gaps.extend(Feature::ALL.iter().map(|&f| (f, "empty signal")));
            return VoiceAnalysis { features: set, gaps };
        }
        set.sample_rate = sample_rate;
        set.duration_secs = samples.len() as f64 / f64::from(sample_rate);

        set.intensity_db = mean_intensity_db(samples);
        if set.intensity_db.is_none() {
            gaps.push((Feature::IntensityDb, "signal is silent"));
        }

        let track = track_pitch(samples, sample_rate, &self.config);
        if let Some(stats) = track.stats() {
            set.pitch_mean_hz = Some(stats.mean_hz);
            set.pitch_range_hz = Some(stats.range_hz());
            set.pitch_std_hz = Some(stats.std_hz);
            set.pitch_min_hz = Some(stats.min_hz);
            set.pitch_max_hz = Some(stats.max_hz);
        } else {
            gaps.push((Feature::PitchMeanHz, "no voiced frame"));
            gaps.push((Feature::PitchRangeHz, "no voiced frame"));
        }

        set.hnr_db = mean_hnr_db(&track);
        if set.hnr_db.is_none() {
            gaps.push((Feature::HnrDb, "no voiced frame"));
        }

        let pulses = perturbation::find_pulses(samples, &track);
        let perturb = perturbation::measure(&pulses, sample_rate, &self.config);
        set.jitter_pct = perturb.jitter_pct;
        set.shimmer_pct = perturb.shimmer_pct;
        if perturb.valid_periods < MIN_PERIODS {
            gaps.push((Feature::JitterPct, "fewer than 3 valid periods"));
            gaps.push((Feature::ShimmerPct, "fewer than 3 valid periods"));
        } else {
            if set.jitter_pct.is_none() {
                gaps.push((Feature::JitterPct, "no comparable consecutive periods"));
            }
            if set.shimmer_pct.is_none() {
                gaps.push((Feature::ShimmerPct, "no comparable consecutive amplitudes"));
            }
        }

        for (feature, reason) in &gaps {
            log::warn!("{source_id}: {feature} missing ({reason})");
        }
        log::debug!(
            "{source_id}: {:.2}s @ {sample_rate} Hz, {} voiced frames, {} periods",
            set.duration_secs,
            track.voiced_f0().len(),
            perturb.valid_periods
        );

        VoiceAnalysis { features: set, gaps }
    }
}

impl AcousticExtractor for VoiceAnalyzer {
    fn extract(&self, path: &Path) -> Result<FeatureSet, ExtractError> {
        let audio = decode_file(path).map_err(|e| ExtractError::UnreadableAudio {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let source_id = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let analysis = self.analyze_samples(&source_id, &audio.samples, audio.sample_rate);

        if self.config.strict && !analysis.gaps.is_empty() {
            let mut features: Vec<Feature> = analysis.gaps.iter().map(|(f, _)| *f).collect();
            features.dedup();
            let reason = analysis
                .gaps
                .iter()
                .map(|(_, r)| *r)
                .next()
                .unwrap_or("undefined feature")
                .to_string();
            return Err(ExtractError::AnalysisFailure {
                path: path.to_path_buf(),
                features,
                reason,
            });
        }
        Ok(analysis.features)
    }
}
