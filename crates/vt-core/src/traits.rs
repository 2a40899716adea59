use std::path::Path;

use crate::error::ExtractError;
use crate::features::FeatureSet;

/// Turns one audio file into a [`FeatureSet`].
///
/// Implemented by : `vt_audio::analyzer::VoiceAnalyzer`. Any other acoustic
/// backend (bindings, subprocess) plugs in here.
///
/// Implementations mark features they cannot compute as missing, or return
/// [`ExtractError::AnalysisFailure`] when configured strictly. They never
/// substitute a default number.
///
/// # Example
/// ```
/// use std::path::Path;
/// use vt_core::error::ExtractError;
/// use vt_core::features::{Feature, FeatureSet};
/// use vt_core::traits::AcousticExtractor;
///
/// struct FixedExtractor;
/// impl AcousticExtractor for FixedExtractor {
///     fn extract(&self, path: &Path) -> Result<FeatureSet, ExtractError> {
///         Ok(FeatureSet::new(path.display().to_string()).with(Feature::IntensityDb, 60.0))
///     }
/// }
///
/// let set = FixedExtractor.extract(Path::new("a.wav")).unwrap();
/// assert_eq!(set.get(Feature::IntensityDb), Some(60.0));
/// ```
pub trait AcousticExtractor: Send + Sync {
    /// Analyse `path`.
    ///
    /// # Errors
    /// [`ExtractError::UnreadableAudio`] if the file cannot be decoded,
    /// [`ExtractError::AnalysisFailure`] in strict mode when a feature is undefined.
    fn extract(&self, path: &Path) -> Result<FeatureSet, ExtractError>;
}
