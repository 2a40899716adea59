use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde::Serialize;
use vt_core::aggregate::{FeatureAggregate, aggregate};
use vt_core::error::CoreError;
use vt_core::features::FeatureSet;
use vt_core::traits::AcousticExtractor;

/// Extensions picked up by [`scan_audio_dir`], lowercase.
pub const AUDIO_EXTS: &[&str] = &["wav", "mp3", "flac", "ogg"];

/// A file that could not be turned into a feature set.
#[derive(Clone, Debug, Serialize)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Result of a batch extraction: every input ends up in exactly one list.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchOutcome {
    /// Successful extractions, in input order.
    pub successes: Vec<FeatureSet>,
    /// Failed files, in input order.
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    /// Number of files processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Aggregate the successful extractions.
    ///
    /// # Errors
    /// [`CoreError::EmptyBatch`] when no file succeeded.
    pub fn aggregate(&self, label: impl Into<String>) -> Result<FeatureAggregate, CoreError> {
        aggregate(label, &self.successes)
    }
}

/// List the audio files directly inside `dir`, sorted by path.
///
/// # Errors
/// Returns an error if `dir` is not a readable directory.
pub fn scan_audio_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Cannot list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file()
            && let Some(ext) = path.extension().and_then(|s| s.to_str())
            && AUDIO_EXTS.contains(&ext.to_lowercase().as_str())
        {
            files.push(path);
        }
    }
    files.sort();
    log::info!("{}: {} audio files", dir.display(), files.len());
    Ok(files)
}

/// Run `extractor` over `paths` in parallel. Order is preserved; failures are
/// collected, never dropped.
pub fn extract_batch<E: AcousticExtractor + ?Sized>(extractor: &E, paths: &[PathBuf]) -> BatchOutcome {
    let results: Vec<_> = paths.par_iter().map(|p| (p, extractor.extract(p))).collect();

    let mut outcome = BatchOutcome::default();
    for (path, result) in results {
        match result {
            Ok(set) => outcome.successes.push(set),
            Err(e) => {
                log::warn!("Skipping {}: {e}", path.display());
                outcome.failures.push(BatchFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    log::info!(
        "Batch: {} ok, {} failed",
        outcome.successes.len(),
        outcome.failures.len()
    );
    outcome
}

/// Scan `dir` and extract every audio file in it.
///
/// # Errors
/// Returns an error if `dir` cannot be listed or holds no audio file.
pub fn analyze_folder<E: AcousticExtractor + ?Sized>(extractor: &E, dir: &Path) -> Result<BatchOutcome> {
    let files = scan_audio_dir(dir)?;
    if files.is_empty() {
        bail!("No audio file ({}) in {}", AUDIO_EXTS.join(", "), dir.display());
    }
    Ok(extract_batch(extractor, &files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::VoiceAnalyzer;
    use crate::testutil::{sine, write_wav};
    use vt_core::error::ExtractError;
    use vt_core::features::Feature;

    /// Reads the pitch from the file name: "200.wav" → 200 Hz.
    struct NameExtractor;

    impl AcousticExtractor for NameExtractor {
        fn extract(&self, path: &Path) -> Result<FeatureSet, ExtractError> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let hz: f64 = stem.parse().map_err(|_| ExtractError::UnreadableAudio {
                path: path.to_path_buf(),
                reason: "not a number".into(),
            })?;
            Ok(FeatureSet::new(stem).with(Feature::PitchMeanHz, hz))
        }
    }

    #[test]
    fn scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.WAV", "a.flac", "c.mp3", "notes.txt", "d.ogg"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.wav")).unwrap();

        let names: Vec<String> = scan_audio_dir(dir.path())
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, ["a.flac", "b.WAV", "c.mp3", "d.ogg"]);
    }

    #[test]
    fn scan_missing_dir_fails() {
        assert!(scan_audio_dir(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn batch_preserves_order_and_collects_failures() {
        let paths: Vec<PathBuf> = ["300", "bad", "100", "200"].iter().map(PathBuf::from).collect();
        let outcome = extract_batch(&NameExtractor, &paths);

        let ids: Vec<&str> = outcome.successes.iter().map(|s| s.source_id.as_str()).collect();
        assert_eq!(ids, ["300", "100", "200"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].path, PathBuf::from("bad"));
        assert_eq!(outcome.total(), 4);

        let agg = outcome.aggregate("session").unwrap();
        assert_eq!(agg.mean(Feature::PitchMeanHz), Some(200.0));
    }

    #[test]
    fn all_failed_batch_cannot_aggregate() {
        let outcome = extract_batch(&NameExtractor, &[PathBuf::from("x")]);
        assert!(matches!(outcome.aggregate("s"), Err(CoreError::EmptyBatch)));
    }

    #[test]
    fn analyze_folder_with_real_files() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("take1.wav"), &sine(180.0, 44_100, 0.5, 0.4), 44_100).unwrap();
        write_wav(&dir.path().join("take2.wav"), &sine(220.0, 44_100, 0.5, 0.4), 44_100).unwrap();
        fs::write(dir.path().join("corrupt.wav"), b"RIFF....garbage").unwrap();

        let outcome = analyze_folder(&VoiceAnalyzer::default(), dir.path()).unwrap();
        assert_eq!(outcome.successes.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        let mean = outcome.aggregate("s").unwrap().mean(Feature::PitchMeanHz).unwrap();
        assert!((mean - 200.0).abs() < 3.0, "{mean}");
    }

    #[test]
    fn empty_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(analyze_folder(&NameExtractor, dir.path()).is_err());
    }
}
