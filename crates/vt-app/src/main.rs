use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use vt_audio::analyzer::VoiceAnalyzer;
use vt_audio::batch::{BatchOutcome, analyze_folder, extract_batch};
use vt_core::aggregate::FeatureAggregate;
use vt_core::compare::{ComparisonResult, compare};
use vt_core::config::{VoiceConfig, load_config};
use vt_core::traits::AcousticExtractor;

pub mod cli;
pub mod history;
pub mod report;

use cli::{Cli, Command};

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config, puis les overrides CLI
    let mut config = resolve_config(&cli.config)?;
    if cli.strict {
        config.analysis.strict = true;
    }
    let analyzer = VoiceAnalyzer::new(config.analysis.clone());

    match cli.command {
        Command::Analyze {
            file,
            json,
            append_history,
        } => run_analyze(&analyzer, &file, json.as_deref(), append_history.as_deref()),
        Command::Batch {
            dir,
            json,
            append_history,
        } => run_batch(&analyzer, &dir, json.as_deref(), append_history.as_deref()),
        Command::Compare {
            baseline,
            followup,
            noise_threshold,
            json,
        } => {
            if let Some(noise) = noise_threshold {
                config.comparison.noise_threshold = noise;
                config.comparison.validate()?;
            }
            run_compare(&analyzer, &config, &baseline, &followup, json.as_deref())
        }
        Command::History { file } => {
            let entries = history::read_history(&file)?;
            print!("{}", report::format_history(&entries));
            Ok(())
        }
    }
}

fn run_analyze(
    analyzer: &VoiceAnalyzer,
    file: &Path,
    json: Option<&Path>,
    history_file: Option<&Path>,
) -> Result<()> {
    let set = analyzer.extract(file)?;
    print!("{}", report::format_features(&set));
    if let Some(path) = json {
        report::write_json(path, "features", &set)?;
    }
    if let Some(path) = history_file {
        history::append_history(path, std::slice::from_ref(&set))?;
    }
    Ok(())
}

fn run_batch(
    analyzer: &VoiceAnalyzer,
    dir: &Path,
    json: Option<&Path>,
    history_file: Option<&Path>,
) -> Result<()> {
    let outcome = analyze_folder(analyzer, dir)?;
    let aggregate = match outcome.aggregate(session_label(dir)) {
        Ok(agg) => Some(agg),
        Err(e) => {
            log::error!("{}: {e}", dir.display());
            None
        }
    };
    print!("{}", report::format_batch(&outcome, aggregate.as_ref()));

    if let Some(path) = json {
        report::write_json(
            path,
            "batch",
            &report::BatchReport {
                outcome: &outcome,
                aggregate: aggregate.as_ref(),
            },
        )?;
    }
    if let Some(path) = history_file
        && !outcome.successes.is_empty()
    {
        history::append_history(path, &outcome.successes)?;
    }
    if aggregate.is_none() {
        anyhow::bail!("No recording in {} could be analysed", dir.display());
    }
    Ok(())
}

/// One analysed session: what happened per file, and the aggregate of the successes.
struct Session {
    outcome: BatchOutcome,
    aggregate: FeatureAggregate,
}

/// Analyse a session given as a folder of recordings or as a single file.
fn load_session<E: AcousticExtractor + ?Sized>(extractor: &E, path: &Path) -> Result<Session> {
    let outcome = if path.is_file() {
        extract_batch(extractor, &[path.to_path_buf()])
    } else {
        analyze_folder(extractor, path)?
    };
    let aggregate = outcome
        .aggregate(session_label(path))
        .with_context(|| format!("Cannot aggregate session {}", path.display()))?;
    log::info!(
        "{}: {} of {} recordings aggregated",
        aggregate.label,
        aggregate.sample_count,
        outcome.total()
    );
    Ok(Session { outcome, aggregate })
}

fn compare_sessions<E: AcousticExtractor + ?Sized>(
    extractor: &E,
    config: &VoiceConfig,
    baseline_path: &Path,
    followup_path: &Path,
) -> Result<(Session, Session, ComparisonResult)> {
    let baseline = load_session(extractor, baseline_path)?;
    let followup = load_session(extractor, followup_path)?;
    let result = compare(&baseline.aggregate, &followup.aggregate, &config.comparison);
    Ok((baseline, followup, result))
}

fn run_compare(
    analyzer: &VoiceAnalyzer,
    config: &VoiceConfig,
    baseline_path: &Path,
    followup_path: &Path,
    json: Option<&Path>,
) -> Result<()> {
    let (baseline, followup, result) = compare_sessions(analyzer, config, baseline_path, followup_path)?;

    print!("{}", report::format_skipped(&baseline.aggregate.label, &baseline.outcome));
    print!("{}", report::format_skipped(&followup.aggregate.label, &followup.outcome));
    print!("{}", report::format_comparison(&result));
    if let Some(path) = json {
        report::write_json(
            path,
            "comparison",
            &report::CompareReport {
                comparison: &result,
                baseline: &baseline.outcome,
                followup: &followup.outcome,
            },
        )?;
    }
    Ok(())
}

/// Session label: the folder or file name.
fn session_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Resolve config: defaults when the file is absent.
fn resolve_config(path: &Path) -> Result<VoiceConfig> {
    if path.exists() {
        load_config(path)
    } else {
        log::warn!("Config introuvable : {}. Utilisation des défauts.", path.display());
        Ok(VoiceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vt_core::compare::Classification;
    use vt_core::error::CoreError;
    use vt_core::features::Feature;

    const SR: u32 = 44_100;

    /// Half-second sine at `freq` Hz, peak `amp`, as 16-bit mono WAV.
    fn write_tone(path: &Path, freq: f32, amp: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..SR / 2 {
            let x = (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin() * amp;
            writer.write_sample((x * f32::from(i16::MAX)) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn label_is_folder_name() {
        assert_eq!(session_label(Path::new("sessions/week_4")), "week_4");
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = resolve_config(Path::new("/no/such/voicetrack.toml")).unwrap();
        assert_eq!(config, VoiceConfig::default());
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = resolve_config(&path).unwrap();
        assert_eq!(config, VoiceConfig::default());
    }

    #[test]
    fn compares_folder_against_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let pre = dir.path().join("pre");
        std::fs::create_dir(&pre).unwrap();
        write_tone(&pre.join("a.wav"), 200.0, 0.1);
        write_tone(&pre.join("b.wav"), 200.0, 0.1);
        std::fs::write(pre.join("c.wav"), b"broken").unwrap();
        let post = dir.path().join("post.wav");
        // 4x amplitude: +12 dB
        write_tone(&post, 200.0, 0.4);

        let (baseline, followup, result) =
            compare_sessions(&VoiceAnalyzer::default(), &VoiceConfig::default(), &pre, &post).unwrap();
        assert_eq!(baseline.aggregate.sample_count, 2);
        assert_eq!(baseline.outcome.failures.len(), 1);
        assert_eq!(followup.aggregate.label, "post.wav");

        let row = result.row(Feature::IntensityDb).unwrap();
        assert!(row.delta.is_some_and(|d| (d - 12.04).abs() < 0.1), "{row:?}");
        assert_eq!(row.classification, Classification::Improved);
        assert!(row.exceeds_band);
    }

    #[test]
    fn session_without_any_readable_file_fails_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let pre = dir.path().join("pre");
        std::fs::create_dir(&pre).unwrap();
        std::fs::write(pre.join("a.wav"), b"not audio").unwrap();
        std::fs::write(pre.join("b.wav"), b"still not audio").unwrap();
        let post = dir.path().join("post.wav");
        write_tone(&post, 200.0, 0.3);

        let Err(err) = compare_sessions(&VoiceAnalyzer::default(), &VoiceConfig::default(), &pre, &post)
        else {
            panic!("an all-failed session cannot be compared");
        };
        assert!(err.to_string().contains("Cannot aggregate session"), "{err:#}");
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::EmptyBatch)));
    }

    #[test]
    fn comparison_json_carries_session_failures() {
        let dir = tempfile::tempdir().unwrap();
        let pre = dir.path().join("pre");
        std::fs::create_dir(&pre).unwrap();
        write_tone(&pre.join("a.wav"), 180.0, 0.2);
        std::fs::write(pre.join("z.wav"), b"junk").unwrap();
        let post = dir.path().join("post.wav");
        write_tone(&post, 180.0, 0.2);
        let out = dir.path().join("cmp.json");

        run_compare(
            &VoiceAnalyzer::default(),
            &VoiceConfig::default(),
            &pre,
            &post,
            Some(&out),
        )
        .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(value["kind"], "comparison");
        assert_eq!(value["data"]["baseline"]["failures"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["data"]["followup"]["successes"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["data"]["comparison"]["followup_label"], "post.wav");
    }
}
