use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use vt_audio::batch::BatchOutcome;
use vt_core::aggregate::FeatureAggregate;
use vt_core::compare::ComparisonResult;
use vt_core::features::{Feature, FeatureSet};

const MISSING: &str = "n/a";

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.precision$}"))
}

fn fmt_signed(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:+.precision$}"))
}

/// Lines joined with a trailing newline.
fn block(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Feature table of one recording.
pub fn format_features(set: &FeatureSet) -> String {
    let mut lines = vec![format!(
        "{} ({:.2}s @ {} Hz)",
        set.source_id, set.duration_secs, set.sample_rate
    )];
    lines.extend(Feature::ALL.iter().map(|&feature| {
        format!(
            "  {:<16} {:>10} {}",
            feature.key(),
            fmt_opt(set.get(feature), 3),
            feature.unit()
        )
    }));
    if set.pitch_min_hz.is_some() {
        lines.push(format!(
            "  {:<16} {:>10} Hz (min {}, max {})",
            "pitch_std_hz",
            fmt_opt(set.pitch_std_hz, 3),
            fmt_opt(set.pitch_min_hz, 1),
            fmt_opt(set.pitch_max_hz, 1)
        ));
    }
    block(&lines)
}

fn failure_lines(outcome: &BatchOutcome) -> impl Iterator<Item = String> + '_ {
    outcome
        .failures
        .iter()
        .map(|f| format!("  FAIL  {}: {}", f.path.display(), f.error))
}

/// Per-file summary, failures, then the session aggregate if any.
pub fn format_batch(outcome: &BatchOutcome, aggregate: Option<&FeatureAggregate>) -> String {
    let mut lines = vec![format!(
        "{} files: {} analysed, {} failed",
        outcome.total(),
        outcome.successes.len(),
        outcome.failures.len()
    )];
    lines.extend(
        outcome
            .successes
            .iter()
            .map(|set| format!("  ok    {} (missing: {})", set.source_id, join_missing(set))),
    );
    lines.extend(failure_lines(outcome));
    if let Some(agg) = aggregate {
        lines.push(String::new());
        lines.push(format!("Session '{}' ({} recordings)", agg.label, agg.sample_count));
        lines.push(format!("  {:<16} {:>10} {:>10} {:>4}", "feature", "mean", "std", "n"));
        for feature in Feature::ALL {
            lines.push(match agg.stats(feature) {
                Some(s) => format!(
                    "  {:<16} {:>10.3} {:>10.3} {:>4}",
                    feature.key(),
                    s.mean,
                    s.std_dev,
                    s.present_count
                ),
                None => format!("  {:<16} {:>10} {:>10} {:>4}", feature.key(), MISSING, MISSING, 0),
            });
        }
    }
    block(&lines)
}

fn join_missing(set: &FeatureSet) -> String {
    let missing = set.missing();
    if missing.is_empty() {
        "none".to_string()
    } else {
        missing.iter().map(|f| f.key()).collect::<Vec<_>>().join(", ")
    }
}

/// Files a session had to skip, empty when none.
pub fn format_skipped(label: &str, outcome: &BatchOutcome) -> String {
    if outcome.failures.is_empty() {
        return String::new();
    }
    let mut lines = vec![format!(
        "{label}: skipped {} of {} files",
        outcome.failures.len(),
        outcome.total()
    )];
    lines.extend(failure_lines(outcome));
    block(&lines)
}

/// Comparison table plus overall progress line.
pub fn format_comparison(result: &ComparisonResult) -> String {
    let mut lines = vec![
        format!("{} -> {}", result.baseline_label, result.followup_label),
        format!(
            "  {:<16} {:>10} {:>10} {:>10} {:>9}  result",
            "feature", "baseline", "followup", "delta", "change"
        ),
    ];
    for row in &result.rows {
        let change = row
            .percent_change
            .map_or_else(|| MISSING.to_string(), |p| format!("{p:+.1}%"));
        let flag = if row.exceeds_band { " (beyond band)" } else { "" };
        lines.push(format!(
            "  {:<16} {:>10} {:>10} {:>10} {:>9}  {}{flag}",
            row.feature.key(),
            fmt_opt(row.baseline_mean, 3),
            fmt_opt(row.followup_mean, 3),
            fmt_signed(row.delta, 3),
            change,
            row.classification.label(),
        ));
    }
    let summary = result.summary();
    lines.push(String::new());
    lines.push(format!(
        "Progress: {:?} ({} improved, {} declined, {} assessed)",
        summary.level, summary.improved, summary.declined, summary.assessed
    ));
    block(&lines)
}

/// History entries in file order, one line per analysis.
pub fn format_history(entries: &[FeatureSet]) -> String {
    let mut header = format!("  {:<16} {:<24}", "analyzed_at", "source");
    for feature in Feature::ALL {
        header.push_str(&format!(" {:>14}", feature.key()));
    }
    let mut lines = vec![format!("{} entries", entries.len()), header];
    for set in entries {
        let when = set
            .analyzed_at
            .map_or_else(|| MISSING.to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
        let mut line = format!("  {when:<16} {:<24}", set.source_id);
        for feature in Feature::ALL {
            line.push_str(&format!(" {:>14}", fmt_opt(set.get(feature), 3)));
        }
        lines.push(line);
    }
    block(&lines)
}

/// JSON payload of the `batch` command.
#[derive(Serialize)]
pub struct BatchReport<'a> {
    #[serde(flatten)]
    pub outcome: &'a BatchOutcome,
    pub aggregate: Option<&'a FeatureAggregate>,
}

/// JSON payload of the `compare` command: the rows plus what each session
/// analysed or skipped.
#[derive(Serialize)]
pub struct CompareReport<'a> {
    pub comparison: &'a ComparisonResult,
    pub baseline: &'a BatchOutcome,
    pub followup: &'a BatchOutcome,
}

/// Envelope written by every `--json` export.
#[derive(Serialize)]
pub struct JsonReport<'a, T: Serialize> {
    pub generated_at: DateTime<Utc>,
    pub tool_version: &'static str,
    pub kind: &'static str,
    pub data: &'a T,
}

/// Serialize `data` inside a timestamped envelope to `path`.
///
/// # Errors
/// Returns an error if the file cannot be created, written, or flushed.
pub fn write_json<T: Serialize>(path: &Path, kind: &'static str, data: &T) -> Result<()> {
    let report = JsonReport {
        generated_at: Utc::now(),
        tool_version: env!("CARGO_PKG_VERSION"),
        kind,
        data,
    };
    let file = File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report)
        .with_context(|| format!("Cannot write JSON to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Cannot write JSON to {}", path.display()))?;
    log::info!("Wrote {kind} report to {}", path.display());
    Ok(())
}
