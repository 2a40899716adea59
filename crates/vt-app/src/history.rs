use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use vt_core::features::FeatureSet;

/// Append `sets` to a JSON-lines history file, creating it if needed.
///
/// Earlier entries are never rewritten, so a history grows one line per
/// analysed recording.
///
/// # Errors
/// Returns an error if the file cannot be opened, written, or flushed.
pub fn append_history(path: &Path, sets: &[FeatureSet]) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open history {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for set in sets {
        serde_json::to_writer(&mut writer, set)
            .with_context(|| format!("Cannot write history {}", path.display()))?;
        writer.write_all(b"\n")?;
    }
    writer
        .flush()
        .with_context(|| format!("Cannot write history {}", path.display()))?;
    log::info!("Appended {} entries to {}", sets.len(), path.display());
    Ok(())
}

/// Read every entry of a history file, in file order. Blank lines are skipped.
///
/// # Errors
/// Returns an error naming the line when an entry is not a valid feature set.
pub fn read_history(path: &Path) -> Result<Vec<FeatureSet>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Cannot read history {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid history entry", path.display(), i + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vt_core::features::Feature;

    #[test]
    fn appends_across_calls() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("history.jsonl");

        let mut first = FeatureSet::new("week_0.wav").with(Feature::IntensityDb, 58.0);
        first.analyzed_at = Some(Utc::now());
        append_history(&path, std::slice::from_ref(&first))?;
        append_history(
            &path,
            &[
                FeatureSet::new("week_4a.wav").with(Feature::IntensityDb, 63.0),
                FeatureSet::new("week_4b.wav"),
            ],
        )?;

        let entries = read_history(&path)?;
        let ids: Vec<&str> = entries.iter().map(|e| e.source_id.as_str()).collect();
        assert_eq!(ids, ["week_0.wav", "week_4a.wav", "week_4b.wav"]);
        assert_eq!(entries[0], first);
        assert_eq!(entries[2].get(Feature::IntensityDb), None);
        Ok(())
    }

    #[test]
    fn corrupt_line_is_located() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("history.jsonl");
        append_history(&path, &[FeatureSet::new("a.wav")])?;
        fs::OpenOptions::new().append(true).open(&path)?.write_all(b"\n{oops\n")?;

        let err = read_history(&path).unwrap_err();
        assert!(format!("{err:#}").contains(":3: invalid history entry"), "{err:#}");
        Ok(())
    }

    #[test]
    fn missing_history_is_an_error() {
        assert!(read_history(Path::new("/no/such/history.jsonl")).is_err());
    }
}
