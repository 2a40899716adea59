use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// voicetrack — Acoustic voice tracking across therapy sessions.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Fail a file when any feature cannot be computed, instead of marking it missing.
    #[arg(long, default_value_t = false, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse a single recording.
    Analyze {
        /// Audio file (WAV, MP3, FLAC, OGG).
        file: PathBuf,
        /// Write the feature set as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
        /// Append the result to a JSON-lines history file.
        #[arg(long)]
        append_history: Option<PathBuf>,
    },
    /// Analyse every recording of a folder and aggregate them.
    Batch {
        /// Folder of audio files (not recursive).
        dir: PathBuf,
        /// Write per-file features, failures and the aggregate as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
        /// Append every analysed recording to a JSON-lines history file.
        #[arg(long)]
        append_history: Option<PathBuf>,
    },
    /// Compare a baseline session with a follow-up session.
    ///
    /// Each side is a folder of recordings or a single file.
    Compare {
        /// Baseline session: folder or audio file.
        baseline: PathBuf,
        /// Follow-up session: folder or audio file.
        followup: PathBuf,
        /// Override the global noise threshold.
        #[arg(long)]
        noise_threshold: Option<f64>,
        /// Write the comparison as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Print the entries of a history file, oldest first.
    History {
        /// JSON-lines file written by `--append-history`.
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compare_with_overrides() {
        let cli = Cli::try_parse_from([
            "voicetrack",
            "compare",
            "pre",
            "post",
            "--noise-threshold",
            "0.3",
            "--strict",
            "--log-level",
            "info",
        ])
        .unwrap();
        assert!(cli.strict);
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
        match cli.command {
            Command::Compare {
                baseline,
                followup,
                noise_threshold,
                json,
            } => {
                assert_eq!(baseline, PathBuf::from("pre"));
                assert_eq!(followup, PathBuf::from("post"));
                assert_eq!(noise_threshold, Some(0.3));
                assert!(json.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn analyze_accepts_history_file() {
        let cli = Cli::try_parse_from([
            "voicetrack",
            "analyze",
            "take.wav",
            "--append-history",
            "history.jsonl",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze { file, append_history, .. } => {
                assert_eq!(file, PathBuf::from("take.wav"));
                assert_eq!(append_history, Some(PathBuf::from("history.jsonl")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["voicetrack"]).is_err());
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
