use std::path::PathBuf;

use thiserror::Error;

use crate::features::Feature;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// `aggregate` was called with no feature set.
    #[error("Cannot aggregate an empty batch: at least one feature set is required")]
    EmptyBatch,

    /// An expected-improvement band is not usable.
    #[error("Invalid band for {feature}: [{low}, {high}] ({reason})")]
    InvalidBand {
        /// Feature the band belongs to.
        feature: Feature,
        /// Lower endpoint.
        low: f64,
        /// Upper endpoint.
        high: f64,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Invalid configuration value or structure.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Errors from an [`AcousticExtractor`](crate::traits::AcousticExtractor).
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The file is missing, corrupt, or in an unsupported format.
    #[error("Unreadable audio {}: {reason}", path.display())]
    UnreadableAudio {
        /// File that failed.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// Decoding worked but required features could not be computed.
    #[error("Analysis failed for {} ({}): {reason}", path.display(), join_features(features))]
    AnalysisFailure {
        /// File that failed.
        path: PathBuf,
        /// Features that could not be computed.
        features: Vec<Feature>,
        /// Analyzer message.
        reason: String,
    },
}

fn join_features(features: &[Feature]) -> String {
    features
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}
