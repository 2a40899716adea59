//! Data model, comparison logic, and configuration for voicetrack.
//!
//! This crate holds everything that does not touch audio: feature sets,
//! session aggregates, baseline/follow-up comparison, the expected-band
//! configuration, and the `AcousticExtractor` seam.

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod error;
pub mod features;
pub mod traits;

pub use aggregate::{FeatureAggregate, FeatureStats, aggregate};
pub use compare::{Classification, ComparisonResult, FeatureComparison, classify, compare};
pub use config::{AnalysisConfig, ComparisonConfig, ExpectedBand, VoiceConfig};
pub use error::{CoreError, ExtractError};
pub use features::{Feature, FeatureSet};
pub use traits::AcousticExtractor;
