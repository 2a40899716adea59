use serde::{Deserialize, Serialize};

use crate::aggregate::FeatureAggregate;
use crate::config::{ComparisonConfig, Direction, ExpectedBand};
use crate::features::Feature;

/// Outcome of one feature's change between two sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Classification {
    /// Change in the expected direction, at least the band's onset.
    Improved,
    /// Change against the expected direction, larger than the noise threshold.
    Declined,
    /// Neither improved nor declined.
    Unchanged,
    /// At least one session has no value for the feature.
    InsufficientData,
    /// No band is configured for the feature.
    NotAssessed,
}

impl Classification {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Classification::Improved => "improved",
            Classification::Declined => "declined",
            Classification::Unchanged => "unchanged",
            Classification::InsufficientData => "insufficient data",
            Classification::NotAssessed => "not assessed",
        }
    }
}

/// Classify a finite `delta` against `band`.
///
/// Pure: the same `(delta, band, noise_threshold)` always gives the same
/// answer. Band endpoints are inclusive; a decline must be strictly larger
/// than `noise_threshold`, so the exact boundary is `Unchanged`.
/// A non-finite `delta` is `InsufficientData`. A negative or NaN
/// `noise_threshold` counts as 0. `band` is expected to have passed
/// [`ExpectedBand::validate`].
///
/// # Example
/// ```
/// use vt_core::compare::{classify, Classification};
/// use vt_core::config::ExpectedBand;
/// let band = ExpectedBand::new(3.0, 10.0);
/// assert_eq!(classify(5.0, &band, 0.5), Classification::Improved);
/// assert_eq!(classify(1.0, &band, 0.5), Classification::Unchanged);
/// assert_eq!(classify(-0.5, &band, 0.5), Classification::Unchanged);
/// assert_eq!(classify(-0.6, &band, 0.5), Classification::Declined);
/// ```
#[must_use]
pub fn classify(delta: f64, band: &ExpectedBand, noise_threshold: f64) -> Classification {
    if !delta.is_finite() {
        return Classification::InsufficientData;
    }
    let noise = if noise_threshold > 0.0 { noise_threshold } else { 0.0 };
    let toward = directed(delta, band);
    if toward >= band.onset() {
        Classification::Improved
    } else if toward < -noise {
        Classification::Declined
    } else {
        Classification::Unchanged
    }
}

/// `delta` projected on the band's improvement direction.
fn directed(delta: f64, band: &ExpectedBand) -> f64 {
    match band.direction() {
        Direction::Increase => delta,
        Direction::Decrease => -delta,
    }
}

/// One row of a comparison.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FeatureComparison {
    pub feature: Feature,
    pub baseline_mean: Option<f64>,
    pub followup_mean: Option<f64>,
    /// `followup_mean - baseline_mean`, when both are present.
    pub delta: Option<f64>,
    /// Delta relative to the baseline, %. `None` when the baseline mean is 0.
    pub percent_change: Option<f64>,
    pub classification: Classification,
    /// Improved by more than the band's far endpoint. Informational.
    pub exceeds_band: bool,
}

/// Overall verdict on a comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum ProgressLevel {
    /// Three or more features improved.
    Excellent,
    /// Two features improved.
    Good,
    /// One feature improved.
    Partial,
    /// Nothing improved.
    Limited,
}

/// Counts over the assessed rows of a [`ComparisonResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProgressSummary {
    pub improved: usize,
    pub declined: usize,
    /// Rows classified as Improved, Declined, or Unchanged.
    pub assessed: usize,
    pub level: ProgressLevel,
}

/// Baseline vs follow-up comparison, one row per feature.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ComparisonResult {
    pub baseline_label: String,
    pub followup_label: String,
    pub rows: Vec<FeatureComparison>,
}

impl ComparisonResult {
    /// Row for `feature`.
    #[must_use]
    pub fn row(&self, feature: Feature) -> Option<&FeatureComparison> {
        self.rows.iter().find(|r| r.feature == feature)
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        let count = |c: Classification| self.rows.iter().filter(|r| r.classification == c).count();
        let improved = count(Classification::Improved);
        let declined = count(Classification::Declined);
        let assessed = improved + declined + count(Classification::Unchanged);
        let level = match improved {
            0 => ProgressLevel::Limited,
            1 => ProgressLevel::Partial,
            2 => ProgressLevel::Good,
            _ => ProgressLevel::Excellent,
        };
        ProgressSummary {
            improved,
            declined,
            assessed,
            level,
        }
    }
}

/// Compare two session aggregates feature by feature.
///
/// # Example
/// ```
/// use vt_core::aggregate::aggregate;
/// use vt_core::compare::{compare, Classification};
/// use vt_core::config::ComparisonConfig;
/// use vt_core::features::{Feature, FeatureSet};
///
/// let baseline = aggregate("baseline", &[FeatureSet::new("a").with(Feature::IntensityDb, 60.0)]).unwrap();
/// let followup = aggregate("week_4", &[FeatureSet::new("b").with(Feature::IntensityDb, 65.0)]).unwrap();
/// let result = compare(&baseline, &followup, &ComparisonConfig::default());
/// let row = result.row(Feature::IntensityDb).unwrap();
/// assert_eq!(row.delta, Some(5.0));
/// assert_eq!(row.classification, Classification::Improved);
/// ```
#[must_use]
pub fn compare(
    baseline: &FeatureAggregate,
    followup: &FeatureAggregate,
    config: &ComparisonConfig,
) -> ComparisonResult {
    let rows = Feature::ALL
        .into_iter()
        .map(|feature| compare_feature(feature, baseline, followup, config))
        .collect();

    ComparisonResult {
        baseline_label: baseline.label.clone(),
        followup_label: followup.label.clone(),
        rows,
    }
}

fn compare_feature(
    feature: Feature,
    baseline: &FeatureAggregate,
    followup: &FeatureAggregate,
    config: &ComparisonConfig,
) -> FeatureComparison {
    let baseline_mean = baseline.mean(feature).filter(|v| v.is_finite());
    let followup_mean = followup.mean(feature).filter(|v| v.is_finite());

    let delta = match (baseline_mean, followup_mean) {
        (Some(b), Some(f)) => Some(f - b),
        _ => None,
    };
    let percent_change = match (delta, baseline_mean) {
        (Some(d), Some(b)) if b.abs() > f64::EPSILON => Some(d / b * 100.0),
        _ => None,
    };

    let (classification, exceeds_band) = match (delta, config.band(feature)) {
        (None, _) => (Classification::InsufficientData, false),
        (Some(_), None) => (Classification::NotAssessed, false),
        (Some(d), Some(band)) => {
            let class = classify(d, band, config.noise_for(feature));
            let exceeds = class == Classification::Improved && directed(d, band) > band.ceiling();
            (class, exceeds)
        }
    };

    FeatureComparison {
        feature,
        baseline_mean,
        followup_mean,
        delta,
        percent_change,
        classification,
        exceeds_band,
    }
}
