use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::features::{Feature, FeatureSet};

/// Statistics of one feature across a group of recordings.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct FeatureStats {
    /// Arithmetic mean over the recordings where the feature is present.
    pub mean: f64,
    /// Population standard deviation over the same recordings.
    pub std_dev: f64,
    /// Number of recordings that contributed.
    pub present_count: usize,
}

/// Per-feature summary of one session (e.g. "baseline").
///
/// Always rebuilt from the full list of feature sets; there is no
/// incremental update.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FeatureAggregate {
    /// Session/group name.
    pub label: String,
    /// Number of feature sets aggregated (>= 1).
    pub sample_count: usize,
    /// Stats per feature. An absent key means no recording had that feature.
    pub stats: BTreeMap<Feature, FeatureStats>,
}

impl FeatureAggregate {
    /// Mean of `feature`, `None` if missing.
    #[must_use]
    pub fn mean(&self, feature: Feature) -> Option<f64> {
        self.stats.get(&feature).map(|s| s.mean)
    }

    /// Full stats of `feature`, `None` if missing.
    #[must_use]
    pub fn stats(&self, feature: Feature) -> Option<&FeatureStats> {
        self.stats.get(&feature)
    }
}

/// Aggregate a non-empty group of feature sets.
///
/// Each feature is averaged over the sets that have it. A feature present in
/// none of them stays missing in the aggregate.
///
/// # Errors
/// [`CoreError::EmptyBatch`] if `sets` is empty.
///
/// # Example
/// ```
/// use vt_core::aggregate::aggregate;
/// use vt_core::features::{Feature, FeatureSet};
///
/// let sets = [
///     FeatureSet::new("a").with(Feature::IntensityDb, 60.0),
///     FeatureSet::new("b").with(Feature::IntensityDb, 64.0),
/// ];
/// let agg = aggregate("baseline", &sets).unwrap();
/// assert_eq!(agg.sample_count, 2);
/// assert_eq!(agg.mean(Feature::IntensityDb), Some(62.0));
/// assert_eq!(agg.mean(Feature::HnrDb), None);
/// ```
pub fn aggregate(label: impl Into<String>, sets: &[FeatureSet]) -> Result<FeatureAggregate, CoreError> {
    if sets.is_empty() {
        return Err(CoreError::EmptyBatch);
    }

    let mut stats = BTreeMap::new();
    for feature in Feature::ALL {
        let values: Vec<f64> = sets.iter().filter_map(|s| s.get(feature)).collect();
        if let Some(s) = feature_stats(&values) {
            stats.insert(feature, s);
        } else {
            log::debug!("{feature}: no recording has a value, marked missing");
        }
    }

    Ok(FeatureAggregate {
        label: label.into(),
        sample_count: sets.len(),
        stats,
    })
}

fn feature_stats(values: &[f64]) -> Option<FeatureStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(FeatureStats {
        mean,
        std_dev: variance.sqrt(),
        present_count: values.len(),
    })
}
