// crates/driftgate-baseline/src/decay.rs
// ============================================================================
// Module: Baseline Decay Detection
// Description: Flags a baseline as stale based on age, metric coverage, and
//              drift fraction against the current run.
// Purpose: Implement C3's "Decay" operation (§4.3).
// Dependencies: driftgate-core
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/baseline_decay.py`'s `is_baseline_stale`.
//! Thresholds have no single canonical default in the original
//! implementation's config surface, so [`DecayPolicy::default`] picks
//! conservative values (documented in `DESIGN.md`) rather than leaving the
//! policy unusable out of the box.

use driftgate_core::MetricMap;

/// Thresholds controlling when a baseline is considered stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPolicy {
    /// Maximum age, in seconds, before a baseline is stale regardless of
    /// metric agreement.
    pub max_age_sec: i64,
    /// Minimum number of metrics that must be common between baseline and
    /// current before staleness can be judged on drift fraction at all.
    pub min_metrics: usize,
    /// Relative difference (vs. baseline) above which a common metric
    /// counts as "drifted" for staleness purposes.
    pub max_drift_fraction: f64,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            max_age_sec: 7 * 24 * 3600,
            min_metrics: 5,
            max_drift_fraction: 0.2,
        }
    }
}

/// Reason a baseline was flagged as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayReason {
    /// The baseline is older than `max_age_sec`.
    TooOld,
    /// Fewer than `min_metrics` metrics are common to both runs.
    InsufficientOverlap,
    /// At least half of the common metrics drifted past `max_drift_fraction`.
    MajorityDrifted,
}

/// Relative drift of `current` vs `baseline`. A zero baseline is a special
/// case: drifted (treated as unbounded) if `current` has moved away from
/// zero by more than a hair, otherwise not drifted.
fn relative_drift(current: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return if current.abs() > 1e-9 { f64::INFINITY } else { 0.0 };
    }
    ((current - baseline) / baseline).abs()
}

/// Evaluates whether a baseline is stale relative to `current` (§4.3 "Decay").
///
/// `age_sec` is the baseline run's age at evaluation time, in seconds.
#[must_use]
pub fn detect_decay(
    age_sec: i64,
    baseline: &MetricMap,
    current: &MetricMap,
    policy: &DecayPolicy,
) -> Option<DecayReason> {
    if age_sec > policy.max_age_sec {
        return Some(DecayReason::TooOld);
    }

    // Common metrics are determined by key presence alone; a pair with a
    // null value on either side still counts toward the overlap, it just
    // can't drift.
    let common: Vec<(Option<f64>, Option<f64>)> = baseline
        .iter()
        .filter_map(|(name, base_value)| current.get(name).map(|cur_value| (base_value.value, cur_value.value)))
        .collect();

    if common.len() < policy.min_metrics {
        return Some(DecayReason::InsufficientOverlap);
    }

    let drifted = common
        .iter()
        .filter(|(base, cur)| match (base, cur) {
            (Some(base), Some(cur)) => relative_drift(*cur, *base) > policy.max_drift_fraction,
            _ => false,
        })
        .count();

    if drifted * 2 >= common.len() {
        return Some(DecayReason::MajorityDrifted);
    }

    None
}

#[cfg(test)]
mod tests {
    use driftgate_core::MetricValue;

    use super::*;

    fn metric(value: f64) -> MetricValue {
        MetricValue { value: Some(value), unit: None, tags: None }
    }

    fn metric_map(pairs: &[(&str, f64)]) -> MetricMap {
        pairs.iter().map(|(name, value)| ((*name).to_string(), metric(*value))).collect()
    }

    #[test]
    fn too_old_flags_regardless_of_metrics() {
        let baseline = metric_map(&[("a", 1.0)]);
        let current = metric_map(&[("a", 1.0)]);
        let policy = DecayPolicy { max_age_sec: 100, ..DecayPolicy::default() };
        assert_eq!(detect_decay(200, &baseline, &current, &policy), Some(DecayReason::TooOld));
    }

    #[test]
    fn insufficient_overlap_flags_when_too_few_common_metrics() {
        let baseline = metric_map(&[("a", 1.0), ("b", 2.0)]);
        let current = metric_map(&[("a", 1.0)]);
        let policy = DecayPolicy { min_metrics: 2, ..DecayPolicy::default() };
        assert_eq!(
            detect_decay(0, &baseline, &current, &policy),
            Some(DecayReason::InsufficientOverlap)
        );
    }

    #[test]
    fn majority_drifted_flags_when_half_or_more_exceed_fraction() {
        let baseline = metric_map(&[("a", 100.0), ("b", 100.0), ("c", 100.0)]);
        let current = metric_map(&[("a", 150.0), ("b", 160.0), ("c", 100.0)]);
        let policy = DecayPolicy { min_metrics: 3, max_drift_fraction: 0.2, ..DecayPolicy::default() };
        assert_eq!(
            detect_decay(0, &baseline, &current, &policy),
            Some(DecayReason::MajorityDrifted)
        );
    }

    #[test]
    fn stable_common_metrics_are_not_stale() {
        let baseline = metric_map(&[("a", 100.0), ("b", 100.0), ("c", 100.0)]);
        let current = metric_map(&[("a", 101.0), ("b", 99.0), ("c", 100.0)]);
        let policy = DecayPolicy { min_metrics: 3, ..DecayPolicy::default() };
        assert_eq!(detect_decay(0, &baseline, &current, &policy), None);
    }

    #[test]
    fn zero_baseline_moving_away_from_zero_counts_as_drifted() {
        let baseline = metric_map(&[("a", 0.0), ("b", 100.0), ("c", 100.0)]);
        let current = metric_map(&[("a", 5.0), ("b", 101.0), ("c", 99.0)]);
        let policy = DecayPolicy { min_metrics: 3, max_drift_fraction: 0.2, ..DecayPolicy::default() };
        assert_eq!(
            detect_decay(0, &baseline, &current, &policy),
            Some(DecayReason::MajorityDrifted)
        );
    }

    #[test]
    fn zero_baseline_staying_at_zero_is_not_drifted() {
        let baseline = metric_map(&[("a", 0.0), ("b", 100.0), ("c", 100.0)]);
        let current = metric_map(&[("a", 0.0), ("b", 101.0), ("c", 99.0)]);
        let policy = DecayPolicy { min_metrics: 3, max_drift_fraction: 0.2, ..DecayPolicy::default() };
        assert_eq!(detect_decay(0, &baseline, &current, &policy), None);
    }

    #[test]
    fn null_valued_common_metrics_still_count_toward_overlap() {
        let baseline = metric_map(&[("a", 100.0), ("b", 100.0)]);
        let mut current = metric_map(&[("a", 100.0)]);
        current.insert("b".to_string(), MetricValue { value: None, unit: None, tags: None });
        let policy = DecayPolicy { min_metrics: 2, max_drift_fraction: 0.2, ..DecayPolicy::default() };
        assert_eq!(detect_decay(0, &baseline, &current, &policy), None);
    }
}
