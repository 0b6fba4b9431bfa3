// crates/driftgate-baseline/src/quality.rs
// ============================================================================
// Module: Baseline Quality Scoring
// Description: Weighted-sum confidence score for a candidate baseline run.
// Purpose: Implement C3's "Baseline quality" operation (§4.3).
// Dependencies: driftgate-config
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/baseline_quality.py`'s `score_baseline`:
//! each signal contributes a `[0,1]` sub-score, the sub-scores are combined
//! by the policy's weights, and `passed` additionally requires every
//! configured minimum to be met independently of the weighted total.

use driftgate_config::BaselineQualityPolicy;

/// Raw signals measured for a candidate baseline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySignals {
    /// Number of samples the candidate run is based on.
    pub sample_size: u64,
    /// Seconds the candidate run's configuration/environment was stable.
    pub time_in_state_sec: i64,
    /// Coefficient of variation across the candidate's metrics (lower is
    /// more stable).
    pub coefficient_of_variation: f64,
    /// Whether the candidate run has any unresolved alerts.
    pub has_unresolved_alerts: bool,
    /// Environment match score against the current run, `[0,1]`.
    pub environment_match_score: f64,
}

/// Result of scoring a candidate baseline against a [`BaselineQualityPolicy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScore {
    /// Weighted-sum confidence in `[0,1]`.
    pub confidence: f64,
    /// Whether every configured minimum was independently met.
    pub passed: bool,
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Scores `signals` against `policy` (§4.3 "Baseline quality").
#[must_use]
pub fn score_baseline(signals: QualitySignals, policy: &BaselineQualityPolicy) -> QualityScore {
    #[allow(
        clippy::cast_precision_loss,
        reason = "sample counts fit comfortably in f64 mantissa for this ratio"
    )]
    let sample_size_score = if policy.min_sample_size == 0 {
        1.0
    } else {
        clamp01(signals.sample_size as f64 / policy.min_sample_size as f64)
    };

    let stability_score = if policy.max_coefficient_of_variation <= 0.0 {
        f64::from(u8::from(signals.coefficient_of_variation <= 0.0))
    } else {
        clamp01(1.0 - signals.coefficient_of_variation / policy.max_coefficient_of_variation)
    };

    let alerts_score = if signals.has_unresolved_alerts { 0.0 } else { 1.0 };

    let environment_score = if policy.min_environment_match_score <= 0.0 {
        1.0
    } else {
        clamp01(signals.environment_match_score / policy.min_environment_match_score)
    };

    let confidence = clamp01(
        policy.weights.sample_size * sample_size_score
            + policy.weights.stability * stability_score
            + policy.weights.no_alerts * alerts_score
            + policy.weights.environment_match * environment_score,
    );

    let passed = signals.sample_size >= policy.min_sample_size
        && signals.time_in_state_sec >= policy.min_time_in_state_sec
        && signals.coefficient_of_variation <= policy.max_coefficient_of_variation
        && (!policy.no_unresolved_alerts || !signals.has_unresolved_alerts)
        && signals.environment_match_score >= policy.min_environment_match_score;

    QualityScore { confidence, passed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing_signals() -> QualitySignals {
        QualitySignals {
            sample_size: 50,
            time_in_state_sec: 7_200,
            coefficient_of_variation: 0.1,
            has_unresolved_alerts: false,
            environment_match_score: 0.9,
        }
    }

    #[test]
    fn strong_signals_pass_with_high_confidence() {
        let score = score_baseline(passing_signals(), &BaselineQualityPolicy::default());
        assert!(score.passed);
        assert!(score.confidence > 0.8);
    }

    #[test]
    fn unresolved_alerts_fail_regardless_of_other_signals() {
        let mut signals = passing_signals();
        signals.has_unresolved_alerts = true;
        let score = score_baseline(signals, &BaselineQualityPolicy::default());
        assert!(!score.passed);
    }

    #[test]
    fn insufficient_sample_size_fails_minimum_even_with_good_confidence() {
        let mut signals = passing_signals();
        signals.sample_size = 2;
        let score = score_baseline(signals, &BaselineQualityPolicy::default());
        assert!(!score.passed);
    }

    #[test]
    fn confidence_is_always_clamped_to_unit_interval() {
        let mut signals = passing_signals();
        signals.sample_size = 10_000;
        signals.environment_match_score = 5.0;
        let score = score_baseline(signals, &BaselineQualityPolicy::default());
        assert!(score.confidence <= 1.0);
    }
}
