// crates/driftgate-core/src/runtime/compare.rs
// ============================================================================
// Module: Decision Engine
// Description: Compares a normalized current metric map against a baseline,
//              applying invariants, criticality, drift, distribution-drift,
//              and attribution rules.
// Purpose: The single load-bearing decision function every other component
//          (streaming, action, evidence) builds on.
// Dependencies: crate::core, crate::runtime::attribution
// ============================================================================

//! ## Overview
//! `compare_metrics` is pure: no I/O, no wall-clock reads, no shared mutable
//! state (§5). Given the same `(current, baseline, registry, options)` it
//! returns byte-identical output (§8 Invariant 1).
//!
//! Invariants:
//! - `drift[]` is sorted by `|delta|` descending, ties broken by canonical
//!   name ascending.
//! - `attribution[]` is sorted by `|score|` descending, ties broken by name.
//! - All other sets are emitted in canonical-name order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::model::MetricMap;
use crate::core::model::RunStatus;
use crate::core::registry::MetricRegistry;
use crate::runtime::attribution::Attribution;
use crate::runtime::attribution::EffectSize;
use crate::runtime::attribution::confidence_from_count;
use crate::runtime::attribution::onset_and_evidence;
use crate::runtime::attribution::pearson_corr;
use crate::runtime::attribution::stats_from_samples;
use crate::runtime::attribution::zscore;
use crate::runtime::attribution::CORRELATION_CUTOFF;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Options controlling a single `compare_metrics` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOptions {
    /// Whether the KS distribution-drift test runs at all.
    pub distribution_enabled: bool,
    /// Forces fully sorted iteration everywhere (always effectively `true`;
    /// kept for interface parity with the `HB_DETERMINISTIC` toggle).
    pub deterministic: bool,
    /// When `true`, stop scanning metrics as soon as a safety-critical
    /// metric lands in `fail[]`, skipping attribution for the remainder.
    pub early_exit: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            distribution_enabled: true,
            deterministic: true,
            early_exit: false,
        }
    }
}

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// A single drifted metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEntry {
    /// Canonical metric name.
    pub metric: String,
    /// Baseline value.
    pub baseline: f64,
    /// Current value.
    pub current: f64,
    /// `current - baseline`.
    pub delta: f64,
    /// `100 * delta / baseline`, or `None` if baseline is zero.
    pub percent_change: Option<f64>,
    /// Configured absolute drift threshold.
    pub drift_threshold: Option<f64>,
    /// Configured relative drift percent threshold.
    pub drift_percent: Option<f64>,
    /// Configured hysteresis floor.
    pub min_effect: Option<f64>,
    /// Unit of the value (current's unit, falling back to baseline's).
    pub unit: Option<String>,
    /// `"FAIL"` if this metric is also in `fail[]`, else `"DRIFT"`.
    pub severity: &'static str,
}

/// An invariant violation on the current value of a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantViolation {
    /// Canonical metric name.
    pub metric: String,
    /// Current value that violated the invariant.
    pub current: f64,
    /// Configured `invariant_min`, if any.
    pub invariant_min: Option<f64>,
    /// Configured `invariant_max`, if any.
    pub invariant_max: Option<f64>,
    /// Configured `invariant_eq`, if any.
    pub invariant_eq: Option<f64>,
}

/// A distribution-drift (KS test) finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionDrift {
    /// Canonical metric name.
    pub metric: String,
    /// Test method; currently always `"ks"`.
    pub method: &'static str,
    /// Observed KS statistic.
    pub statistic: f64,
    /// Configured threshold that was exceeded.
    pub threshold: f64,
    /// Number of samples in the current set.
    pub sample_count_current: usize,
    /// Number of samples in the baseline set.
    pub sample_count_baseline: usize,
}

/// The full output of a single `compare_metrics` call (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareOutcome {
    /// Overall status (§4.4 "Status rule").
    pub status: RunStatus,
    /// Drifted metrics, sorted by `|delta|` descending.
    pub drift: Vec<DriftEntry>,
    /// Sorted, deduplicated warnings.
    pub warnings: Vec<String>,
    /// Canonical names of metrics that failed (invariant or critical).
    pub fail: Vec<String>,
    /// Invariant violations.
    pub invariants: Vec<InvariantViolation>,
    /// Distribution-drift findings.
    pub dist_drifts: Vec<DistributionDrift>,
    /// Attribution entries, sorted by `|score|` descending.
    pub attribution: Vec<Attribution>,
}

// ============================================================================
// SECTION: Kolmogorov-Smirnov Statistic
// ============================================================================

/// Computes the two-sample KS statistic `D = max_t |F_a(t) - F_b(t)|` via a
/// merge scan over sorted samples.
#[must_use]
pub fn ks_statistic(sample_a: &[f64], sample_b: &[f64]) -> Option<f64> {
    if sample_a.is_empty() || sample_b.is_empty() {
        return None;
    }
    let mut a = sample_a.to_vec();
    let mut b = sample_b.to_vec();
    a.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    b.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));

    let (n, m) = (a.len(), b.len());
    let (mut i, mut j) = (0usize, 0usize);
    let mut d = 0.0_f64;
    while i < n && j < m {
        if a[i] <= b[j] {
            i += 1;
        } else {
            j += 1;
        }
        let cdf_a = i as f64 / n as f64;
        let cdf_b = j as f64 / m as f64;
        d = d.max((cdf_a - cdf_b).abs());
    }
    Some(d)
}

// ============================================================================
// SECTION: compare_metrics
// ============================================================================

/// Compares `current` against `baseline` metric-by-metric (§4.4).
#[must_use]
#[allow(clippy::too_many_lines, reason = "mirrors a single cohesive decision pipeline, grounded on the original engine")]
pub fn compare_metrics(
    current: &MetricMap,
    baseline: &MetricMap,
    registry: &MetricRegistry,
    options: CompareOptions,
) -> CompareOutcome {
    let mut drift = Vec::new();
    let mut warnings = Vec::new();
    let mut fail = Vec::new();
    let mut invariants = Vec::new();
    let mut dist_drifts = Vec::new();
    let mut attribution = Vec::new();

    let mut all_metrics: Vec<&String> = current.keys().chain(baseline.keys()).collect();
    all_metrics.sort();
    all_metrics.dedup();

    for metric in all_metrics {
        let config = registry.get(metric).cloned().unwrap_or_default();
        let cur = current.get(metric);
        let base = baseline.get(metric);

        // Step a: missing current.
        let Some(cur_value) = cur.and_then(|c| c.value) else {
            warnings.push(format!("missing current metric: {metric}"));
            continue;
        };

        // Step b: invariants on current.
        let mut violated = false;
        if let Some(eq) = config.invariant_eq {
            if (cur_value - eq).abs() > f64::EPSILON {
                violated = true;
            }
        }
        if let Some(min) = config.invariant_min {
            if cur_value < min {
                violated = true;
            }
        }
        if let Some(max) = config.invariant_max {
            if cur_value > max {
                violated = true;
            }
        }
        if violated {
            invariants.push(InvariantViolation {
                metric: metric.clone(),
                current: cur_value,
                invariant_min: config.invariant_min,
                invariant_max: config.invariant_max,
                invariant_eq: config.invariant_eq,
            });
            fail.push(metric.clone());
        }

        // Step c: criticality on current.
        if config.critical {
            let breaches = match config.fail_threshold {
                None => cur_value > 0.0,
                Some(threshold) => cur_value > threshold,
            };
            if breaches {
                fail.push(metric.clone());
            }
        }

        if options.early_exit && config.critical && fail.contains(metric) {
            break;
        }

        // Step d: missing baseline.
        let Some(base_value) = base.and_then(|b| b.value) else {
            warnings.push(format!("missing baseline metric: {metric}"));
            continue;
        };

        // Step e: drift decision.
        let delta = cur_value - base_value;
        let percent = (base_value != 0.0).then(|| (delta / base_value) * 100.0);

        let mut is_drift = false;
        if let Some(threshold) = config.drift_threshold {
            if delta.abs() > threshold {
                is_drift = true;
            }
        }
        if let Some(drift_percent_cfg) = config.drift_percent {
            if let Some(p) = percent {
                if p.abs() > drift_percent_cfg {
                    is_drift = true;
                }
            }
        }
        if is_drift {
            if let Some(min_effect) = config.min_effect {
                if delta.abs() < min_effect {
                    is_drift = false;
                }
            }
        }

        let is_fail = fail.contains(metric);
        if is_drift {
            drift.push(DriftEntry {
                metric: metric.clone(),
                baseline: base_value,
                current: cur_value,
                delta,
                percent_change: percent,
                drift_threshold: config.drift_threshold,
                drift_percent: config.drift_percent,
                min_effect: config.min_effect,
                unit: cur.and_then(|c| c.unit.clone()).or_else(|| base.and_then(|b| b.unit.clone())),
                severity: if is_fail { "FAIL" } else { "DRIFT" },
            });
        }

        // Step f: distribution drift.
        let mut is_dist_drift = false;
        if options.distribution_enabled {
            if let Some(dist_cfg) = &config.distribution_drift {
                let cur_samples = cur.and_then(crate::core::model::MetricValue::samples);
                let base_samples = base.and_then(crate::core::model::MetricValue::samples);
                if let (Some(cur_samples), Some(base_samples)) = (&cur_samples, &base_samples) {
                    if let Some(statistic) = ks_statistic(cur_samples, base_samples) {
                        if statistic > dist_cfg.ks_threshold {
                            is_dist_drift = true;
                            dist_drifts.push(DistributionDrift {
                                metric: metric.clone(),
                                method: "ks",
                                statistic,
                                threshold: dist_cfg.ks_threshold,
                                sample_count_current: cur_samples.len(),
                                sample_count_baseline: base_samples.len(),
                            });
                        }
                    }
                }
            }
        }

        // Step g: attribution, for any metric flagged by drift, fail, or distribution drift.
        if is_drift || is_fail || is_dist_drift {
            if let Some(entry) = build_attribution(metric, &config, cur, base, delta, percent, base_value) {
                attribution.push(entry);
            }
        }
    }

    let status = if !fail.is_empty() {
        RunStatus::Fail
    } else if !drift.is_empty() || !dist_drifts.is_empty() {
        RunStatus::PassWithDrift
    } else if current.is_empty() && baseline.is_empty() {
        RunStatus::NoMetrics
    } else {
        RunStatus::Pass
    };

    warnings.sort();
    warnings.dedup();

    drift.sort_by(|a, b| {
        b.delta
            .abs()
            .partial_cmp(&a.delta.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.metric.cmp(&b.metric))
    });

    attribution.sort_by(|a, b| {
        b.score
            .abs()
            .partial_cmp(&a.score.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.metric.cmp(&b.metric))
    });

    CompareOutcome {
        status,
        drift,
        warnings,
        fail,
        invariants,
        dist_drifts,
        attribution,
    }
}

fn build_attribution(
    metric: &str,
    config: &crate::core::registry::MetricConfig,
    cur: Option<&crate::core::model::MetricValue>,
    base: Option<&crate::core::model::MetricValue>,
    delta: f64,
    percent: Option<f64>,
    base_value: f64,
) -> Option<Attribution> {
    let cur_value = cur?.value?;
    let cur_samples = cur.and_then(crate::core::model::MetricValue::samples);
    let base_samples = base.and_then(crate::core::model::MetricValue::samples);

    let baseline_stats = stats_from_samples(base_samples.as_deref(), Some(base_value))?;
    let current_stats = stats_from_samples(cur_samples.as_deref(), Some(cur_value))?;

    let z = zscore(delta, baseline_stats.std);
    let confidence = confidence_from_count(current_stats.count);

    let samples_for_onset = cur_samples.clone().unwrap_or_else(|| vec![cur_value]);
    let drift_scores: Vec<f64> = samples_for_onset
        .iter()
        .map(|v| {
            z.map_or_else(
                || v - baseline_stats.mean,
                |_| zscore(v - baseline_stats.mean, baseline_stats.std).unwrap_or(v - baseline_stats.mean),
            )
        })
        .collect();
    let threshold = config.drift_threshold.unwrap_or(0.0).max(config.min_effect.unwrap_or(0.0));
    let onset = onset_and_evidence(&samples_for_onset, &drift_scores, threshold, config.drift_persistence);

    let raw_corr = pearson_corr(&samples_for_onset, &drift_scores);
    let (raw_feature_correlation, correlation_note) = match raw_corr {
        Some(r) if r.abs() >= CORRELATION_CUTOFF => (Some(r), None),
        _ => (None, Some("low attribution confidence".to_string())),
    };

    let score = z.unwrap_or(delta);

    Some(Attribution {
        metric: metric.to_string(),
        effect_size: EffectSize { delta, percent, zscore: z },
        baseline_stats,
        current_stats,
        confidence,
        onset,
        raw_feature_correlation,
        correlation_note,
        score,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::core::model::MetricValue;
    use crate::core::registry::MetricConfig;

    fn single_metric_registry(name: &str, config: MetricConfig) -> MetricRegistry {
        let mut metrics = BTreeMap::new();
        metrics.insert(name.to_string(), config);
        MetricRegistry::new("1.0", metrics)
    }

    fn metric(value: f64) -> MetricValue {
        MetricValue { value: Some(value), unit: None, tags: None }
    }

    // S1 — PASS.
    #[test]
    fn s1_pass_when_within_threshold() {
        let registry = single_metric_registry("m1", MetricConfig { drift_threshold: Some(1.0), ..MetricConfig::default() });
        let current = MetricMap::from([("m1".to_string(), metric(10.0))]);
        let baseline = MetricMap::from([("m1".to_string(), metric(10.0))]);
        let outcome = compare_metrics(&current, &baseline, &registry, CompareOptions::default());
        assert_eq!(outcome.status, RunStatus::Pass);
        assert!(outcome.drift.is_empty());
    }

    // S2 — DRIFT by absolute.
    #[test]
    fn s2_drift_by_absolute_threshold() {
        let registry = single_metric_registry("m1", MetricConfig { drift_threshold: Some(1.0), ..MetricConfig::default() });
        let current = MetricMap::from([("m1".to_string(), metric(12.0))]);
        let baseline = MetricMap::from([("m1".to_string(), metric(10.0))]);
        let outcome = compare_metrics(&current, &baseline, &registry, CompareOptions::default());
        assert_eq!(outcome.status, RunStatus::PassWithDrift);
        assert_eq!(outcome.drift[0].metric, "m1");
        assert!((outcome.drift[0].delta - 2.0).abs() < 1e-9);
    }

    // S3 — DRIFT suppressed by min_effect.
    #[test]
    fn s3_min_effect_suppresses_small_drift() {
        let registry = single_metric_registry(
            "m1",
            MetricConfig { drift_threshold: Some(0.5), min_effect: Some(5.0), ..MetricConfig::default() },
        );
        let current = MetricMap::from([("m1".to_string(), metric(10.6))]);
        let baseline = MetricMap::from([("m1".to_string(), metric(10.0))]);
        let outcome = compare_metrics(&current, &baseline, &registry, CompareOptions::default());
        assert_eq!(outcome.status, RunStatus::Pass);
    }

    // S4 — Critical FAIL.
    #[test]
    fn s4_critical_metric_fails_above_zero() {
        let registry = single_metric_registry("reset_count", MetricConfig { critical: true, ..MetricConfig::default() });
        let current = MetricMap::from([("reset_count".to_string(), metric(1.0))]);
        let baseline = MetricMap::from([("reset_count".to_string(), metric(0.0))]);
        let outcome = compare_metrics(&current, &baseline, &registry, CompareOptions::default());
        assert_eq!(outcome.status, RunStatus::Fail);
        assert_eq!(outcome.fail, vec!["reset_count".to_string()]);
    }

    // S5 — KS distribution drift.
    #[test]
    fn s5_ks_distribution_drift() {
        let registry = single_metric_registry(
            "x",
            MetricConfig {
                distribution_drift: Some(crate::core::registry::DistributionDriftConfig { ks_threshold: 0.3 }),
                ..MetricConfig::default()
            },
        );
        let baseline_samples: Vec<f64> = (1..=100).map(f64::from).collect();
        let current_samples: Vec<f64> = (51..=150).map(f64::from).collect();
        let current = MetricMap::from([(
            "x".to_string(),
            MetricValue { value: Some(100.0), unit: None, tags: Some(serde_json::json!({"samples": current_samples})) },
        )]);
        let baseline = MetricMap::from([(
            "x".to_string(),
            MetricValue { value: Some(50.0), unit: None, tags: Some(serde_json::json!({"samples": baseline_samples})) },
        )]);
        let outcome = compare_metrics(&current, &baseline, &registry, CompareOptions::default());
        assert_eq!(outcome.status, RunStatus::PassWithDrift);
        assert!((outcome.dist_drifts[0].statistic - 0.5).abs() < 1e-9);
        assert!(outcome.drift.is_empty(), "no absolute/percent threshold configured for this metric");
        assert_eq!(outcome.attribution.len(), 1, "a KS-only drift must still be attributed");
        assert_eq!(outcome.attribution[0].metric, "x");
    }

    #[test]
    fn missing_current_emits_warning_and_skips() {
        let registry = single_metric_registry("m1", MetricConfig { drift_threshold: Some(1.0), ..MetricConfig::default() });
        let current = MetricMap::new();
        let baseline = MetricMap::from([("m1".to_string(), metric(10.0))]);
        let outcome = compare_metrics(&current, &baseline, &registry, CompareOptions::default());
        assert_eq!(outcome.warnings, vec!["missing current metric: m1".to_string()]);
        assert_eq!(outcome.status, RunStatus::Pass);
    }

    #[test]
    fn drift_sorted_descending_by_absolute_delta_with_name_tiebreak() {
        let registry = {
            let mut metrics = BTreeMap::new();
            metrics.insert("a".to_string(), MetricConfig { drift_threshold: Some(0.1), ..MetricConfig::default() });
            metrics.insert("b".to_string(), MetricConfig { drift_threshold: Some(0.1), ..MetricConfig::default() });
            MetricRegistry::new("1.0", metrics)
        };
        let current = MetricMap::from([("a".to_string(), metric(11.0)), ("b".to_string(), metric(15.0))]);
        let baseline = MetricMap::from([("a".to_string(), metric(10.0)), ("b".to_string(), metric(10.0))]);
        let outcome = compare_metrics(&current, &baseline, &registry, CompareOptions::default());
        assert_eq!(outcome.drift[0].metric, "b");
        assert_eq!(outcome.drift[1].metric, "a");
    }
}
