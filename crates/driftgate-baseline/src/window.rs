// crates/driftgate-baseline/src/window.rs
// ============================================================================
// Module: Window-Based Baseline Creation
// Description: Aggregates a trailing window of runs into a synthetic
//              baseline run via per-metric median.
// Purpose: Make concrete the "simple statistical rule" Non-goal in spec.md
//          §4.3 ("does not learn baselines... aggregated by a simple
//          statistical rule").
// Dependencies: driftgate-core
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/baseline.py`'s
//! `create_baseline_from_window`/`_aggregate_metrics`: per-metric median
//! across every run in the window, with `unit`/`tags` carried from the
//! first run in the window that defines that metric.

use driftgate_core::MetricMap;
use driftgate_core::MetricValue;

use crate::error::BaselineError;

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Aggregates `runs` (each a metric map from one run in the window) into a
/// single synthetic baseline metric map via per-metric median.
///
/// # Errors
/// Returns [`BaselineError::EmptyWindow`] if `runs` is empty.
pub fn aggregate_window(runs: &[MetricMap]) -> Result<MetricMap, BaselineError> {
    if runs.is_empty() {
        return Err(BaselineError::EmptyWindow);
    }

    let mut result = MetricMap::new();
    let mut metric_names: Vec<&str> = runs.iter().flat_map(MetricMap::keys).map(String::as_str).collect();
    metric_names.sort_unstable();
    metric_names.dedup();

    for name in metric_names {
        let values: Vec<f64> = runs.iter().filter_map(|run| run.get(name)?.value).collect();
        if values.is_empty() {
            continue;
        }
        let first_defining = runs.iter().find_map(|run| run.get(name));
        let unit = first_defining.and_then(|v| v.unit.clone());
        let tags = first_defining.and_then(|v| v.tags.clone());
        result.insert(name.to_string(), MetricValue { value: Some(median(values)), unit, tags });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(value: f64) -> MetricValue {
        MetricValue { value: Some(value), unit: Some("ms".to_string()), tags: None }
    }

    #[test]
    fn aggregates_odd_count_via_middle_value() {
        let runs = vec![
            MetricMap::from([("latency_ms".to_string(), metric(10.0))]),
            MetricMap::from([("latency_ms".to_string(), metric(20.0))]),
            MetricMap::from([("latency_ms".to_string(), metric(30.0))]),
        ];
        let aggregated = aggregate_window(&runs).expect("aggregate");
        assert_eq!(aggregated["latency_ms"].value, Some(20.0));
    }

    #[test]
    fn aggregates_even_count_via_average_of_middle_two() {
        let runs = vec![
            MetricMap::from([("latency_ms".to_string(), metric(10.0))]),
            MetricMap::from([("latency_ms".to_string(), metric(20.0))]),
        ];
        let aggregated = aggregate_window(&runs).expect("aggregate");
        assert_eq!(aggregated["latency_ms"].value, Some(15.0));
    }

    #[test]
    fn metrics_missing_from_some_runs_are_aggregated_from_those_present() {
        let runs = vec![
            MetricMap::from([("a".to_string(), metric(1.0)), ("b".to_string(), metric(5.0))]),
            MetricMap::from([("a".to_string(), metric(3.0))]),
        ];
        let aggregated = aggregate_window(&runs).expect("aggregate");
        assert_eq!(aggregated["a"].value, Some(2.0));
        assert_eq!(aggregated["b"].value, Some(5.0));
    }

    #[test]
    fn empty_window_is_an_error() {
        let err = aggregate_window(&[]).expect_err("should error");
        assert!(matches!(err, BaselineError::EmptyWindow));
    }
}
