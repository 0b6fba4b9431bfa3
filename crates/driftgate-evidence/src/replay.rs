// crates/driftgate-evidence/src/replay.rs
// ============================================================================
// Module: Replay
// Description: Re-runs a comparison from a frozen input slice and baseline,
//              independent of any live daemon.
// Purpose: Implement C7's defensible-replay surface (§4.8).
// Dependencies: driftgate-core, driftgate-config, driftgate-store-sqlite
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/replay.py`'s `replay_decision` /
//! `_load_metrics_from_path`.
//!
//! Invariants:
//! - Replay never reads the wall clock or touches any daemon state; its
//!   only inputs are the paths (or run id) the caller supplies.
//! - The same input slice and config always reproduce the same status,
//!   mirroring `compare_metrics`'s determinism.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use driftgate_config::BaselinePolicy;
use driftgate_core::CompareOptions;
use driftgate_core::CompareOutcome;
use driftgate_core::MetricRegistry;
use driftgate_core::RawMetrics;
use driftgate_core::compare_metrics;
use driftgate_core::hash_bytes;
use driftgate_core::normalize_metrics;
use driftgate_store_sqlite::RunRegistry;

use crate::error::EvidenceError;
use crate::metrics_csv::read_metrics_csv;
use crate::metrics_csv::rows_to_raw_metrics;

/// A metric source for replay: a frozen file or an already-persisted run.
#[derive(Debug, Clone)]
pub enum MetricSource {
    /// `metrics_normalized.csv` or a directory containing one.
    Csv(PathBuf),
    /// Raw JSON object/array, as produced by older evidence packs.
    Json(PathBuf),
    /// A run already stored in the registry database.
    RunId(String),
}

/// Loads metrics from a path, resolving a bare directory to its
/// `metrics_normalized.csv` the way the original tool did.
///
/// # Errors
/// Returns [`EvidenceError::NotFound`] if a directory has no
/// `metrics_normalized.csv`, or the underlying read/parse error otherwise.
pub fn load_metrics_from_path(path: &Path) -> Result<RawMetrics, EvidenceError> {
    let resolved = if path.is_dir() {
        let csv_path = path.join("metrics_normalized.csv");
        if !csv_path.is_file() {
            return Err(EvidenceError::NotFound(format!("no metrics_normalized.csv in {}", path.display())));
        }
        csv_path
    } else {
        path.to_path_buf()
    };

    match resolved.extension().and_then(std::ffi::OsStr::to_str) {
        Some("json") => {
            let body = fs::read(&resolved).map_err(|source| EvidenceError::Io { path: resolved.display().to_string(), source })?;
            let value: serde_json::Value =
                serde_json::from_slice(&body).map_err(|source| EvidenceError::Json { path: resolved.display().to_string(), source })?;
            Ok(json_value_to_raw_metrics(&value))
        }
        _ => {
            let rows = read_metrics_csv(&resolved)?;
            Ok(rows_to_raw_metrics(&rows))
        }
    }
}

fn json_value_to_raw_metrics(value: &serde_json::Value) -> RawMetrics {
    let mut metrics = RawMetrics::new();
    match value {
        serde_json::Value::Array(rows) => {
            for row in rows {
                if let Some(metric) = row.get("metric").and_then(serde_json::Value::as_str) {
                    if let Some(v) = row.get("value") {
                        metrics.insert(metric.to_string(), v.clone());
                    }
                }
            }
        }
        serde_json::Value::Object(map) => {
            for (metric, entry) in map {
                let v = entry.get("value").cloned().unwrap_or_else(|| entry.clone());
                metrics.insert(metric.clone(), v);
            }
        }
        _ => {}
    }
    metrics
}

/// Resolves a baseline source, preferring the registry database (when a
/// `RunId` source and an open registry are both supplied) over a file path.
///
/// # Errors
/// Propagates store or file errors from the underlying lookup.
pub fn load_baseline(source: &MetricSource, registry: Option<&RunRegistry>) -> Result<RawMetrics, EvidenceError> {
    match source {
        MetricSource::RunId(run_id) => {
            if let Some(registry) = registry {
                let id = driftgate_core::RunId::new(run_id.clone());
                let metrics = registry.fetch_metrics(&id)?;
                if !metrics.is_empty() {
                    return Ok(metric_map_to_raw(&metrics));
                }
            }
            Err(EvidenceError::NotFound(format!("no baseline metrics for run {run_id}")))
        }
        MetricSource::Csv(path) | MetricSource::Json(path) => load_metrics_from_path(path),
    }
}

fn metric_map_to_raw(metrics: &driftgate_core::MetricMap) -> RawMetrics {
    let mut raw = RawMetrics::new();
    for (name, value) in metrics {
        if let Some(v) = value.value {
            raw.insert(name.clone(), serde_json::json!(v));
        }
    }
    raw
}

/// Reference to the config files a replay was evaluated against, so a
/// caller can confirm the replay used the same registry/policy as the
/// decision under verification.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReplayConfigRef {
    pub metric_registry_sha256: Option<String>,
    pub baseline_policy_sha256: Option<String>,
}

/// Result of replaying a decision: the recomputed outcome and the config
/// references it was evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayResult {
    pub outcome: CompareOutcome,
    pub config_ref: ReplayConfigRef,
}

/// Re-runs `compare_metrics` over a frozen input slice and baseline,
/// independent of any daemon state.
///
/// # Errors
/// Propagates I/O, parse, or store errors from loading the slice, baseline,
/// or config files.
pub fn replay_decision(
    input_slice: &MetricSource,
    baseline: &MetricSource,
    registry: &MetricRegistry,
    registry_path: Option<&Path>,
    baseline_policy: Option<&BaselinePolicy>,
    baseline_policy_path: Option<&Path>,
    run_registry: Option<&RunRegistry>,
) -> Result<ReplayResult, EvidenceError> {
    let current_raw = match input_slice {
        MetricSource::RunId(run_id) => load_baseline(&MetricSource::RunId(run_id.clone()), run_registry)?,
        MetricSource::Csv(path) | MetricSource::Json(path) => load_metrics_from_path(path)?,
    };
    let baseline_raw = load_baseline(baseline, run_registry)?;

    let (current, _current_warnings) = normalize_metrics(&current_raw, registry);
    let (baseline_map, _baseline_warnings) = normalize_metrics(&baseline_raw, registry);

    let options = CompareOptions {
        distribution_enabled: baseline_policy.map_or(true, |policy| policy.distribution_drift_enabled),
        ..CompareOptions::default()
    };
    let outcome = compare_metrics(&current, &baseline_map, registry, options);

    let config_ref = ReplayConfigRef {
        metric_registry_sha256: registry_path.and_then(|p| file_hash(p).ok()),
        baseline_policy_sha256: baseline_policy_path.and_then(|p| file_hash(p).ok()),
    };

    Ok(ReplayResult { outcome, config_ref })
}

fn file_hash(path: &Path) -> Result<String, EvidenceError> {
    let bytes = fs::read(path).map_err(|source| EvidenceError::Io { path: path.display().to_string(), source })?;
    Ok(hash_bytes(&bytes))
}

/// Builds the combined config hash a decision record would carry for the
/// registry/policy pair a replay was evaluated against.
#[must_use]
pub fn combined_config_hash(config_ref: &ReplayConfigRef) -> String {
    let mut hashes = BTreeMap::new();
    if let Some(h) = &config_ref.metric_registry_sha256 {
        hashes.insert("metric_registry".to_string(), h.clone());
    }
    if let Some(h) = &config_ref.baseline_policy_sha256 {
        hashes.insert("baseline_policy".to_string(), h.clone());
    }
    driftgate_core::core::hashing::config_hash(&hashes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> MetricRegistry {
        let yaml = "version: \"1.0\"\nmetrics:\n  error_rate:\n    rule: critical\n    warn_threshold: 0.01\n    fail_threshold: 0.05\n";
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("metric_registry.yaml");
        fs::write(&path, yaml).expect("write registry");
        driftgate_config::metric_registry::load(path.to_str().expect("utf8 path")).expect("load registry")
    }

    #[test]
    fn replay_decision_reproduces_same_status_for_same_inputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let current_path = dir.path().join("current.csv");
        let baseline_path = dir.path().join("baseline.csv");
        fs::write(&current_path, "metric,value,unit,tags\nerror_rate,0.1,,{}\n").expect("write current");
        fs::write(&baseline_path, "metric,value,unit,tags\nerror_rate,0.01,,{}\n").expect("write baseline");

        let registry = sample_registry();
        let result = replay_decision(
            &MetricSource::Csv(current_path),
            &MetricSource::Csv(baseline_path),
            &registry,
            None,
            None,
            None,
            None,
        )
        .expect("replay");

        assert_eq!(result.outcome.status, driftgate_core::RunStatus::Fail);
    }

    #[test]
    fn replay_decision_honors_distribution_drift_enabled_false() {
        let dir = tempfile::tempdir().expect("tempdir");
        let current_path = dir.path().join("current.csv");
        let baseline_path = dir.path().join("baseline.csv");
        fs::write(&current_path, "metric,value,unit,tags\nerror_rate,0.01,,{}\n").expect("write current");
        fs::write(&baseline_path, "metric,value,unit,tags\nerror_rate,0.01,,{}\n").expect("write baseline");

        let registry = sample_registry();
        let policy = BaselinePolicy { distribution_drift_enabled: false, ..BaselinePolicy::default() };
        let result = replay_decision(
            &MetricSource::Csv(current_path),
            &MetricSource::Csv(baseline_path),
            &registry,
            None,
            Some(&policy),
            None,
            None,
        )
        .expect("replay");

        assert_eq!(result.outcome.status, driftgate_core::RunStatus::Pass);
    }

    #[test]
    fn load_metrics_from_path_resolves_directory_to_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("metrics_normalized.csv"), "metric,value,unit,tags\nerror_rate,0.02,,{}\n").expect("write");
        let metrics = load_metrics_from_path(dir.path()).expect("load");
        assert_eq!(metrics.get("error_rate"), Some(&serde_json::json!(0.02)));
    }

    #[test]
    fn load_metrics_from_path_rejects_directory_without_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_metrics_from_path(dir.path()).unwrap_err();
        assert!(matches!(err, EvidenceError::NotFound(_)));
    }
}
