// crates/driftgate-daemon/src/report.rs
// ============================================================================
// Module: Drift Report
// Description: Builds and writes the stable `drift_report.json` artifact.
// Purpose: Implement the report shape fixed by spec.md §6 "File formats".
// Dependencies: driftgate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/daemon.py`'s `report_payload` dict and
//! `original_source/hb/report.py::write_report`.
//!
//! Invariants:
//! - Field names and shape match spec.md §6 exactly; this is a stable,
//!   externally consumed file format.
//! - `top_drifts` is capped at the first ten entries of `drift_metrics`,
//!   already sorted by `|delta|` descending by `compare_metrics`.

use std::path::Path;

use serde::Serialize;

use driftgate_core::Attribution;
use driftgate_core::CompareOutcome;
use driftgate_core::DistributionDrift;
use driftgate_core::DriftEntry;
use driftgate_core::InvariantViolation;
use driftgate_core::RunId;
use driftgate_core::RunStatus;

use crate::error::DaemonError;

const TOP_DRIFTS_LIMIT: usize = 10;

/// Attribution summary embedded in the drift report (§6).
#[derive(Debug, Clone, Serialize)]
pub struct DriftAttributionSummary {
    /// Attribution entries, sorted by `|score|` descending.
    pub top_drivers: Vec<Attribution>,
}

/// The stable drift report artifact (§6 "Drift report JSON").
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    /// Run this report was produced for.
    pub run_id: RunId,
    /// Overall status.
    pub status: RunStatus,
    /// Baseline run compared against, if one was selected.
    pub baseline_run_id: Option<RunId>,
    /// Why that baseline (or none) was selected.
    pub baseline_reason: String,
    /// Warning surfaced during baseline selection, if any.
    pub baseline_warning: Option<String>,
    /// Drifted metrics, sorted by `|delta|` descending.
    pub drift_metrics: Vec<DriftEntry>,
    /// The first ten entries of `drift_metrics`.
    pub top_drifts: Vec<DriftEntry>,
    /// Distribution-drift findings.
    pub distribution_drifts: Vec<DistributionDrift>,
    /// Attribution summary.
    pub drift_attribution: DriftAttributionSummary,
    /// Non-fatal warnings collected during normalization and comparison.
    pub warnings: Vec<String>,
    /// Canonical names of metrics that failed.
    pub fail_metrics: Vec<String>,
    /// Invariant violations.
    pub invariant_violations: Vec<InvariantViolation>,
}

impl DriftReport {
    /// Builds a report from a cycle's compare outcome and baseline
    /// selection.
    #[must_use]
    pub fn from_outcome(
        run_id: RunId,
        outcome: &CompareOutcome,
        baseline_run_id: Option<RunId>,
        baseline_reason: String,
        baseline_warning: Option<String>,
        warnings: Vec<String>,
    ) -> Self {
        let top_drifts = outcome.drift.iter().take(TOP_DRIFTS_LIMIT).cloned().collect();
        Self {
            run_id,
            status: outcome.status,
            baseline_run_id,
            baseline_reason,
            baseline_warning,
            drift_metrics: outcome.drift.clone(),
            top_drifts,
            distribution_drifts: outcome.dist_drifts.clone(),
            drift_attribution: DriftAttributionSummary { top_drivers: outcome.attribution.clone() },
            warnings,
            fail_metrics: outcome.fail.clone(),
            invariant_violations: outcome.invariants.clone(),
        }
    }
}

/// Writes `report` as `drift_report.json` under `report_dir`, creating the
/// directory if needed.
///
/// # Errors
/// Returns [`DaemonError`] on a write or serialization failure.
pub fn write_report(report_dir: &Path, report: &DriftReport) -> Result<(), DaemonError> {
    std::fs::create_dir_all(report_dir).map_err(|source| DaemonError::Io { path: report_dir.display().to_string(), source })?;
    let path = report_dir.join("drift_report.json");
    let bytes = serde_json::to_vec_pretty(report).map_err(|source| DaemonError::Json { path: path.display().to_string(), source })?;
    std::fs::write(&path, bytes).map_err(|source| DaemonError::Io { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftgate_core::CompareOptions;
    use driftgate_core::MetricMap;
    use driftgate_core::MetricRegistry;

    #[test]
    fn writes_a_report_file_that_round_trips_through_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = MetricRegistry::new("1", std::collections::BTreeMap::new());
        let outcome = driftgate_core::compare_metrics(&MetricMap::new(), &MetricMap::new(), &registry, CompareOptions::default());
        let report = DriftReport::from_outcome(RunId::new("run-1"), &outcome, None, "no_runs".to_string(), None, Vec::new());
        write_report(dir.path(), &report).expect("write");

        let bytes = std::fs::read(dir.path().join("drift_report.json")).expect("read back");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("parse");
        assert_eq!(value["run_id"], serde_json::json!("run-1"));
        assert_eq!(value["baseline_reason"], serde_json::json!("no_runs"));
    }
}
