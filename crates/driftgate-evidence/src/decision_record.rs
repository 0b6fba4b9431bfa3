// crates/driftgate-evidence/src/decision_record.rs
// ============================================================================
// Module: Decision Record
// Description: Builds and writes the canonical decision record artifact.
// Purpose: Implement C7's decision-record half (§4.7).
// Dependencies: driftgate-core, serde_json
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/decision_record.py`'s
//! `build_decision_record`/`write_decision_record`.
//!
//! Invariants:
//! - `config_hash` is always the SHA-256 over the **sorted** map of config
//!   file hashes (`driftgate_core::core::hashing::config_hash`), never a
//!   single file's digest.
//! - Written files are never overwritten in place with a partial write; the
//!   record is serialized in full before any bytes reach disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use driftgate_core::CorrelationId;
use driftgate_core::DecisionId;
use driftgate_core::DecisionRecord;
use driftgate_core::RunId;
use driftgate_core::RunStatus;
use driftgate_core::DECISION_RECORD_SCHEMA_VERSION;
use driftgate_core::core::hashing::config_hash;

use crate::error::EvidenceError;

/// Inputs to [`build_decision_record`], gathered at decision time from the
/// engine's `CompareOutcome` and the triggering action proposal.
#[derive(Debug, Clone)]
pub struct DecisionRecordInput {
    /// Unique decision identifier.
    pub decision_id: DecisionId,
    /// Run this decision was made for.
    pub run_id: RunId,
    /// Resulting status.
    pub status: RunStatus,
    /// Decision confidence, if computed.
    pub confidence: Option<f64>,
    /// Baseline confidence, if computed.
    pub baseline_confidence: Option<f64>,
    /// Canonical names of metrics that triggered the decision.
    pub trigger_metrics: Vec<String>,
    /// Action type requested as a result of this decision, if any.
    pub action_requested: Option<String>,
    /// Whether the requested action was allowed.
    pub action_allowed: bool,
    /// Human-readable reason.
    pub reason: String,
    /// Policy version in effect.
    pub policy_version: Option<String>,
    /// Config file hashes, keyed by config label (e.g. `"metric_registry"`).
    pub config_hashes: BTreeMap<String, String>,
    /// Path or URI of the evidence bundle for this decision.
    pub evidence_ref: Option<String>,
    /// Baseline run used for comparison, if any.
    pub baseline_run_id: Option<RunId>,
    /// Correlation identifier threaded from the triggering event.
    pub correlation_id: Option<CorrelationId>,
}

/// Builds the canonical decision record (§4.7 "Decision record").
#[must_use]
pub fn build_decision_record(input: DecisionRecordInput, ts_utc: String) -> DecisionRecord {
    DecisionRecord {
        schema_version: DECISION_RECORD_SCHEMA_VERSION.to_string(),
        decision_id: input.decision_id,
        timestamp: ts_utc,
        status: input.status,
        confidence: input.confidence,
        baseline_confidence: input.baseline_confidence,
        trigger_metrics: input.trigger_metrics,
        action_requested: input.action_requested,
        action_allowed: input.action_allowed,
        reason: input.reason,
        policy_version: input.policy_version,
        config_hash: config_hash(&input.config_hashes),
        evidence_ref: input.evidence_ref,
        run_id: input.run_id,
        baseline_run_id: input.baseline_run_id,
        correlation_id: input.correlation_id,
    }
}

/// Writes `record` to `<report_dir>/decision_record.json`, creating
/// `report_dir` if needed. Returns the path written.
///
/// # Errors
/// Returns [`EvidenceError::Io`] if the directory or file cannot be written,
/// or [`EvidenceError::Json`] if serialization fails.
pub fn write_decision_record(report_dir: &Path, record: &DecisionRecord) -> Result<PathBuf, EvidenceError> {
    fs::create_dir_all(report_dir).map_err(|source| EvidenceError::Io { path: report_dir.display().to_string(), source })?;
    let out_path = report_dir.join("decision_record.json");
    let body = serde_json::to_vec_pretty(record).map_err(|source| EvidenceError::Json { path: out_path.display().to_string(), source })?;
    fs::write(&out_path, body).map_err(|source| EvidenceError::Io { path: out_path.display().to_string(), source })?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use driftgate_core::RunId;

    use super::*;

    fn sample_input() -> DecisionRecordInput {
        let mut hashes = BTreeMap::new();
        hashes.insert("metric_registry".to_string(), "abc123".to_string());
        DecisionRecordInput {
            decision_id: DecisionId::new("dec-1"),
            run_id: RunId::new("run-1"),
            status: RunStatus::Fail,
            confidence: Some(0.9),
            baseline_confidence: Some(0.8),
            trigger_metrics: vec!["latency_p99_ms".to_string()],
            action_requested: Some("shutdown".to_string()),
            action_allowed: false,
            reason: "invariant violated".to_string(),
            policy_version: Some("1.0".to_string()),
            config_hashes: hashes,
            evidence_ref: None,
            baseline_run_id: Some(RunId::new("run-0")),
            correlation_id: None,
        }
    }

    #[test]
    fn build_decision_record_hashes_sorted_config_map() {
        let record = build_decision_record(sample_input(), "2026-07-28T00:00:00Z".to_string());
        assert_eq!(record.schema_version, "1.0");
        assert_eq!(record.status, RunStatus::Fail);
        assert!(!record.config_hash.is_empty());
    }

    #[test]
    fn write_decision_record_creates_report_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("run-1");
        let record = build_decision_record(sample_input(), "2026-07-28T00:00:00Z".to_string());
        let out_path = write_decision_record(&nested, &record).expect("write");
        assert!(out_path.is_file());
        let loaded: DecisionRecord = serde_json::from_slice(&fs::read(&out_path).expect("read")).expect("parse");
        assert_eq!(loaded, record);
    }
}
