// crates/driftgate-evidence/src/verify.rs
// ============================================================================
// Module: Verify Decision
// Description: Independent re-verification of a decision record against an
//              evidence pack.
// Purpose: Implement C7's auditor-facing `verify-decision` surface (§4.8).
// Dependencies: driftgate-core, driftgate-config
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/verify_decision.py`'s `verify_decision` /
//! `_find_in_evidence`.
//!
//! Invariants:
//! - Verification re-derives the decision from raw evidence; it never
//!   trusts the `status` field in `decision_record.json` on its own.
//! - A decision verifies only if both the replayed status matches the
//!   recorded status, and the config hash matches (when the record carries
//!   one at all).

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use driftgate_core::DecisionRecord;

use crate::error::EvidenceError;
use crate::replay::MetricSource;
use crate::replay::combined_config_hash;
use crate::replay::replay_decision;

/// Outcome of re-verifying a decision against its evidence pack.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VerifyOutcome {
    pub verified: bool,
    pub status_match: bool,
    pub config_hash_match: bool,
    pub reason: String,
    pub replay_status: String,
    pub decision_status: String,
}

fn find_config_file(config_snapshot_dir: &Path, hints: &[&str]) -> Option<PathBuf> {
    for hint in hints {
        let candidate = config_snapshot_dir.join(hint);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    let entries = fs::read_dir(config_snapshot_dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_stem().and_then(std::ffi::OsStr::to_str) else { continue };
        let is_yaml = matches!(path.extension().and_then(std::ffi::OsStr::to_str), Some("yaml" | "yml"));
        if is_yaml && hints.iter().any(|hint| name == hint.trim_end_matches(".yaml").trim_end_matches(".yml")) {
            return Some(path);
        }
    }
    None
}

/// Re-runs the comparison recorded in `decision_record.json` from the
/// artifacts in `evidence_dir` and reports whether it reproduces the same
/// decision.
///
/// # Errors
/// Returns [`EvidenceError::Io`]/[`EvidenceError::Json`] only for I/O or
/// parse failures that prevent verification from running at all; a
/// reproducible mismatch is reported via `VerifyOutcome`, not an `Err`.
pub fn verify_decision(decision_path: &Path, evidence_dir: &Path) -> Result<VerifyOutcome, EvidenceError> {
    let body = fs::read(decision_path).map_err(|source| EvidenceError::Io { path: decision_path.display().to_string(), source })?;
    let decision: DecisionRecord =
        serde_json::from_slice(&body).map_err(|source| EvidenceError::Json { path: decision_path.display().to_string(), source })?;

    let evidence_dir = if evidence_dir.is_dir() {
        evidence_dir.to_path_buf()
    } else {
        decision_path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    };

    let metrics_path = evidence_dir.join("metrics_normalized.csv");
    if !metrics_path.is_file() {
        return Ok(not_verified("metrics_normalized.csv not found in evidence", &decision));
    }
    let baseline_path = evidence_dir.join("baseline_snapshot.json");
    if !baseline_path.is_file() {
        return Ok(not_verified("baseline_snapshot.json not found in evidence", &decision));
    }

    let config_dir = evidence_dir.join("config_snapshot");
    let Some(registry_path) = find_config_file(&config_dir, &["metric_registry.yaml", "metric_registry.yml"]) else {
        return Ok(not_verified("metric_registry not found in evidence config_snapshot", &decision));
    };
    let baseline_policy_path = find_config_file(&config_dir, &["baseline_policy.yaml", "baseline_policy.yml"]);

    let registry = driftgate_config::metric_registry::load(registry_path.to_str().unwrap_or_default())
        .map_err(EvidenceError::Config)?;

    let replay = replay_decision(
        &MetricSource::Csv(metrics_path),
        &MetricSource::Json(baseline_path),
        &registry,
        Some(registry_path.as_path()),
        None,
        baseline_policy_path.as_deref(),
        None,
    )?;

    let replay_status = replay.outcome.status.as_str().to_string();
    let decision_status = decision.status.as_str().to_string();
    let status_match = replay_status == decision_status;

    let computed_config_hash = combined_config_hash(&replay.config_ref);
    let config_hash_match = !decision.config_hash.is_empty() && computed_config_hash == decision.config_hash;

    let verified = status_match && (config_hash_match || decision.config_hash.is_empty());
    let reason = if verified {
        "deterministic replay matched".to_string()
    } else if !config_hash_match && !decision.config_hash.is_empty() {
        "config hash mismatch".to_string()
    } else {
        format!("status mismatch: replay={replay_status} decision={decision_status}")
    };

    Ok(VerifyOutcome { verified, status_match, config_hash_match, reason, replay_status, decision_status })
}

fn not_verified(reason: &str, decision: &DecisionRecord) -> VerifyOutcome {
    VerifyOutcome {
        verified: false,
        status_match: false,
        config_hash_match: false,
        reason: reason.to_string(),
        replay_status: String::new(),
        decision_status: decision.status.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_reports_missing_metrics_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let decision_path = dir.path().join("decision_record.json");
        let decision = serde_json::json!({
            "schema_version": "1.0",
            "decision_id": "dec-1",
            "timestamp": "2026-07-28T00:00:00Z",
            "status": "PASS",
            "confidence": null,
            "baseline_confidence": null,
            "trigger_metrics": [],
            "action_requested": null,
            "action_allowed": false,
            "reason": "ok",
            "policy_version": null,
            "config_hash": "",
            "evidence_ref": null,
            "run_id": "run-1",
            "baseline_run_id": null,
            "correlation_id": null
        });
        fs::write(&decision_path, serde_json::to_vec(&decision).expect("serialize")).expect("write decision");

        let outcome = verify_decision(&decision_path, dir.path()).expect("verify");
        assert!(!outcome.verified);
        assert_eq!(outcome.reason, "metrics_normalized.csv not found in evidence");
    }
}
