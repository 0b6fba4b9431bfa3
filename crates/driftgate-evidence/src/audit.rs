// crates/driftgate-evidence/src/audit.rs
// ============================================================================
// Module: Audit Log
// Description: Hash-chained, append-only audit trail for decisions and
//              actions.
// Purpose: Implement the audit log format (§6, Invariant 8).
// Dependencies: driftgate-core, serde_jcs, serde_json
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/audit.py`'s `append_audit_log`/
//! `_entry_hash`/`verify_audit_log`.
//!
//! Invariants:
//! - `entry_hash = SHA256(canonical_json(entry_without_entry_hash))`, where
//!   the canonicalized payload includes `prev_hash` but never `entry_hash`
//!   itself.
//! - The chain is append-only: verification walks the file in order and
//!   recomputes each hash from the previous entry's digest.

use std::fs;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use driftgate_core::hash_bytes;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::EvidenceError;

/// One line of the append-only audit log (§6 "Audit log").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// RFC 3339 UTC timestamp the entry was appended.
    pub ts_utc: String,
    /// Run the entry relates to, if any.
    #[serde(default)]
    pub run_id: Option<String>,
    /// Action label (e.g. `"decision_recorded"`, `"action_executed"`).
    pub action: String,
    /// Arbitrary structured detail payload.
    #[serde(default)]
    pub details: Value,
    /// Digest of the entry that preceded this one, or `None` for the first.
    #[serde(default)]
    pub prev_hash: Option<String>,
    /// This entry's own digest.
    pub entry_hash: String,
}

fn entry_hash(ts_utc: &str, run_id: Option<&str>, action: &str, details: &Value, prev_hash: Option<&str>) -> Result<String, EvidenceError> {
    let payload = serde_json::json!({
        "ts_utc": ts_utc,
        "run_id": run_id,
        "action": action,
        "details": details,
        "prev_hash": prev_hash,
    });
    let canonical = serde_jcs::to_vec(&payload).map_err(|source| EvidenceError::Json { path: "<audit entry>".to_string(), source })?;
    Ok(hash_bytes(&canonical))
}

/// Appends one entry to `<report_dir>/audit_log.jsonl`, chaining it to the
/// previous entry's hash. The caller supplies `ts_utc`: this module never
/// reads the wall clock itself, matching `driftgate-core`'s time invariant.
///
/// # Errors
/// Returns [`EvidenceError::Io`] if the log cannot be read or written.
pub fn append_audit_log(
    report_dir: &Path,
    ts_utc: &str,
    run_id: Option<&str>,
    action: &str,
    details: Value,
) -> Result<PathBuf, EvidenceError> {
    fs::create_dir_all(report_dir).map_err(|source| EvidenceError::Io { path: report_dir.display().to_string(), source })?;
    let log_path = report_dir.join("audit_log.jsonl");
    let prev_hash = last_entry_hash(&log_path)?;

    let hash = entry_hash(ts_utc, run_id, action, &details, prev_hash.as_deref())?;
    let entry = AuditEntry {
        ts_utc: ts_utc.to_string(),
        run_id: run_id.map(str::to_string),
        action: action.to_string(),
        details,
        prev_hash,
        entry_hash: hash,
    };
    let line = serde_json::to_string(&entry).map_err(|source| EvidenceError::Json { path: log_path.display().to_string(), source })?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|source| EvidenceError::Io { path: log_path.display().to_string(), source })?;
    writeln!(file, "{line}").map_err(|source| EvidenceError::Io { path: log_path.display().to_string(), source })?;
    restrict_permissions(&log_path);
    Ok(log_path)
}

fn last_entry_hash(log_path: &Path) -> Result<Option<String>, EvidenceError> {
    if !log_path.is_file() {
        return Ok(None);
    }
    let file = fs::File::open(log_path).map_err(|source| EvidenceError::Io { path: log_path.display().to_string(), source })?;
    let mut last_hash = None;
    for line in std::io::BufReader::new(file).lines() {
        let line = line.map_err(|source| EvidenceError::Io { path: log_path.display().to_string(), source })?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(entry) = serde_json::from_str::<AuditEntry>(&line) {
            last_hash = Some(entry.entry_hash);
        }
    }
    Ok(last_hash)
}

/// Re-derives every entry's hash from its predecessor and reports any
/// mismatch. An empty result means the chain verified cleanly.
///
/// `strict` stops at the first problem instead of scanning the whole file.
///
/// # Errors
/// Returns [`EvidenceError::Io`] only if the log file itself cannot be
/// opened; malformed or mismatched entries are reported in the returned
/// `Vec<String>`, not as an `Err`.
pub fn verify_audit_log(log_path: &Path, strict: bool) -> Result<Vec<String>, EvidenceError> {
    if !log_path.is_file() {
        return Ok(vec!["audit log not found".to_string()]);
    }
    let file = fs::File::open(log_path).map_err(|source| EvidenceError::Io { path: log_path.display().to_string(), source })?;

    let mut issues = Vec::new();
    let mut prev_hash: Option<String> = None;
    for line in std::io::BufReader::new(file).lines() {
        let line = line.map_err(|source| EvidenceError::Io { path: log_path.display().to_string(), source })?;
        if line.trim().is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<AuditEntry>(&line) else {
            issues.push("invalid JSON entry".to_string());
            if strict {
                return Ok(issues);
            }
            continue;
        };
        let computed = entry_hash(&entry.ts_utc, entry.run_id.as_deref(), &entry.action, &entry.details, prev_hash.as_deref())?;
        if computed != entry.entry_hash {
            issues.push("audit hash mismatch".to_string());
            if strict {
                return Ok(issues);
            }
        }
        prev_hash = Some(entry.entry_hash.clone());
    }
    Ok(issues)
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    let _ = fs::set_permissions(path, Permissions::from_mode(0o600));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_chains_entries_and_verifies_clean() {
        let dir = tempfile::tempdir().expect("tempdir");
        append_audit_log(dir.path(), "2026-07-28T00:00:00Z", Some("run-1"), "decision_recorded", serde_json::json!({"status": "FAIL"}))
            .expect("append 1");
        let log_path = append_audit_log(dir.path(), "2026-07-28T00:00:01Z", Some("run-1"), "action_executed", serde_json::json!({"type": "notify"}))
            .expect("append 2");

        let issues = verify_audit_log(&log_path, false).expect("verify");
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn verify_detects_tampered_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = append_audit_log(dir.path(), "2026-07-28T00:00:00Z", Some("run-1"), "decision_recorded", serde_json::json!({"status": "FAIL"}))
            .expect("append");

        let tampered = fs::read_to_string(&log_path).expect("read").replace("FAIL", "PASS");
        fs::write(&log_path, tampered).expect("tamper");

        let issues = verify_audit_log(&log_path, false).expect("verify");
        assert_eq!(issues, vec!["audit hash mismatch".to_string()]);
    }

    #[test]
    fn verify_reports_missing_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let issues = verify_audit_log(&dir.path().join("audit_log.jsonl"), false).expect("verify");
        assert_eq!(issues, vec!["audit log not found".to_string()]);
    }
}
