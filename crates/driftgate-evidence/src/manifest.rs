// crates/driftgate-evidence/src/manifest.rs
// ============================================================================
// Module: Artifact Manifest
// Description: Per-file SHA-256 manifest for a report directory, and its
//              verification.
// Purpose: Implement the `artifact_manifest.json` format (§6).
// Dependencies: driftgate-core, serde_json
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/audit.py`'s `file_hash`/
//! `write_artifact_manifest`/`verify_artifact_manifest`.
//!
//! Invariants:
//! - Entries are written in the order the caller supplied paths; callers
//!   that want a deterministic manifest pass paths in sorted order.
//! - Missing files are skipped when writing, reported as issues when
//!   verifying.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use driftgate_core::hash_bytes;
use serde::Deserialize;
use serde::Serialize;

use crate::error::EvidenceError;

/// One entry in an artifact manifest (§6 "Artifact manifest").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Absolute path to the artifact at manifest-generation time.
    pub path: String,
    /// SHA-256 digest of the artifact's bytes, hex-encoded.
    pub sha256: String,
}

/// Computes the SHA-256 digest of a file's contents, hex-encoded.
///
/// # Errors
/// Returns [`EvidenceError::Io`] if the file cannot be read.
pub fn file_hash(path: &Path) -> Result<String, EvidenceError> {
    let bytes = fs::read(path).map_err(|source| EvidenceError::Io { path: path.display().to_string(), source })?;
    Ok(hash_bytes(&bytes))
}

/// Writes `<report_dir>/artifact_manifest.json` covering every path in
/// `files` that exists; missing paths are silently skipped.
///
/// # Errors
/// Returns [`EvidenceError::Io`] if the manifest cannot be written, or
/// [`EvidenceError::Json`] if serialization fails.
pub fn write_artifact_manifest(report_dir: &Path, files: &[PathBuf]) -> Result<PathBuf, EvidenceError> {
    let mut manifest = Vec::with_capacity(files.len());
    for path in files {
        if !path.is_file() {
            continue;
        }
        manifest.push(ManifestEntry { path: path.display().to_string(), sha256: file_hash(path)? });
    }
    let out_path = report_dir.join("artifact_manifest.json");
    let body = serde_json::to_vec_pretty(&manifest).map_err(|source| EvidenceError::Json { path: out_path.display().to_string(), source })?;
    fs::write(&out_path, body).map_err(|source| EvidenceError::Io { path: out_path.display().to_string(), source })?;
    restrict_permissions(&out_path);
    Ok(out_path)
}

/// Re-hashes every file named in `manifest_path` and reports mismatches or
/// missing files. An empty result means the manifest verified cleanly.
///
/// # Errors
/// Returns [`EvidenceError::Io`]/[`EvidenceError::Json`] only if the
/// manifest file itself cannot be read or parsed; per-entry problems are
/// reported in the returned `Vec<String>`, not as an `Err`.
pub fn verify_artifact_manifest(manifest_path: &Path) -> Result<Vec<String>, EvidenceError> {
    if !manifest_path.is_file() {
        return Ok(vec!["manifest not found".to_string()]);
    }
    let body = fs::read(manifest_path).map_err(|source| EvidenceError::Io { path: manifest_path.display().to_string(), source })?;
    let entries: Vec<ManifestEntry> =
        serde_json::from_slice(&body).map_err(|source| EvidenceError::Json { path: manifest_path.display().to_string(), source })?;

    let mut issues = Vec::new();
    for entry in entries {
        let path = Path::new(&entry.path);
        if !path.is_file() {
            issues.push(format!("missing artifact: {}", entry.path));
            continue;
        }
        match file_hash(path) {
            Ok(actual) if actual == entry.sha256 => {}
            Ok(_) => issues.push(format!("hash mismatch: {}", entry.path)),
            Err(_) => issues.push(format!("unreadable artifact: {}", entry.path)),
        }
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
    fn write_and_verify_round_trips_clean() {
        let dir = tempfile::tempdir().expect("tempdir");
        let artifact = dir.path().join("drift_report.json");
        fs::write(&artifact, b"{}").expect("write artifact");

        let manifest_path = write_artifact_manifest(dir.path(), &[artifact.clone()]).expect("write manifest");
        let issues = verify_artifact_manifest(&manifest_path).expect("verify");
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn verify_detects_tampering() {
        let dir = tempfile::tempdir().expect("tempdir");
        let artifact = dir.path().join("drift_report.json");
        fs::write(&artifact, b"{}").expect("write artifact");
        let manifest_path = write_artifact_manifest(dir.path(), &[artifact.clone()]).expect("write manifest");

        fs::write(&artifact, b"{\"tampered\":true}").expect("tamper");
        let issues = verify_artifact_manifest(&manifest_path).expect("verify");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("hash mismatch"));
    }

    #[test]
    fn verify_reports_missing_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let issues = verify_artifact_manifest(&dir.path().join("artifact_manifest.json")).expect("verify");
        assert_eq!(issues, vec!["manifest not found".to_string()]);
    }
}
