// crates/driftgate-evidence/src/pack.rs
// ============================================================================
// Module: Evidence Pack
// Description: Bundles a run's artifacts into a forensic-ready evidence
//              pack, as a directory or a single deflate-compressed archive.
// Purpose: Implement C7's evidence-pack export (§4.7, §6).
// Dependencies: driftgate-core, zip
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/evidence.py`'s `export_evidence_pack`.
//!
//! Invariants:
//! - The pack directory is always named `evidence_<case_id>`, whether it
//!   ends up on disk as a directory or as `evidence_<case_id>.zip`.
//! - Every artifact copy is best-effort: a missing source file is skipped,
//!   never an error, since not every run produces every artifact.
//! - `manifest.json` lists the artifact names the pack was asked to
//!   include, not only the ones actually present, so a reader can tell
//!   what was expected versus what was found.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::EvidenceError;

const REPORT_ARTIFACTS: &[&str] = &["drift_report.json", "drift_report.html", "metrics_normalized.csv", "run_meta_normalized.json"];

/// Inputs to [`export_evidence_pack`]. Every path field is optional because
/// not every case has a decision record, baseline snapshot, or raw slice.
#[derive(Debug, Clone, Default)]
pub struct EvidencePackInput {
    pub case_id: String,
    pub report_dir: PathBuf,
    pub decision_record_path: Option<PathBuf>,
    pub config_paths: BTreeMap<String, PathBuf>,
    pub actions_policy_path: Option<PathBuf>,
    pub baseline_snapshot_path: Option<PathBuf>,
    pub raw_slice_path: Option<PathBuf>,
    pub sbom_hash: Option<String>,
    pub code_version: Option<String>,
    pub zip_output: bool,
}

/// Manifest written alongside the bundled artifacts (§6 evidence pack).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvidenceManifest {
    pub case_id: String,
    pub generated_utc: String,
    pub report_dir: String,
    pub config_paths: Vec<String>,
    pub artifacts: Vec<String>,
    pub sbom_hash: String,
    pub code_version: String,
}

fn copy_if_present(src: &Path, dst: &Path) -> Result<(), EvidenceError> {
    if src.is_file() {
        fs::copy(src, dst).map_err(|source| EvidenceError::Io { path: dst.display().to_string(), source })?;
    }
    Ok(())
}

/// Assembles `evidence_<case_id>/` under `out_dir`, optionally zipping it
/// into `evidence_<case_id>.zip` and removing the working directory.
/// Returns the path to whichever one the caller ends up with.
///
/// # Errors
/// Returns [`EvidenceError::Io`] if an artifact cannot be copied or the
/// manifest cannot be written, or [`EvidenceError::Zip`] if archive
/// creation fails.
pub fn export_evidence_pack(input: &EvidencePackInput, out_dir: &Path, generated_utc: &str) -> Result<PathBuf, EvidenceError> {
    let name = format!("evidence_{}", input.case_id);
    let root = out_dir.join(&name);
    fs::create_dir_all(&root).map_err(|source| EvidenceError::Io { path: root.display().to_string(), source })?;

    for artifact in REPORT_ARTIFACTS {
        copy_if_present(&input.report_dir.join(artifact), &root.join(artifact))?;
    }

    let decision_src = input.decision_record_path.clone().unwrap_or_else(|| input.report_dir.join("decision_record.json"));
    copy_if_present(&decision_src, &root.join("decision_record.json"))?;

    let config_dir = root.join("config_snapshot");
    fs::create_dir_all(&config_dir).map_err(|source| EvidenceError::Io { path: config_dir.display().to_string(), source })?;
    for path in input.config_paths.values() {
        if let Some(file_name) = path.file_name() {
            copy_if_present(path, &config_dir.join(file_name))?;
        }
    }
    if let Some(actions_policy_path) = &input.actions_policy_path {
        copy_if_present(actions_policy_path, &config_dir.join("actions_policy.yaml"))?;
    }

    if let Some(baseline_snapshot_path) = &input.baseline_snapshot_path {
        copy_if_present(baseline_snapshot_path, &root.join("baseline_snapshot.json"))?;
    }
    if let Some(raw_slice_path) = &input.raw_slice_path {
        copy_if_present(raw_slice_path, &root.join("raw_telemetry_slice.jsonl"))?;
    }

    let manifest = EvidenceManifest {
        case_id: input.case_id.clone(),
        generated_utc: generated_utc.to_string(),
        report_dir: input.report_dir.display().to_string(),
        config_paths: input.config_paths.keys().cloned().collect(),
        artifacts: REPORT_ARTIFACTS
            .iter()
            .map(ToString::to_string)
            .chain([
                "decision_record.json".to_string(),
                "config_snapshot".to_string(),
                "raw_telemetry_slice.jsonl".to_string(),
                "baseline_snapshot.json".to_string(),
            ])
            .collect(),
        sbom_hash: input.sbom_hash.clone().unwrap_or_default(),
        code_version: input.code_version.clone().unwrap_or_else(|| "dev".to_string()),
    };
    let manifest_path = root.join("manifest.json");
    let body = serde_json::to_vec_pretty(&manifest).map_err(|source| EvidenceError::Json { path: manifest_path.display().to_string(), source })?;
    fs::write(&manifest_path, body).map_err(|source| EvidenceError::Io { path: manifest_path.display().to_string(), source })?;

    if input.zip_output {
        let zip_path = out_dir.join(format!("{name}.zip"));
        write_zip_archive(&root, &name, &zip_path)?;
        let _ = fs::remove_dir_all(&root);
        Ok(zip_path)
    } else {
        Ok(root)
    }
}

fn write_zip_archive(root: &Path, archive_name: &str, zip_path: &Path) -> Result<(), EvidenceError> {
    let file = fs::File::create(zip_path).map_err(|source| EvidenceError::Io { path: zip_path.display().to_string(), source })?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated).compression_level(Some(9));

    let mut entries = Vec::new();
    collect_files(root, &mut entries)?;
    entries.sort();

    for full_path in entries {
        let relative = full_path.strip_prefix(root).unwrap_or(&full_path);
        let arcname = format!("{archive_name}/{}", relative.display());
        writer
            .start_file(arcname, options)
            .map_err(|source| EvidenceError::Zip { path: zip_path.display().to_string(), source })?;
        let bytes = fs::read(&full_path).map_err(|source| EvidenceError::Io { path: full_path.display().to_string(), source })?;
        writer
            .write_all(&bytes)
            .map_err(|source| EvidenceError::Io { path: zip_path.display().to_string(), source })?;
    }
    writer
        .finish()
        .map_err(|source| EvidenceError::Zip { path: zip_path.display().to_string(), source })?;
    Ok(())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), EvidenceError> {
    for entry in fs::read_dir(dir).map_err(|source| EvidenceError::Io { path: dir.display().to_string(), source })? {
        let entry = entry.map_err(|source| EvidenceError::Io { path: dir.display().to_string(), source })?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input(report_dir: &Path) -> EvidencePackInput {
        EvidencePackInput { case_id: "case-1".to_string(), report_dir: report_dir.to_path_buf(), ..Default::default() }
    }

    #[test]
    fn export_as_directory_copies_present_artifacts_and_skips_missing() {
        let report_dir = tempfile::tempdir().expect("tempdir");
        fs::write(report_dir.path().join("drift_report.json"), b"{}").expect("write");
        let out_dir = tempfile::tempdir().expect("tempdir");

        let input = sample_input(report_dir.path());
        let root = export_evidence_pack(&input, out_dir.path(), "2026-07-28T00:00:00Z").expect("export");

        assert!(root.join("drift_report.json").is_file());
        assert!(!root.join("drift_report.html").exists());
        assert!(root.join("manifest.json").is_file());
        assert!(root.join("config_snapshot").is_dir());
    }

    #[test]
    fn export_as_zip_produces_archive_and_removes_working_dir() {
        let report_dir = tempfile::tempdir().expect("tempdir");
        fs::write(report_dir.path().join("drift_report.json"), b"{}").expect("write");
        let out_dir = tempfile::tempdir().expect("tempdir");

        let mut input = sample_input(report_dir.path());
        input.zip_output = true;
        let zip_path = export_evidence_pack(&input, out_dir.path(), "2026-07-28T00:00:00Z").expect("export");

        assert!(zip_path.extension().and_then(std::ffi::OsStr::to_str) == Some("zip"));
        assert!(zip_path.is_file());
        assert!(!out_dir.path().join("evidence_case-1").exists());
    }
}
