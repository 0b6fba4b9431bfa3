// crates/driftgate-daemon/src/prune.rs
// ============================================================================
// Module: Report Pruning
// Description: Caps the total size of daemon report directories by deleting
//              the oldest ones first.
// Purpose: Implement spec.md §4.8's "prune oldest report dirs to respect a
//          size cap".
// Dependencies: (none beyond std)
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/daemon.py::prune_reports`. Walks
//! `output_dir` for `daemon_*` subdirectories, sums their on-disk size, and
//! removes the oldest (by mtime) until the total is under `max_mb`.
//!
//! Invariants:
//! - `max_mb <= 0.0` disables pruning entirely.
//! - A directory that cannot be `stat`'d or removed is skipped, not fatal;
//!   pruning never aborts the daemon cycle.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

struct ReportDir {
    path: PathBuf,
    modified: SystemTime,
    size_bytes: u64,
}

fn dir_size(path: &Path) -> u64 {
    let mut total = 0u64;
    let Ok(entries) = fs::read_dir(path) else {
        return 0;
    };
    for entry in entries.flatten() {
        let Ok(metadata) = entry.metadata() else { continue };
        if metadata.is_dir() {
            total += dir_size(&entry.path());
        } else {
            total += metadata.len();
        }
    }
    total
}

fn report_dirs(output_dir: &Path) -> Vec<ReportDir> {
    let Ok(entries) = fs::read_dir(output_dir) else {
        return Vec::new();
    };
    let mut dirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(metadata) = entry.metadata() else { continue };
        if !metadata.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if !name.starts_with("daemon_") {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        dirs.push(ReportDir { size_bytes: dir_size(&path), path, modified });
    }
    dirs
}

/// Deletes the oldest `daemon_*` report directories under `output_dir` until
/// the total size is at or under `max_mb`. A non-positive `max_mb` disables
/// pruning.
pub fn prune_reports(output_dir: &Path, max_mb: f64) {
    if max_mb <= 0.0 {
        return;
    }
    let cap_bytes = (max_mb * 1024.0 * 1024.0) as u64;
    let mut dirs = report_dirs(output_dir);
    dirs.sort_by_key(|dir| dir.modified);

    let mut total: u64 = dirs.iter().map(|dir| dir.size_bytes).sum();
    for dir in &dirs {
        if total <= cap_bytes {
            break;
        }
        match fs::remove_dir_all(&dir.path) {
            Ok(()) => total = total.saturating_sub(dir.size_bytes),
            Err(error) => tracing::warn!(path = %dir.path.display(), %error, "failed to prune report dir"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_report(dir: &Path, name: &str, bytes: usize) {
        let report_dir = dir.join(name);
        fs::create_dir_all(&report_dir).expect("mkdir");
        fs::write(report_dir.join("drift_report.json"), vec![b'x'; bytes]).expect("write");
    }

    #[test]
    fn zero_cap_disables_pruning() {
        let dir = tempfile::tempdir().expect("tempdir");
        make_report(dir.path(), "daemon_1_1", 1024);
        prune_reports(dir.path(), 0.0);
        assert!(dir.path().join("daemon_1_1").exists());
    }

    #[test]
    fn oldest_directories_are_removed_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        make_report(dir.path(), "daemon_1_1", 2048);
        std::thread::sleep(std::time::Duration::from_millis(10));
        make_report(dir.path(), "daemon_2_1", 2048);

        let cap_mb = 3072.0 / (1024.0 * 1024.0);
        prune_reports(dir.path(), cap_mb);

        assert!(!dir.path().join("daemon_1_1").exists());
        assert!(dir.path().join("daemon_2_1").exists());
    }

    #[test]
    fn non_daemon_directories_are_left_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("other_dir")).expect("mkdir");
        prune_reports(dir.path(), 0.000_001);
        assert!(dir.path().join("other_dir").exists());
    }
}
