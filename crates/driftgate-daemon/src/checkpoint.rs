// crates/driftgate-daemon/src/checkpoint.rs
// ============================================================================
// Module: Checkpoint
// Description: Persists the daemon's last-cycle state and a bounded history
//              of prior checkpoints.
// Purpose: Implement spec.md §4.8's "update a checkpoint file, rotate
//          checkpoint history".
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/resilience.py`'s
//! `save_checkpoint_to_history`/`load_checkpoint_history`, plus
//! `daemon_main`'s own checkpoint restore-on-restart.
//!
//! Invariants:
//! - The checkpoint file always reflects the most recent cycle only.
//! - The history file is rotated to at most `max_entries` lines after every
//!   append, oldest first.

use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::error::DaemonError;

/// The daemon's most recent cycle outcome, restored on restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// UTC timestamp the cycle completed at.
    pub last_cycle_utc: String,
    /// The cycle's resulting status string (`"PASS"`, `"FAIL"`, ...).
    pub last_status: String,
    /// Report directory the cycle wrote, if any.
    #[serde(default)]
    pub last_report_dir: Option<String>,
}

fn io_err(path: &Path, source: std::io::Error) -> DaemonError {
    DaemonError::Io { path: path.display().to_string(), source }
}

fn json_err(path: &Path, source: serde_json::Error) -> DaemonError {
    DaemonError::Json { path: path.display().to_string(), source }
}

/// Loads the checkpoint file, if one exists. A missing or malformed file is
/// tolerated, matching a fresh or partially written daemon state directory.
#[must_use]
pub fn load_checkpoint(output_dir: &Path) -> Option<Checkpoint> {
    let bytes = std::fs::read(checkpoint_path(output_dir)).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Overwrites the checkpoint file with `checkpoint`.
///
/// # Errors
/// Returns [`DaemonError`] on a write or serialization failure.
pub fn save_checkpoint(output_dir: &Path, checkpoint: &Checkpoint) -> Result<(), DaemonError> {
    let path = checkpoint_path(output_dir);
    std::fs::create_dir_all(output_dir).map_err(|source| io_err(output_dir, source))?;
    let bytes = serde_json::to_vec_pretty(checkpoint).map_err(|source| json_err(&path, source))?;
    std::fs::write(&path, bytes).map_err(|source| io_err(&path, source))
}

fn checkpoint_path(output_dir: &Path) -> PathBuf {
    output_dir.join("daemon_checkpoint.json")
}

fn history_dir(output_dir: &Path) -> PathBuf {
    output_dir.join("checkpoint_history")
}

fn history_path(output_dir: &Path) -> PathBuf {
    history_dir(output_dir).join("checkpoints.jsonl")
}

/// Appends `checkpoint` to the rotating history log, truncating to the most
/// recent `max_entries` lines.
///
/// # Errors
/// Returns [`DaemonError`] on a read, write, or serialization failure.
pub fn save_checkpoint_to_history(output_dir: &Path, checkpoint: &Checkpoint, max_entries: usize) -> Result<(), DaemonError> {
    let dir = history_dir(output_dir);
    std::fs::create_dir_all(&dir).map_err(|source| io_err(&dir, source))?;
    let path = history_path(output_dir);
    let line = serde_json::to_string(checkpoint).map_err(|source| json_err(&path, source))?;

    {
        let mut file =
            OpenOptions::new().create(true).append(true).open(&path).map_err(|source| io_err(&path, source))?;
        writeln!(file, "{line}").map_err(|source| io_err(&path, source))?;
    }

    let existing = std::fs::read_to_string(&path).map_err(|source| io_err(&path, source))?;
    let lines: Vec<&str> = existing.lines().collect();
    if lines.len() > max_entries {
        let trimmed = lines[lines.len() - max_entries..].join("\n");
        std::fs::write(&path, format!("{trimmed}\n")).map_err(|source| io_err(&path, source))?;
    }
    Ok(())
}

/// Reads the last `limit` checkpoints from the history log, oldest to
/// newest. Malformed lines are skipped.
///
/// # Errors
/// Returns [`DaemonError::Io`] if the file exists but cannot be read.
pub fn load_checkpoint_history(output_dir: &Path, limit: usize) -> Result<Vec<Checkpoint>, DaemonError> {
    let path = history_path(output_dir);
    let file = match std::fs::File::open(&path) {
        Ok(file) => file,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(io_err(&path, source)),
    };
    let mut all = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| io_err(&path, source))?;
        if let Ok(checkpoint) = serde_json::from_str::<Checkpoint>(&line) {
            all.push(checkpoint);
        }
    }
    let start = all.len().saturating_sub(limit);
    Ok(all.split_off(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: &str) -> Checkpoint {
        Checkpoint { last_cycle_utc: "2026-01-01T00:00:00Z".to_string(), last_status: status.to_string(), last_report_dir: None }
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        save_checkpoint(dir.path(), &sample("PASS")).expect("save");
        let loaded = load_checkpoint(dir.path()).expect("loaded");
        assert_eq!(loaded.last_status, "PASS");
    }

    #[test]
    fn missing_checkpoint_file_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_checkpoint(dir.path()).is_none());
    }

    #[test]
    fn history_rotates_to_the_configured_cap() {
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 0..5 {
            save_checkpoint_to_history(dir.path(), &sample(&format!("STATUS_{i}")), 3).expect("append");
        }
        let history = load_checkpoint_history(dir.path(), 10).expect("load history");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].last_status, "STATUS_2");
        assert_eq!(history[2].last_status, "STATUS_4");
    }
}
