// crates/driftgate-daemon/src/idempotency.rs
// ============================================================================
// Module: Idempotency Store
// Description: JSONL log of ingested event keys, preventing a restart or
//              replay from re-processing the same event.
// Purpose: Implement the idempotency store named in spec.md §3/§4.8.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/resilience.py`'s
//! `idempotency_seen`/`idempotency_record`. Malformed lines are skipped
//! rather than treated as a read failure, matching the original's
//! tolerance for a partially written file.
//!
//! Invariants:
//! - `record` appends; it never rewrites or truncates prior entries.
//! - `seen` is a linear scan; the file is expected to stay small relative
//!   to a single daemon's retention window.

use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::error::DaemonError;

#[derive(Debug, Serialize, Deserialize)]
struct IdempotencyRecord {
    idempotency_key: String,
    run_id: String,
    out_dir: String,
    ts_utc: String,
}

/// Append-only idempotency log rooted at `base_dir`.
pub struct IdempotencyStore {
    path: PathBuf,
}

impl IdempotencyStore {
    /// Opens (without creating) the idempotency log under `base_dir`.
    #[must_use]
    pub fn new(base_dir: &Path) -> Self {
        Self { path: base_dir.join("ingest_idempotency.jsonl") }
    }

    /// Returns the recorded `out_dir` for `key`, if it was seen before.
    ///
    /// # Errors
    /// Returns [`DaemonError::Io`] if the log exists but cannot be read.
    pub fn seen(&self, key: &str) -> Result<Option<String>, DaemonError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(DaemonError::Io { path: self.path.display().to_string(), source }),
        };
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| DaemonError::Io { path: self.path.display().to_string(), source })?;
            let Ok(record) = serde_json::from_str::<IdempotencyRecord>(&line) else {
                continue;
            };
            if record.idempotency_key == key {
                return Ok(Some(record.out_dir));
            }
        }
        Ok(None)
    }

    /// Appends a record marking `key` as processed.
    ///
    /// # Errors
    /// Returns [`DaemonError::Io`] on a write failure, or
    /// [`DaemonError::Json`] if the record cannot be serialized.
    pub fn record(&self, key: &str, run_id: &str, out_dir: &str, ts_utc: &str) -> Result<(), DaemonError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DaemonError::Io { path: parent.display().to_string(), source })?;
        }
        let record = IdempotencyRecord {
            idempotency_key: key.to_string(),
            run_id: run_id.to_string(),
            out_dir: out_dir.to_string(),
            ts_utc: ts_utc.to_string(),
        };
        let line =
            serde_json::to_string(&record).map_err(|source| DaemonError::Json { path: self.path.display().to_string(), source })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| DaemonError::Io { path: self.path.display().to_string(), source })?;
        writeln!(file, "{line}").map_err(|source| DaemonError::Io { path: self.path.display().to_string(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_key_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = IdempotencyStore::new(dir.path());
        assert_eq!(store.seen("missing").expect("seen"), None);
    }

    #[test]
    fn recorded_key_is_found_on_a_later_scan() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = IdempotencyStore::new(dir.path());
        store.record("evt-1", "run-1", "/reports/run-1", "2026-01-01T00:00:00Z").expect("record");
        assert_eq!(store.seen("evt-1").expect("seen"), Some("/reports/run-1".to_string()));
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = IdempotencyStore::new(dir.path());
        std::fs::write(dir.path().join("ingest_idempotency.jsonl"), "not json\n").expect("seed malformed line");
        assert_eq!(store.seen("evt-1").expect("seen"), None);
    }
}
