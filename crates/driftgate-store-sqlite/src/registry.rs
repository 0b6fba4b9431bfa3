// crates/driftgate-store-sqlite/src/registry.rs
// ============================================================================
// Module: Run Registry
// Description: `SQLite`-backed durable store of runs, metrics, tags, baseline
//              requests/approvals, and the action ledger.
// Purpose: Implement C2's public operations (§4.2).
// Dependencies: driftgate-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Every mutating call is serialized by a `std::sync::Mutex` held for the
//! call's duration (§4.2 "Concurrency"); reads share the same guarded
//! connection since this store targets single-process daemon/CLI use, not a
//! high-throughput multi-writer service.
//!
//! Invariants:
//! - `upsert_run` overwrites only `status` and `baseline_run_id` on an
//!   existing row; all other columns are set once, at insert.
//! - `replace_metrics` is atomic: the delete and the inserts happen in one
//!   transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Mutex;

use driftgate_core::ActionId;
use driftgate_core::ActionLedgerEntry;
use driftgate_core::ActionStatus;
use driftgate_core::DecisionId;
use driftgate_core::MetricMap;
use driftgate_core::MetricValue;
use driftgate_core::RunId;
use driftgate_core::RunMeta;
use driftgate_core::RunStatus;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::error::StoreError;
use crate::retry::with_retry;
use crate::schema;

// ============================================================================
// SECTION: Baseline Selection Types
// ============================================================================

/// Reason code returned by [`RunRegistry::select_baseline`] (§4.3 "Selection").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// Resolved via an explicit `policy.tag`.
    Tag,
    /// The configured tag does not exist.
    TagNotFound,
    /// Resolved as the newest matching run with `status = PASS`.
    LastPass,
    /// No `PASS` run exists; fell back to the newest match.
    FallbackLatest,
    /// No `PASS` run exists and fallback is not configured.
    NoPass,
    /// No matching runs exist at all.
    NoRuns,
}

impl SelectionReason {
    /// Stable string form used in decision records and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::TagNotFound => "tag_not_found",
            Self::LastPass => "last_pass",
            Self::FallbackLatest => "fallback_latest",
            Self::NoPass => "no_pass",
            Self::NoRuns => "no_runs",
        }
    }
}

/// Result of a baseline selection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineSelection {
    /// Selected baseline run, if any.
    pub baseline_run_id: Option<RunId>,
    /// Reason the selection was (or was not) made.
    pub reason: SelectionReason,
    /// Warning, e.g. on a tag/registry-hash mismatch.
    pub warning: Option<String>,
}

/// Minimal policy view needed by `select_baseline`; callers build this from
/// `driftgate_config::BaselinePolicy`.
#[derive(Debug, Clone, Default)]
pub struct SelectionPolicy {
    /// Explicit baseline tag to resolve, if set.
    pub tag: Option<String>,
    /// Whether to fall back to the newest match when no `PASS` run exists.
    pub fallback_latest: bool,
}

// ============================================================================
// SECTION: Run Registry
// ============================================================================

/// Durable run registry backed by a single `SQLite` connection.
pub struct RunRegistry {
    conn: Mutex<Connection>,
}

impl RunRegistry {
    /// Opens (creating if necessary) the registry database at `path` and
    /// applies any pending migrations.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] if the database cannot be opened or
    /// migrated.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.busy_timeout(std::time::Duration::from_millis(5_000))?;
        schema::migrate(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory registry, primarily for tests.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] if migration fails.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Runs
    // ------------------------------------------------------------------

    /// Inserts a new run or overwrites `status`/`baseline_run_id` on an
    /// existing one (§4.2).
    ///
    /// # Errors
    /// Returns [`StoreError`] on serialization or `SQLite` failure.
    pub fn upsert_run(
        &self,
        meta: &RunMeta,
        status: RunStatus,
        baseline_run_id: Option<&RunId>,
        registry_hash: Option<&str>,
    ) -> Result<(), StoreError> {
        let meta_json = serde_json::to_string(meta)?;
        let conn = self.lock();
        with_retry(|| {
            conn.execute(
                "INSERT INTO runs (run_id, meta_json, status, baseline_run_id, registry_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
                 ON CONFLICT (run_id) DO UPDATE SET
                    status = excluded.status,
                    baseline_run_id = excluded.baseline_run_id",
                params![
                    meta.run_id.as_str(),
                    meta_json,
                    status.as_str(),
                    baseline_run_id.map(RunId::as_str),
                    registry_hash,
                ],
            )
        })?;
        Ok(())
    }

    /// Fetches a run's stored metadata and status, if it exists.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] on a query failure.
    pub fn get_run(&self, run_id: &RunId) -> Result<Option<(RunMeta, RunStatus)>, StoreError> {
        let conn = self.lock();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT meta_json, status FROM runs WHERE run_id = ?1",
                params![run_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((meta_json, status_str)) = row else {
            return Ok(None);
        };
        let meta: RunMeta = serde_json::from_str(&meta_json)?;
        let status = parse_status(&status_str)?;
        Ok(Some((meta, status)))
    }

    /// Lists run ids matching `(program, subsystem, test_name)`, newest-first.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] on a query failure.
    pub fn list_matching_runs(
        &self,
        program: Option<&str>,
        subsystem: Option<&str>,
        test_name: Option<&str>,
    ) -> Result<Vec<(RunId, RunStatus)>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT run_id, status FROM runs
             WHERE json_extract(meta_json, '$.program') IS ?1
               AND json_extract(meta_json, '$.subsystem') IS ?2
               AND json_extract(meta_json, '$.test_name') IS ?3
             ORDER BY created_at DESC, run_id DESC",
        )?;
        let rows = stmt.query_map(params![program, subsystem, test_name], |row| {
            let run_id: String = row.get(0)?;
            let status: String = row.get(1)?;
            Ok((run_id, status))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (run_id, status_str) = row?;
            out.push((RunId::new(run_id), parse_status(&status_str)?));
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Metrics
    // ------------------------------------------------------------------

    /// Atomically replaces all metrics stored for `run_id` (§4.2).
    ///
    /// # Errors
    /// Returns [`StoreError::Busy`] if lock contention persists past the
    /// retry budget, or [`StoreError::Sqlite`]/[`StoreError::Serde`] otherwise.
    pub fn replace_metrics(&self, run_id: &RunId, rows: &MetricMap) -> Result<(), StoreError> {
        let encoded: Vec<(String, String)> = rows
            .iter()
            .map(|(name, value)| Ok((name.clone(), serde_json::to_string(value)?)))
            .collect::<Result<_, serde_json::Error>>()?;
        let mut conn = self.lock();
        with_retry(|| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM metrics WHERE run_id = ?1", params![run_id.as_str()])?;
            for (name, value_json) in &encoded {
                tx.execute(
                    "INSERT INTO metrics (run_id, name, value_json) VALUES (?1, ?2, ?3)",
                    params![run_id.as_str(), name, value_json],
                )?;
            }
            tx.commit()
        })?;
        Ok(())
    }

    /// Fetches the metric map stored for `run_id`.
    ///
    /// # Errors
    /// Returns [`StoreError`] on query or deserialization failure.
    pub fn fetch_metrics(&self, run_id: &RunId) -> Result<MetricMap, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT name, value_json FROM metrics WHERE run_id = ?1")?;
        let rows = stmt.query_map(params![run_id.as_str()], |row| {
            let name: String = row.get(0)?;
            let value_json: String = row.get(1)?;
            Ok((name, value_json))
        })?;
        let mut out = MetricMap::new();
        for row in rows {
            let (name, value_json) = row?;
            let value: MetricValue = serde_json::from_str(&value_json)?;
            out.insert(name, value);
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Baseline selection, tags
    // ------------------------------------------------------------------

    /// Selects a baseline run for `run_meta` per the algorithm in §4.3.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] on a query failure.
    pub fn select_baseline(
        &self,
        run_meta: &RunMeta,
        policy: &SelectionPolicy,
        registry_hash: Option<&str>,
    ) -> Result<BaselineSelection, StoreError> {
        if let Some(tag) = &policy.tag {
            return self.select_baseline_by_tag(tag, registry_hash);
        }

        let matches = self.list_matching_runs(
            run_meta.program.as_deref(),
            run_meta.subsystem.as_deref(),
            run_meta.test_name.as_deref(),
        )?;

        if let Some((run_id, _)) = matches.iter().find(|(_, status)| *status == RunStatus::Pass) {
            return Ok(BaselineSelection {
                baseline_run_id: Some(run_id.clone()),
                reason: SelectionReason::LastPass,
                warning: None,
            });
        }

        if matches.is_empty() {
            return Ok(BaselineSelection {
                baseline_run_id: None,
                reason: SelectionReason::NoRuns,
                warning: None,
            });
        }

        if policy.fallback_latest {
            let (run_id, _) = &matches[0];
            return Ok(BaselineSelection {
                baseline_run_id: Some(run_id.clone()),
                reason: SelectionReason::FallbackLatest,
                warning: None,
            });
        }

        Ok(BaselineSelection {
            baseline_run_id: None,
            reason: SelectionReason::NoPass,
            warning: None,
        })
    }

    fn select_baseline_by_tag(
        &self,
        tag: &str,
        registry_hash: Option<&str>,
    ) -> Result<BaselineSelection, StoreError> {
        let conn = self.lock();
        let row: Option<(String, Option<String>)> = conn
            .query_row(
                "SELECT run_id, registry_hash FROM tags WHERE tag = ?1",
                params![tag],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((run_id, tagged_hash)) = row else {
            return Ok(BaselineSelection {
                baseline_run_id: None,
                reason: SelectionReason::TagNotFound,
                warning: None,
            });
        };
        let warning = match (registry_hash, tagged_hash.as_deref()) {
            (Some(current), Some(tagged)) if current != tagged => {
                Some(format!("tag '{tag}' was set under a different registry hash"))
            }
            _ => None,
        };
        Ok(BaselineSelection {
            baseline_run_id: Some(RunId::new(run_id)),
            reason: SelectionReason::Tag,
            warning,
        })
    }

    /// Sets a baseline tag to point at `run_id`.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] on a write failure.
    pub fn set_tag(&self, tag: &str, run_id: &RunId, registry_hash: Option<&str>) -> Result<(), StoreError> {
        let conn = self.lock();
        with_retry(|| {
            conn.execute(
                "INSERT INTO tags (tag, run_id, registry_hash, updated_at)
                 VALUES (?1, ?2, ?3, datetime('now'))
                 ON CONFLICT (tag) DO UPDATE SET
                    run_id = excluded.run_id,
                    registry_hash = excluded.registry_hash,
                    updated_at = excluded.updated_at",
                params![tag, run_id.as_str(), registry_hash],
            )
        })?;
        Ok(())
    }

    /// Lists all baseline tags and the run each currently points at.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] on a query failure.
    pub fn list_tags(&self) -> Result<Vec<(String, RunId)>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT tag, run_id FROM tags ORDER BY tag ASC")?;
        let rows = stmt.query_map([], |row| {
            let tag: String = row.get(0)?;
            let run_id: String = row.get(1)?;
            Ok((tag, run_id))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (tag, run_id) = row?;
            out.push((tag, RunId::new(run_id)));
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Baseline tagging requests / approvals
    // ------------------------------------------------------------------

    /// Opens a new baseline tagging request in `pending` status.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] on a write failure.
    pub fn add_request(
        &self,
        request_id: &str,
        tag: &str,
        run_id: &RunId,
        requested_by: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        with_retry(|| {
            conn.execute(
                "INSERT INTO baseline_requests (request_id, tag, run_id, status, requested_by, created_at)
                 VALUES (?1, ?2, ?3, 'pending', ?4, datetime('now'))",
                params![request_id, tag, run_id.as_str(), requested_by],
            )
        })?;
        Ok(())
    }

    /// Fetches a baseline tagging request by id.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if no such request exists, or
    /// [`StoreError::Sqlite`] on a query failure.
    pub fn get_request(&self, request_id: &str) -> Result<BaselineRequest, StoreError> {
        let conn = self.lock();
        conn.query_row(
            "SELECT request_id, tag, run_id, status, requested_by, created_at
             FROM baseline_requests WHERE request_id = ?1",
            params![request_id],
            |row| {
                Ok(BaselineRequest {
                    request_id: row.get(0)?,
                    tag: row.get(1)?,
                    run_id: RunId::new(row.get::<_, String>(2)?),
                    status: row.get(3)?,
                    requested_by: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("baseline request '{request_id}'")))
    }

    /// Sets a request's terminal status (`approved` or `rejected`). Must only
    /// be called once per request (§4.3 "Tagging workflow").
    ///
    /// # Errors
    /// Returns [`StoreError::Invalid`] if the request is not `pending`, or
    /// [`StoreError::Sqlite`] on a write failure.
    pub fn set_status(&self, request_id: &str, status: &str) -> Result<(), StoreError> {
        let existing = self.get_request(request_id)?;
        if existing.status != "pending" {
            return Err(StoreError::Invalid(format!(
                "request '{request_id}' already resolved as '{}'",
                existing.status
            )));
        }
        let conn = self.lock();
        with_retry(|| {
            conn.execute(
                "UPDATE baseline_requests SET status = ?1 WHERE request_id = ?2",
                params![status, request_id],
            )
        })?;
        Ok(())
    }

    /// Counts distinct approvers recorded against a request.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] on a query failure.
    pub fn count_approvals(&self, request_id: &str) -> Result<u32, StoreError> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM baseline_approvals WHERE request_id = ?1",
            params![request_id],
            |row| row.get(0),
        )?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Records an approval. Approvals are immutable once recorded; a second
    /// call from the same approver is a no-op (`INSERT OR IGNORE`).
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] on a write failure.
    pub fn add_approval(&self, request_id: &str, approver: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        with_retry(|| {
            conn.execute(
                "INSERT OR IGNORE INTO baseline_approvals (request_id, approver, approved_at)
                 VALUES (?1, ?2, datetime('now'))",
                params![request_id, approver],
            )
        })?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Action ledger
    // ------------------------------------------------------------------

    /// Inserts an action-ledger row.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] on a write failure, including a
    /// uniqueness violation on `idempotency_key`.
    pub fn action_ledger_insert(&self, entry: &ActionLedgerEntry) -> Result<(), StoreError> {
        let payload_json = serde_json::to_string(&entry.payload)?;
        let conn = self.lock();
        with_retry(|| {
            conn.execute(
                "INSERT INTO action_ledger
                    (action_id, run_id, decision_id, action_type, status, payload_json,
                     idempotency_key, safety_gate_passed, dry_run, created_at, ack_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    entry.action_id.as_str(),
                    entry.run_id.as_ref().map(RunId::as_str),
                    entry.decision_id.as_ref().map(DecisionId::as_str),
                    entry.action_type,
                    status_str(entry.status),
                    payload_json,
                    entry.idempotency_key,
                    entry.safety_gate_passed,
                    entry.dry_run,
                    entry.created_at,
                    entry.ack_at,
                ],
            )
        })?;
        Ok(())
    }

    /// Looks up an action-ledger row by its idempotency key.
    ///
    /// # Errors
    /// Returns [`StoreError`] on query or deserialization failure.
    pub fn action_ledger_by_idempotency(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<ActionLedgerEntry>, StoreError> {
        let conn = self.lock();
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT action_id, status, payload_json FROM action_ledger WHERE idempotency_key = ?1",
                params![idempotency_key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((action_id, _, _)) = row else {
            return Ok(None);
        };
        self.action_ledger_by_id(&action_id)
    }

    #[allow(clippy::type_complexity, reason = "raw row tuple is local to this one query")]
    fn action_ledger_by_id(&self, action_id: &str) -> Result<Option<ActionLedgerEntry>, StoreError> {
        let conn = self.lock();
        let raw: Option<(
            String,
            Option<String>,
            Option<String>,
            String,
            String,
            String,
            Option<String>,
            bool,
            bool,
            String,
            Option<String>,
        )> = conn
            .query_row(
                "SELECT action_id, run_id, decision_id, action_type, status, payload_json,
                        idempotency_key, safety_gate_passed, dry_run, created_at, ack_at
                 FROM action_ledger WHERE action_id = ?1",
                params![action_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                        row.get(10)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            action_id,
            run_id,
            decision_id,
            action_type,
            status_str,
            payload_json,
            idempotency_key,
            safety_gate_passed,
            dry_run,
            created_at,
            ack_at,
        )) = raw
        else {
            return Ok(None);
        };

        Ok(Some(ActionLedgerEntry {
            action_id: ActionId::new(action_id),
            run_id: run_id.map(RunId::new),
            decision_id: decision_id.map(DecisionId::new),
            action_type,
            status: parse_action_status(&status_str)?,
            payload: serde_json::from_str(&payload_json)?,
            idempotency_key,
            safety_gate_passed,
            dry_run,
            created_at,
            ack_at,
        }))
    }

    /// Marks an action as acknowledged, recording `ack_at`.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] on a write failure.
    pub fn action_ledger_ack(&self, action_id: &ActionId, ack_at: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        with_retry(|| {
            conn.execute(
                "UPDATE action_ledger SET status = 'ack', ack_at = ?1 WHERE action_id = ?2",
                params![ack_at, action_id.as_str()],
            )
        })?;
        Ok(())
    }
}

/// A baseline tagging request row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineRequest {
    /// Request identifier.
    pub request_id: String,
    /// Tag being requested.
    pub tag: String,
    /// Run the tag would point at if approved.
    pub run_id: RunId,
    /// Current status: `"pending"`, `"approved"`, or `"rejected"`.
    pub status: String,
    /// Identity of the requester, if known.
    pub requested_by: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

fn parse_status(raw: &str) -> Result<RunStatus, StoreError> {
    match raw {
        "PASS" => Ok(RunStatus::Pass),
        "PASS_WITH_DRIFT" => Ok(RunStatus::PassWithDrift),
        "FAIL" => Ok(RunStatus::Fail),
        "NO_METRICS" => Ok(RunStatus::NoMetrics),
        "NO_TEST" => Ok(RunStatus::NoTest),
        other => Err(StoreError::Invalid(format!("unknown run status '{other}'"))),
    }
}

const fn status_str(status: ActionStatus) -> &'static str {
    match status {
        ActionStatus::Pending => "pending",
        ActionStatus::Ack => "ack",
        ActionStatus::Blocked => "blocked",
        ActionStatus::IdempotentSkip => "idempotent_skip",
        ActionStatus::DryRun => "dry_run",
    }
}

fn parse_action_status(raw: &str) -> Result<ActionStatus, StoreError> {
    match raw {
        "pending" => Ok(ActionStatus::Pending),
        "ack" => Ok(ActionStatus::Ack),
        "blocked" => Ok(ActionStatus::Blocked),
        "idempotent_skip" => Ok(ActionStatus::IdempotentSkip),
        "dry_run" => Ok(ActionStatus::DryRun),
        other => Err(StoreError::Invalid(format!("unknown action status '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use driftgate_core::BuildInfo;
    use driftgate_core::RunTimestamps;

    use super::*;

    fn sample_meta(run_id: &str) -> RunMeta {
        RunMeta {
            run_id: RunId::new(run_id),
            program: Some("svc".to_string()),
            subsystem: Some("api".to_string()),
            test_name: Some("load_test".to_string()),
            environment: Some("staging".to_string()),
            build: BuildInfo::default(),
            timestamps: RunTimestamps::default(),
            source_system: None,
            correlation_id: None,
        }
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let reg = RunRegistry::open_in_memory().expect("open");
        let meta = sample_meta("run-1");
        reg.upsert_run(&meta, RunStatus::Pass, None, Some("hash-a")).expect("upsert");
        let (fetched_meta, status) = reg.get_run(&meta.run_id).expect("get").expect("present");
        assert_eq!(fetched_meta.run_id, meta.run_id);
        assert_eq!(status, RunStatus::Pass);
    }

    #[test]
    fn upsert_overwrites_status_and_baseline_only() {
        let reg = RunRegistry::open_in_memory().expect("open");
        let meta = sample_meta("run-2");
        reg.upsert_run(&meta, RunStatus::Pass, None, None).expect("first upsert");
        let baseline = RunId::new("run-1");
        reg.upsert_run(&meta, RunStatus::Fail, Some(&baseline), None).expect("second upsert");
        let (_, status) = reg.get_run(&meta.run_id).expect("get").expect("present");
        assert_eq!(status, RunStatus::Fail);
    }

    #[test]
    fn replace_metrics_is_atomic_overwrite() {
        let reg = RunRegistry::open_in_memory().expect("open");
        let meta = sample_meta("run-3");
        reg.upsert_run(&meta, RunStatus::Pass, None, None).expect("upsert");
        let mut rows = MetricMap::new();
        rows.insert(
            "latency_ms".to_string(),
            MetricValue { value: Some(12.0), unit: Some("ms".to_string()), tags: None },
        );
        reg.replace_metrics(&meta.run_id, &rows).expect("replace");
        let fetched = reg.fetch_metrics(&meta.run_id).expect("fetch");
        assert_eq!(fetched.len(), 1);

        let mut rows2 = MetricMap::new();
        rows2.insert(
            "error_rate".to_string(),
            MetricValue { value: Some(0.01), unit: None, tags: None },
        );
        reg.replace_metrics(&meta.run_id, &rows2).expect("replace again");
        let fetched2 = reg.fetch_metrics(&meta.run_id).expect("fetch again");
        assert_eq!(fetched2.len(), 1);
        assert!(fetched2.contains_key("error_rate"));
    }

    #[test]
    fn select_baseline_prefers_tag_then_last_pass_then_fallback() {
        let reg = RunRegistry::open_in_memory().expect("open");
        let meta = sample_meta("run-4");

        let no_runs = reg
            .select_baseline(&meta, &SelectionPolicy::default(), None)
            .expect("select");
        assert_eq!(no_runs.reason, SelectionReason::NoRuns);

        reg.upsert_run(&meta, RunStatus::Fail, None, None).expect("upsert fail run");
        let no_pass = reg
            .select_baseline(&meta, &SelectionPolicy::default(), None)
            .expect("select");
        assert_eq!(no_pass.reason, SelectionReason::NoPass);

        let fallback = reg
            .select_baseline(&meta, &SelectionPolicy { tag: None, fallback_latest: true }, None)
            .expect("select");
        assert_eq!(fallback.reason, SelectionReason::FallbackLatest);
        assert_eq!(fallback.baseline_run_id, Some(meta.run_id.clone()));

        let pass_meta = sample_meta("run-5");
        reg.upsert_run(&pass_meta, RunStatus::Pass, None, None).expect("upsert pass run");
        let last_pass = reg
            .select_baseline(&pass_meta, &SelectionPolicy::default(), None)
            .expect("select");
        assert_eq!(last_pass.reason, SelectionReason::LastPass);
        assert_eq!(last_pass.baseline_run_id, Some(pass_meta.run_id));
    }

    #[test]
    fn tag_selection_warns_on_registry_hash_mismatch() {
        let reg = RunRegistry::open_in_memory().expect("open");
        let meta = sample_meta("run-6");
        reg.upsert_run(&meta, RunStatus::Pass, None, None).expect("upsert");
        reg.set_tag("stable", &meta.run_id, Some("hash-a")).expect("set tag");

        let policy = SelectionPolicy { tag: Some("stable".to_string()), fallback_latest: false };
        let selection = reg.select_baseline(&meta, &policy, Some("hash-b")).expect("select");
        assert_eq!(selection.reason, SelectionReason::Tag);
        assert!(selection.warning.is_some());
    }

    #[test]
    fn baseline_request_transitions_once() {
        let reg = RunRegistry::open_in_memory().expect("open");
        let meta = sample_meta("run-7");
        reg.upsert_run(&meta, RunStatus::Pass, None, None).expect("upsert");
        reg.add_request("req-1", "stable", &meta.run_id, Some("alice")).expect("add request");
        reg.add_approval("req-1", "alice").expect("approve");
        reg.add_approval("req-1", "alice").expect("duplicate approval is a no-op");
        assert_eq!(reg.count_approvals("req-1").expect("count"), 1);
        reg.set_status("req-1", "approved").expect("approve request");
        let err = reg.set_status("req-1", "rejected").expect_err("already resolved");
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn action_ledger_idempotency_lookup_round_trips() {
        let reg = RunRegistry::open_in_memory().expect("open");
        let entry = ActionLedgerEntry {
            action_id: ActionId::new("act-1"),
            run_id: None,
            decision_id: None,
            action_type: "notify".to_string(),
            status: ActionStatus::Pending,
            payload: serde_json::json!({"channel": "pager"}),
            idempotency_key: Some("idem-1".to_string()),
            safety_gate_passed: true,
            dry_run: false,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            ack_at: None,
        };
        reg.action_ledger_insert(&entry).expect("insert");
        let found = reg
            .action_ledger_by_idempotency("idem-1")
            .expect("lookup")
            .expect("present");
        assert_eq!(found.action_id, entry.action_id);
        reg.action_ledger_ack(&entry.action_id, "2026-01-01T00:05:00Z").expect("ack");
    }
}
