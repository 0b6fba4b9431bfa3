// crates/driftgate-store-sqlite/src/schema.rs
// ============================================================================
// Module: Schema Migrations
// Description: Additive-only `SQLite` schema for the run registry.
// Purpose: Create and evolve the on-disk schema via `PRAGMA user_version`.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! Migrations are additive-only: later versions may add tables or columns,
//! never drop or rename one (§4.2 "Concurrency": "add-column-if-missing is
//! the only permitted automatic migration").

use rusqlite::Connection;

use crate::error::StoreError;

/// Current schema version. Bump when adding a migration step.
pub const SCHEMA_VERSION: i64 = 1;

const MIGRATION_V1: &str = r"
CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    meta_json TEXT NOT NULL,
    status TEXT NOT NULL,
    baseline_run_id TEXT,
    registry_hash TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_program_subsystem_test
    ON runs (
        json_extract(meta_json, '$.program'),
        json_extract(meta_json, '$.subsystem'),
        json_extract(meta_json, '$.test_name'),
        created_at
    );

CREATE TABLE IF NOT EXISTS metrics (
    run_id TEXT NOT NULL,
    name TEXT NOT NULL,
    value_json TEXT NOT NULL,
    PRIMARY KEY (run_id, name),
    FOREIGN KEY (run_id) REFERENCES runs (run_id)
);

CREATE TABLE IF NOT EXISTS tags (
    tag TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    registry_hash TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS baseline_requests (
    request_id TEXT PRIMARY KEY,
    tag TEXT NOT NULL,
    run_id TEXT NOT NULL,
    status TEXT NOT NULL,
    requested_by TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS baseline_approvals (
    request_id TEXT NOT NULL,
    approver TEXT NOT NULL,
    approved_at TEXT NOT NULL,
    PRIMARY KEY (request_id, approver),
    FOREIGN KEY (request_id) REFERENCES baseline_requests (request_id)
);

CREATE TABLE IF NOT EXISTS action_ledger (
    action_id TEXT PRIMARY KEY,
    run_id TEXT,
    decision_id TEXT,
    action_type TEXT NOT NULL,
    status TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    idempotency_key TEXT,
    safety_gate_passed INTEGER NOT NULL,
    dry_run INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    ack_at TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_action_ledger_idempotency
    ON action_ledger (idempotency_key)
    WHERE idempotency_key IS NOT NULL;
";

/// Applies every migration step up to [`SCHEMA_VERSION`] that has not yet
/// been applied to `conn`, tracked via `PRAGMA user_version`.
///
/// # Errors
/// Returns [`StoreError::Sqlite`] if any migration statement fails.
pub fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current < 1 {
        conn.execute_batch(MIGRATION_V1)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open");
        migrate(&conn).expect("first migrate");
        migrate(&conn).expect("second migrate is a no-op");
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .expect("read version");
        assert_eq!(version, SCHEMA_VERSION);
    }
}
