// crates/driftgate-store-sqlite/src/lib.rs
// ============================================================================
// Crate: driftgate-store-sqlite
// Description: Durable SQLite-backed run registry (C2).
// Purpose: Store runs, metrics, tags, baseline requests/approvals, and the
//          action ledger for `driftgate-daemon`, `driftgate-cli`, and
//          `driftgate-baseline`.
// Dependencies: driftgate-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The schema is additive-only (`src/schema.rs`); every mutating call is
//! serialized by a mutex-guarded connection (`src/registry.rs`) and retried
//! with bounded backoff on lock contention (`src/retry.rs`).
//!
//! Security posture: the database file is treated as trusted local storage;
//! callers are responsible for filesystem permissions on `path`.

pub mod error;
pub mod registry;
pub mod retry;
pub mod schema;

pub use crate::error::StoreError;
pub use crate::registry::BaselineRequest;
pub use crate::registry::BaselineSelection;
pub use crate::registry::RunRegistry;
pub use crate::registry::SelectionPolicy;
pub use crate::registry::SelectionReason;
