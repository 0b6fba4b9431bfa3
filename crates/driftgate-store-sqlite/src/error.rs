// crates/driftgate-store-sqlite/src/error.rs
// ============================================================================
// Module: Store Errors
// Description: Error taxonomy for the SQLite-backed run registry.
// Purpose: Distinguish transient lock contention (retried internally) from
//          durable failures callers must handle.
// Dependencies: rusqlite, thiserror
// ============================================================================

//! ## Overview
//! [`StoreError::Busy`] is only ever returned after the bounded retry in
//! [`crate::retry::with_retry`] has been exhausted; callers never need to
//! retry it themselves.

use thiserror::Error;

/// Errors raised by the run registry.
///
/// # Invariants
/// - Variants are stable for programmatic handling by `driftgate-daemon`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying `SQLite` connection returned an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The write remained locked out after the bounded retry budget.
    #[error("registry locked after retry budget exhausted")]
    Busy,

    /// A value failed to (de)serialize to/from its stored JSON representation.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller supplied a semantically invalid argument.
    #[error("invalid argument: {0}")]
    Invalid(String),
}
