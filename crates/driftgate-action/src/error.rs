// crates/driftgate-action/src/error.rs
// ============================================================================
// Module: Action Engine Errors
// Description: Failure modes for action-ledger writes.
// Purpose: Wrap the store crate's error for C6 callers.
// Dependencies: driftgate-store-sqlite, thiserror
// ============================================================================

use thiserror::Error;

/// Errors surfaced by the action engine.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action ledger could not be read or written.
    #[error("action ledger error: {0}")]
    Store(#[from] driftgate_store_sqlite::StoreError),
}
