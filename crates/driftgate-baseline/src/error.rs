// crates/driftgate-baseline/src/error.rs
// ============================================================================
// Module: Baseline Errors
// Description: Error taxonomy for baseline governance.
// Purpose: Give callers a single typed error across selection, tagging,
//          quality scoring, and window-based baseline creation.
// Dependencies: driftgate-store-sqlite, thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by baseline governance operations.
#[derive(Debug, Error)]
pub enum BaselineError {
    /// The underlying run registry returned an error.
    #[error("store error: {0}")]
    Store(#[from] driftgate_store_sqlite::StoreError),

    /// A tagging governance rule was violated.
    #[error("governance violation: {0}")]
    Governance(String),

    /// No runs were available to aggregate into a window baseline.
    #[error("no runs available in window")]
    EmptyWindow,
}
