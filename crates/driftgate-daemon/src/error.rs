// crates/driftgate-daemon/src/error.rs
// ============================================================================
// Module: Daemon Error
// Description: Error taxonomy for the orchestrator loop.
// Purpose: Fold every collaborator's error type into one the daemon loop can
//          match on for the "never let one bad cycle kill the loop" policy.
// Dependencies: driftgate-action, driftgate-baseline, driftgate-broker,
//              driftgate-config, driftgate-core, driftgate-evidence,
//              driftgate-store-sqlite, thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised while loading daemon config or running a single cycle.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// A config file could not be loaded or parsed.
    #[error("config error: {0}")]
    Config(#[from] driftgate_config::ConfigError),

    /// The run registry returned an error.
    #[error("store error: {0}")]
    Store(#[from] driftgate_store_sqlite::StoreError),

    /// The core engine returned an error (registry load, hashing).
    #[error("core error: {0}")]
    Core(#[from] driftgate_core::CoreError),

    /// Baseline governance returned an error.
    #[error("baseline error: {0}")]
    Baseline(#[from] driftgate_baseline::BaselineError),

    /// The action engine returned an error.
    #[error("action error: {0}")]
    Action(#[from] driftgate_action::ActionError),

    /// Evidence export, the decision record, or the audit log failed.
    #[error("evidence error: {0}")]
    Evidence(#[from] driftgate_evidence::EvidenceError),

    /// The ingest source failed to connect or read.
    #[error("ingest source error: {0}")]
    Source(#[from] driftgate_broker::SourceError),

    /// A report, checkpoint, or idempotency file could not be written.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A checkpoint or report artifact failed to (de)serialize.
    #[error("failed to (de)serialize {path}: {source}")]
    Json {
        /// Path associated with the failure.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The circuit breaker is open; the cycle was skipped.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The ingest buffer held no usable telemetry for a cycle.
    #[error("no metrics available for this cycle")]
    NoMetrics,
}
