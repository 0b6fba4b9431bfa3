// crates/driftgate-evidence/src/error.rs
// ============================================================================
// Module: Evidence Errors
// Description: Error taxonomy for decision records, evidence packs, replay,
//              verification, the artifact manifest, and the audit log.
// Purpose: Distinguish missing/unreadable artifacts from malformed ones so
//          callers (the CLI, the daemon) can react appropriately.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by this crate.
///
/// # Invariants
/// - Variants are stable for programmatic handling by `driftgate-cli` and
///   `driftgate-daemon`.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// A file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A JSON artifact failed to serialize or deserialize.
    #[error("failed to (de)serialize {path}: {source}")]
    Json {
        /// Path associated with the failure.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A metrics CSV row was malformed.
    #[error("failed to parse metrics CSV {path}: {source}")]
    Csv {
        /// Path associated with the failure.
        path: String,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Building a zip archive failed.
    #[error("failed to build archive {path}: {source}")]
    Zip {
        /// Path associated with the failure.
        path: String,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// A required artifact was not found at the expected location.
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// A config loader failed.
    #[error("config error: {0}")]
    Config(#[from] driftgate_config::ConfigError),

    /// A registry operation failed.
    #[error("registry error: {0}")]
    Store(#[from] driftgate_store_sqlite::StoreError),
}
