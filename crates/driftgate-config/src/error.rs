// crates/driftgate-config/src/error.rs
// ============================================================================
// Module: Config Errors
// Description: Error taxonomy for loading and validating YAML configuration.
// Purpose: Distinguish "file missing/unreadable" from "file present but
//          semantically invalid" so callers can react appropriately.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every loader in this crate returns [`ConfigError`]; none of them panic on
//! malformed input.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file was read but was not valid YAML.
    #[error("failed to parse {path} as YAML: {source}")]
    Yaml {
        /// Path that failed to parse.
        path: String,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed but failed semantic validation.
    #[error("invalid configuration in {path}: {reason}")]
    Invalid {
        /// Path that failed validation.
        path: String,
        /// Human-readable reason.
        reason: String,
    },
}
