// crates/driftgate-core/src/core/error.rs
// ============================================================================
// Module: Driftgate Core Errors
// Description: Error taxonomy shared by the registry and decision engine.
// Purpose: Give callers stable, programmatically matchable error variants
//          instead of ad-hoc strings.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! `CoreError` covers the subset of the workspace error taxonomy that the
//! registry and decision engine themselves raise: malformed configuration and
//! malformed input values. Durable-store, governance, and policy errors live
//! in their owning crates (`driftgate-store-sqlite`, `driftgate-baseline`,
//! `driftgate-action`) since only they can produce them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Errors raised while loading a metric registry or coercing raw metric data.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A registry or policy file was missing, unreadable, or not valid YAML.
    #[error("config error: {0}")]
    Config(String),

    /// A raw input value could not be coerced into the expected shape
    /// (e.g. a non-numeric metric value, a malformed timestamp).
    #[error("parse error: {0}")]
    Parse(String),
}
