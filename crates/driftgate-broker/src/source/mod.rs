// crates/driftgate-broker/src/source/mod.rs
// ============================================================================
// Module: Ingest Sources
// Description: Source trait and reference implementations for telemetry
//              ingest.
// Purpose: Read raw telemetry events for C8's daemon loop (§4.8, §9
//          "Polymorphism").
// Dependencies: driftgate-core, thiserror
// ============================================================================

//! ## Overview
//! Ingest sources are a closed, tagged-union set (spec.md §9): a fixed
//! `connect`/`read`/`close` operation set, not open inheritance. MQTT, Kafka,
//! and syslog drivers are named in spec.md as out-of-core-scope and are not
//! implemented here.
//!
//! Invariants:
//! - `read` never blocks indefinitely; `timeout_sec` bounds the wait.
//! - A source that has not been connected returns [`SourceError::NotConnected`].

use thiserror::Error;

use crate::event::IngestEvent;

/// Errors emitted by ingest sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backing resource could not be opened.
    #[error("failed to connect source: {0}")]
    ConnectFailed(String),
    /// `read`/`stream` was called before `connect`.
    #[error("source is not connected")]
    NotConnected,
    /// A line or record could not be parsed into an event.
    #[error("failed to parse event at {path}:{line}: {reason}")]
    Parse { path: String, line: usize, reason: String },
    /// Source reported an I/O failure after connecting.
    #[error("io failure: {0}")]
    Io(String),
}

/// Reads telemetry events from a backing store (file replay log, inline
/// fixture, or — out of core scope — a message broker topic).
///
/// # Invariants
/// - `close` is idempotent; calling it on an already-closed source is not an
///   error.
pub trait Source: Send + Sync {
    /// Opens the backing resource. Called once before any `read`.
    ///
    /// # Errors
    /// Returns [`SourceError::ConnectFailed`] when the resource cannot be
    /// opened.
    fn connect(&mut self) -> Result<(), SourceError>;

    /// Reads up to `limit` events, waiting at most `timeout_sec` for the
    /// first one to become available.
    ///
    /// # Errors
    /// Returns [`SourceError::NotConnected`] if called before `connect`, or
    /// [`SourceError::Parse`]/[`SourceError::Io`] on a malformed or
    /// unreadable record.
    fn read(&mut self, limit: usize, timeout_sec: Option<f64>) -> Result<Vec<IngestEvent>, SourceError>;

    /// Releases the backing resource. Safe to call multiple times.
    fn close(&mut self);
}

pub mod file_replay;
pub mod inline;

pub use file_replay::FileReplaySource;
pub use inline::InlineSource;
