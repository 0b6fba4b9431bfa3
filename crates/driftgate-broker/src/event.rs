// crates/driftgate-broker/src/event.rs
// ============================================================================
// Module: Broker Events
// Description: Telemetry events read from an ingest source and alert events
//              handed to an alert sink.
// Purpose: Shared data model between the source and sink implementations.
// Dependencies: driftgate-core, serde
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/ingest/sources/base.py`'s event dict
//! shape and `original_source/hb/alerting/sinks/base.py`'s `emit` event
//! shape.
//!
//! Invariants:
//! - Neither event type reads the wall clock; `timestamp` always comes from
//!   the source or the caller driving the daemon loop.

use driftgate_core::EventTime;
use driftgate_core::RunId;
use driftgate_core::RunStatus;
use serde::Deserialize;
use serde::Serialize;

/// A single raw telemetry reading read from an ingest source.
///
/// # Invariants
/// - `metric` is the raw (pre-alias-resolution) metric name; normalization
///   happens downstream in `driftgate-core`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestEvent {
    pub timestamp: EventTime,
    pub metric: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

/// An alert handed to a [`crate::sink::Sink`] after a decision cycle.
///
/// # Invariants
/// - `drift_metrics` lists metric names only; per-metric detail lives in the
///   decision record the alert references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub timestamp: EventTime,
    pub severity: String,
    pub status: RunStatus,
    pub run_id: RunId,
    #[serde(default)]
    pub primary_issue: Option<String>,
    #[serde(default)]
    pub report_path: Option<String>,
    #[serde(default)]
    pub drift_metrics: Vec<String>,
}
