// crates/driftgate-broker/src/sink/mod.rs
// ============================================================================
// Module: Alert Sinks
// Description: Sink trait and reference implementations for alert delivery.
// Purpose: Deliver alert events emitted by C8's daemon loop (§4.8, §9
//          "Polymorphism").
// Dependencies: driftgate-core, thiserror, std
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/alerting/sinks/base.py`'s `AlertSink`.
//! Alert sinks are a closed, tagged-union set (spec.md §9): a single `emit`
//! operation, not open inheritance. MQTT/Kafka-backed sinks are out of core
//! scope and not implemented here.
//!
//! Invariants:
//! - `emit` either delivers the alert and returns a receipt, or returns
//!   [`SinkError`]; it never partially delivers.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use thiserror::Error;

use crate::event::AlertEvent;

/// Errors emitted by alert sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Delivery to the sink's target failed.
    #[error("alert delivery failed: {0}")]
    DeliveryFailed(String),
    /// A log- or file-backed sink failed to write its record.
    #[error("log write failed: {0}")]
    LogWriteFailed(String),
}

/// Delivers an alert event to a concrete destination.
pub trait Sink: Send + Sync {
    /// Emits `event`.
    ///
    /// # Errors
    /// Returns [`SinkError`] when delivery fails.
    fn emit(&self, event: &AlertEvent) -> Result<AlertReceipt, SinkError>;
}

/// Receipt returned by a successful [`Sink::emit`], for the daemon's audit
/// trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertReceipt {
    pub sink: String,
    pub seq: u64,
}

/// Builds deterministic receipts for a sink, keyed by a monotonic counter.
pub(crate) struct ReceiptFactory {
    sink: String,
    counter: AtomicU64,
}

impl ReceiptFactory {
    pub(crate) fn new(sink: impl Into<String>) -> Self {
        Self { sink: sink.into(), counter: AtomicU64::new(0) }
    }

    pub(crate) fn next(&self) -> AlertReceipt {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        AlertReceipt { sink: self.sink.clone(), seq }
    }
}

pub mod channel;
pub mod log;
pub mod stdout;
pub mod webhook;

pub use channel::ChannelSink;
pub use log::LogSink;
pub use stdout::StdoutSink;
pub use webhook::WebhookSink;
pub use webhook::WebhookSinkPolicy;
