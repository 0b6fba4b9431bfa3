// crates/driftgate-broker/src/sink/channel.rs
// ============================================================================
// Module: Channel Sink
// Description: Delivers alerts into a Tokio mpsc channel for an in-process
//              consumer.
// Purpose: Fan alerts out to an async consumer (CLI `runtime` view, tests)
//          without coupling the daemon loop to that consumer (§5).
// Dependencies: driftgate-core, tokio
// ============================================================================

//! ## Overview
//! Grounded on the teacher's `sink/channel.rs`, generalized from dispatch
//! messages to [`AlertEvent`]s.
//!
//! Invariants:
//! - A successful `emit` enqueues exactly one event.
//! - A full or closed channel is a delivery failure, never a silent drop.

use tokio::sync::mpsc::Sender;

use crate::event::AlertEvent;
use crate::sink::ReceiptFactory;
use crate::sink::Sink;
use crate::sink::SinkError;

use super::AlertReceipt;

/// Alert sink that sends events into a `tokio::sync::mpsc` channel.
pub struct ChannelSink {
    sender: Sender<AlertEvent>,
    receipts: ReceiptFactory,
}

impl ChannelSink {
    /// Creates a channel sink over `sender`.
    #[must_use]
    pub fn new(sender: Sender<AlertEvent>) -> Self {
        Self { sender, receipts: ReceiptFactory::new("channel") }
    }
}

impl Sink for ChannelSink {
    fn emit(&self, event: &AlertEvent) -> Result<AlertReceipt, SinkError> {
        self.sender.try_send(event.clone()).map_err(|err| SinkError::DeliveryFailed(err.to_string()))?;
        Ok(self.receipts.next())
    }
}

#[cfg(test)]
mod tests {
    use driftgate_core::EventTime;
    use driftgate_core::RunId;
    use driftgate_core::RunStatus;
    use tokio::sync::mpsc::channel;

    use super::*;

    fn sample_event() -> AlertEvent {
        AlertEvent {
            timestamp: EventTime::from_unix_seconds(0),
            severity: "warning".to_string(),
            status: RunStatus::PassWithDrift,
            run_id: RunId::new("run-1".to_string()),
            primary_issue: None,
            report_path: None,
            drift_metrics: vec![],
        }
    }

    #[test]
    fn emit_enqueues_the_event() {
        let (tx, mut rx) = channel(4);
        let sink = ChannelSink::new(tx);
        sink.emit(&sample_event()).expect("emit");
        let received = rx.try_recv().expect("recv");
        assert_eq!(received.run_id, RunId::new("run-1".to_string()));
    }

    #[test]
    fn emit_reports_failure_on_full_channel() {
        let (tx, _rx) = channel(1);
        let sink = ChannelSink::new(tx);
        sink.emit(&sample_event()).expect("first emit");
        let err = sink.emit(&sample_event()).unwrap_err();
        assert!(matches!(err, SinkError::DeliveryFailed(_)));
    }
}
