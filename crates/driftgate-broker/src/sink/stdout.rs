// crates/driftgate-broker/src/sink/stdout.rs
// ============================================================================
// Module: Stdout Sink
// Description: Emits alerts as a structured log event instead of a bare
//              println.
// Purpose: Implement the default console alert sink (§6, §9).
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/alerting/sinks/stdout_sink.py`'s
//! `StdoutSink`, which prints `HB_ALERT <json>`. The workspace denies
//! `print_stdout`, so this emits the same information through `tracing`
//! instead, at `warn` for `FAIL` and `info` otherwise.

use tracing::info;
use tracing::warn;

use crate::event::AlertEvent;
use crate::sink::ReceiptFactory;
use crate::sink::Sink;
use crate::sink::SinkError;
use driftgate_core::RunStatus;

use super::AlertReceipt;

/// Alert sink that logs each alert through the `tracing` facade.
pub struct StdoutSink {
    receipts: ReceiptFactory,
}

impl StdoutSink {
    /// Creates a stdout sink.
    #[must_use]
    pub fn new() -> Self {
        Self { receipts: ReceiptFactory::new("stdout") }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for StdoutSink {
    fn emit(&self, event: &AlertEvent) -> Result<AlertReceipt, SinkError> {
        if event.status == RunStatus::Fail {
            warn!(run_id = %event.run_id, status = event.status.as_str(), primary_issue = ?event.primary_issue, "HB_ALERT");
        } else {
            info!(run_id = %event.run_id, status = event.status.as_str(), primary_issue = ?event.primary_issue, "HB_ALERT");
        }
        Ok(self.receipts.next())
    }
}

#[cfg(test)]
mod tests {
    use driftgate_core::EventTime;
    use driftgate_core::RunId;

    use super::*;

    #[test]
    fn emit_returns_a_receipt_per_call() {
        let sink = StdoutSink::new();
        let event = AlertEvent {
            timestamp: EventTime::from_unix_seconds(0),
            severity: "warning".to_string(),
            status: RunStatus::PassWithDrift,
            run_id: RunId::new("run-1".to_string()),
            primary_issue: None,
            report_path: None,
            drift_metrics: vec![],
        };
        let first = sink.emit(&event).expect("emit");
        let second = sink.emit(&event).expect("emit");
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
    }
}
