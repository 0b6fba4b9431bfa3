// crates/driftgate-broker/src/sink/log.rs
// ============================================================================
// Module: Log Sink
// Description: Appends each alert as a JSON line to a writer.
// Purpose: Implement the file-backed alert sink named in spec.md §4.8.
// Dependencies: serde_json, std
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/alerting/sinks/file_sink.py`'s
//! `FileSink`, generalized (per the teacher's own `LogSink`) to any
//! `Write + Send` destination rather than a hardcoded path.
//!
//! Invariants:
//! - Each `emit` call appends exactly one JSON object followed by a newline.

use std::io::Write;
use std::sync::Mutex;

use serde_json::json;

use crate::event::AlertEvent;
use crate::sink::ReceiptFactory;
use crate::sink::Sink;
use crate::sink::SinkError;

use super::AlertReceipt;

/// Alert sink that appends one JSON record per line to a writer.
pub struct LogSink<W: Write + Send> {
    writer: Mutex<W>,
    receipts: ReceiptFactory,
}

impl<W: Write + Send> LogSink<W> {
    /// Creates a log sink over `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer), receipts: ReceiptFactory::new("log") }
    }
}

impl<W: Write + Send> Sink for LogSink<W> {
    fn emit(&self, event: &AlertEvent) -> Result<AlertReceipt, SinkError> {
        let receipt = self.receipts.next();
        let record = json!({
            "sink": receipt.sink,
            "seq": receipt.seq,
            "ts": event.timestamp,
            "severity": event.severity,
            "status": event.status,
            "run_id": event.run_id,
            "primary_issue": event.primary_issue,
            "report_path": event.report_path,
            "drift_metrics": event.drift_metrics,
        });
        let mut guard = self.writer.lock().map_err(|_| SinkError::LogWriteFailed("log writer mutex poisoned".to_string()))?;
        serde_json::to_writer(&mut *guard, &record).map_err(|err| SinkError::LogWriteFailed(err.to_string()))?;
        guard.write_all(b"\n").map_err(|err| SinkError::LogWriteFailed(err.to_string()))?;
        drop(guard);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use driftgate_core::EventTime;
    use driftgate_core::RunId;
    use driftgate_core::RunStatus;

    use super::*;

    fn sample_event() -> AlertEvent {
        AlertEvent {
            timestamp: EventTime::from_unix_seconds(0),
            severity: "critical".to_string(),
            status: RunStatus::Fail,
            run_id: RunId::new("run-1".to_string()),
            primary_issue: Some("error_rate breached fail threshold".to_string()),
            report_path: Some("/tmp/daemon_2026-07-28_0".to_string()),
            drift_metrics: vec!["error_rate".to_string()],
        }
    }

    #[test]
    fn emit_appends_one_json_line() {
        let sink = LogSink::new(Vec::new());
        sink.emit(&sample_event()).expect("emit");
        sink.emit(&sample_event()).expect("emit");
        let guard = sink.writer.lock().expect("lock");
        let text = String::from_utf8(guard.clone()).expect("utf8");
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().next().expect("line").contains("\"run_id\":\"run-1\""));
    }
}
