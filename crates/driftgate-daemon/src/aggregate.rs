// crates/driftgate-daemon/src/aggregate.rs
// ============================================================================
// Module: Buffer Aggregation
// Description: Folds a window of buffered ingest events into the raw metric
//              map the compare engine expects.
// Purpose: Implement `run_daemon_cycle`'s `aggregate_to_metrics(strategy=
//          "last")` step ahead of normalization.
// Dependencies: driftgate-core, driftgate-broker
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/daemon.py::run_daemon_cycle`, which folds
//! the ingest buffer with `strategy="last"`: the most recently buffered
//! value for a metric wins, carrying its unit along.
//!
//! Invariants:
//! - Iteration order is the buffer's arrival order; later events overwrite
//!   earlier ones for the same metric.

use driftgate_broker::IngestEvent;
use driftgate_core::RawMetrics;

/// Folds buffered events into [`RawMetrics`], last value per metric wins.
#[must_use]
pub fn aggregate_last(buffer: &[IngestEvent]) -> RawMetrics {
    let mut out = RawMetrics::new();
    for event in buffer {
        let mut entry = serde_json::Map::new();
        entry.insert("value".to_string(), serde_json::json!(event.value));
        if let Some(unit) = &event.unit {
            entry.insert("unit".to_string(), serde_json::json!(unit));
        }
        out.insert(event.metric.clone(), serde_json::Value::Object(entry));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftgate_core::EventTime;

    fn event(metric: &str, value: f64) -> IngestEvent {
        IngestEvent { timestamp: EventTime::from_unix_seconds(0), metric: metric.to_string(), value, unit: None }
    }

    #[test]
    fn later_events_overwrite_earlier_values_for_the_same_metric() {
        let buffer = vec![event("latency_ms", 10.0), event("latency_ms", 20.0)];
        let aggregated = aggregate_last(&buffer);
        assert_eq!(aggregated.get("latency_ms").and_then(|v| v.get("value")).and_then(serde_json::Value::as_f64), Some(20.0));
    }

    #[test]
    fn empty_buffer_yields_an_empty_map() {
        assert!(aggregate_last(&[]).is_empty());
    }
}
