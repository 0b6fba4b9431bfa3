// crates/driftgate-streaming/src/snapshot.rs
// ============================================================================
// Module: Decision Snapshot
// Description: Immutable record of a single streaming decision's inputs,
//              config, and payload, for replay and audit.
// Purpose: Implement C5's `DecisionSnapshot` type (§4.5 "Emit").
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/streaming/snapshot.py`'s
//! `DecisionSnapshot`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// What window and watermark state produced a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSliceRef {
    /// Start of the window the decision was computed over, if any.
    pub window_start_sec: Option<f64>,
    /// End of the window the decision was computed over, if any.
    pub window_end_sec: Option<f64>,
    /// Watermark at decision time, if any.
    pub watermark_sec: Option<f64>,
    /// Number of metrics present in the window's aggregates.
    pub metric_count: usize,
}

/// Decision output embedded in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionPayload {
    /// Resulting status string (e.g. `"PASS"`, `"FAIL"`).
    pub status: String,
    /// Canonical names of metrics that drifted.
    #[serde(default)]
    pub drift_metrics: Vec<String>,
    /// Canonical names of metrics that failed.
    #[serde(default)]
    pub fail_metrics: Vec<String>,
    /// Canonical names of metrics with invariant violations.
    #[serde(default)]
    pub invariant_violations: Vec<String>,
    /// Warnings emitted during comparison.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Immutable record of one streaming decision (§4.5 "Emit").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSnapshot {
    /// Unique decision identifier.
    pub decision_id: String,
    /// RFC 3339 UTC timestamp.
    pub ts_utc: String,
    /// Input slice this decision was computed from.
    pub input_slice_ref: InputSliceRef,
    /// Config file hashes in effect at decision time.
    pub config_ref: BTreeMap<String, String>,
    /// Code/build reference in effect at decision time.
    pub code_ref: BTreeMap<String, String>,
    /// Decision output.
    pub decision_payload: DecisionPayload,
    /// Wall-clock time spent producing this decision, in seconds.
    #[serde(default)]
    pub decision_latency_sec: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = DecisionSnapshot {
            decision_id: "dec-1".to_string(),
            ts_utc: "2026-07-28T00:00:00Z".to_string(),
            input_slice_ref: InputSliceRef {
                window_start_sec: Some(10.0),
                window_end_sec: Some(20.0),
                watermark_sec: Some(19.0),
                metric_count: 2,
            },
            config_ref: BTreeMap::new(),
            code_ref: BTreeMap::new(),
            decision_payload: DecisionPayload { status: "PASS".to_string(), ..DecisionPayload::default() },
            decision_latency_sec: Some(0.004),
        };
        let encoded = serde_json::to_string(&snapshot).expect("serialize");
        let decoded: DecisionSnapshot = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, snapshot);
    }
}
