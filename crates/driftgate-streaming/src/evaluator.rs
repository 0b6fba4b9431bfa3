// crates/driftgate-streaming/src/evaluator.rs
// ============================================================================
// Module: Streaming Evaluator
// Description: Consumes a stream of events, maintains sliding windows, and
//              emits continuous decision snapshots with latency tracking.
// Purpose: Implement C5's `process_event`/`emit_decision`/`prune` operations
//          (§4.5).
// Dependencies: driftgate-core
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/streaming/evaluator.py`'s
//! `StreamingEvaluator`.

use std::collections::BTreeMap;

use driftgate_core::CompareOptions;
use driftgate_core::MetricMap;
use driftgate_core::MetricRegistry;
use driftgate_core::MetricValue;
use driftgate_core::compare_metrics;

use crate::event_time::EventDecision;
use crate::event_time::EventTimeClock;
use crate::event_time::WatermarkPolicy;
use crate::latency::LatencyRecorder;
use crate::snapshot::DecisionPayload;
use crate::snapshot::DecisionSnapshot;
use crate::snapshot::InputSliceRef;
use crate::window::SlidingWindowAggregator;
use crate::window::WindowSpec;

/// One streaming telemetry event (§4.5 "Event").
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// Event time in seconds since epoch; `None` falls back to processing
    /// time supplied by the caller.
    pub event_time: Option<f64>,
    /// Raw metric name.
    pub metric: String,
    /// Metric value.
    pub value: f64,
}

/// Consumes events, maintains sliding windows, and emits decision snapshots
/// against a baseline.
pub struct StreamingEvaluator {
    window_spec: WindowSpec,
    clock: EventTimeClock,
    aggregator: SlidingWindowAggregator,
    latency: LatencyRecorder,
    deterministic_mode: bool,
    config_ref: BTreeMap<String, String>,
    code_ref: BTreeMap<String, String>,
}

impl StreamingEvaluator {
    /// Creates an evaluator for `window_spec`, optionally bounding memory to
    /// `max_buckets` windows.
    #[must_use]
    pub fn new(
        window_spec: WindowSpec,
        watermark_policy: WatermarkPolicy,
        max_buckets: Option<usize>,
        deterministic_mode: bool,
    ) -> Self {
        Self {
            window_spec,
            clock: EventTimeClock::new(watermark_policy),
            aggregator: SlidingWindowAggregator::new(window_spec, max_buckets),
            latency: LatencyRecorder::default(),
            deterministic_mode,
            config_ref: BTreeMap::new(),
            code_ref: BTreeMap::new(),
        }
    }

    /// Sets the config-hash references embedded in every future snapshot.
    pub fn set_config_ref(&mut self, config_ref: BTreeMap<String, String>) {
        self.config_ref = config_ref;
    }

    /// Sets the code/build references embedded in every future snapshot.
    pub fn set_code_ref(&mut self, code_ref: BTreeMap<String, String>) {
        self.code_ref = code_ref;
    }

    /// Current watermark.
    #[must_use]
    pub const fn watermark(&self) -> Option<f64> {
        self.clock.watermark()
    }

    /// Latency recorder for decision-emission timings.
    #[must_use]
    pub const fn latency(&self) -> &LatencyRecorder {
        &self.latency
    }

    /// Processes one event, classifying it against the watermark and, if
    /// accepted, folding it into the sliding-window aggregator.
    pub fn process_event(&mut self, event: &StreamEvent, processing_time: f64) -> EventDecision {
        let event_time = event.event_time.unwrap_or(processing_time);
        let decision = self.clock.decide(event_time);
        if decision == EventDecision::Accept {
            self.aggregator.add(event_time, &event.metric, event.value);
            self.aggregator.set_watermark(self.clock.watermark());
        }
        decision
    }

    /// Emits one decision from the current window's aggregates compared
    /// against `baseline`, or `None` if no window has data yet.
    ///
    /// `ts_utc` and `measure_latency` are supplied by the caller; this
    /// evaluator never reads wall-clock time itself, keeping replay
    /// deterministic.
    pub fn emit_decision(
        &mut self,
        baseline: &MetricMap,
        registry: &MetricRegistry,
        decision_id: String,
        ts_utc: String,
        measure_latency: impl FnOnce() -> f64,
    ) -> Option<DecisionSnapshot> {
        let watermark = self.clock.watermark();
        self.aggregator.set_watermark(watermark);
        let (window_start, aggregates) = self.aggregator.current_window()?;
        if aggregates.is_empty() {
            return None;
        }

        let mut current = MetricMap::new();
        for (metric, value) in &aggregates {
            current.insert(metric.clone(), MetricValue { value: Some(*value), unit: None, tags: None });
        }

        let outcome = compare_metrics(&current, baseline, registry, CompareOptions {
            deterministic: self.deterministic_mode,
            ..CompareOptions::default()
        });

        let latency_sec = measure_latency();
        self.latency.record(latency_sec);

        let mut drift_metrics: Vec<String> = outcome.drift.iter().map(|d| d.metric.clone()).collect();
        let mut invariant_violations: Vec<String> = outcome.invariants.iter().map(|v| v.metric.clone()).collect();
        if self.deterministic_mode {
            drift_metrics.sort();
            invariant_violations.sort();
        }

        Some(DecisionSnapshot {
            decision_id,
            ts_utc,
            input_slice_ref: InputSliceRef {
                window_start_sec: Some(window_start),
                window_end_sec: Some(window_start + self.window_spec.window_size_sec),
                watermark_sec: watermark,
                metric_count: current.len(),
            },
            config_ref: self.config_ref.clone(),
            code_ref: self.code_ref.clone(),
            decision_payload: DecisionPayload {
                status: outcome.status.as_str().to_string(),
                drift_metrics,
                fail_metrics: outcome.fail,
                invariant_violations,
                warnings: outcome.warnings,
            },
            decision_latency_sec: Some(latency_sec),
        })
    }

    /// Drops window state fully behind the current watermark.
    pub fn prune(&mut self) {
        if let Some(w) = self.clock.watermark() {
            self.aggregator.prune_before(w);
        }
    }
}

#[cfg(test)]
mod tests {
    use driftgate_core::MetricConfig;

    use super::*;

    fn registry_with(metric: &str, drift_threshold: f64) -> MetricRegistry {
        let mut metrics = std::collections::BTreeMap::new();
        metrics.insert(metric.to_string(), MetricConfig { drift_threshold: Some(drift_threshold), ..MetricConfig::default() });
        MetricRegistry::new("1.0".to_string(), metrics)
    }

    #[test]
    fn emits_decision_once_a_window_has_data() {
        let spec = WindowSpec { window_size_sec: 10.0, slide_sec: 5.0, align_epoch_sec: Some(0.0) };
        let mut evaluator = StreamingEvaluator::new(spec, WatermarkPolicy::default(), None, true);
        evaluator.process_event(&StreamEvent { event_time: Some(5.0), metric: "latency_ms".to_string(), value: 20.0 }, 5.0);

        let mut baseline = MetricMap::new();
        baseline.insert("latency_ms".to_string(), MetricValue { value: Some(10.0), unit: None, tags: None });
        let registry = registry_with("latency_ms", 5.0);

        let snapshot = evaluator.emit_decision(&baseline, &registry, "dec-1".to_string(), "2026-07-28T00:00:00Z".to_string(), || 0.001);
        assert!(snapshot.is_some());
    }

    #[test]
    fn no_window_data_yields_no_decision() {
        let spec = WindowSpec { window_size_sec: 10.0, slide_sec: 5.0, align_epoch_sec: Some(0.0) };
        let mut evaluator = StreamingEvaluator::new(spec, WatermarkPolicy::default(), None, true);
        let baseline = MetricMap::new();
        let registry = registry_with("latency_ms", 5.0);
        assert!(
            evaluator
                .emit_decision(&baseline, &registry, "dec-2".to_string(), "2026-07-28T00:00:00Z".to_string(), || 0.0)
                .is_none()
        );
    }
}
