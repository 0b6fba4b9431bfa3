// crates/driftgate-streaming/src/lib.rs
// ============================================================================
// Module: Streaming Evaluator (C5)
// Description: Event-time windowing, watermarks, and continuous decision
//              emission over a live telemetry stream.
// Purpose: Crate root for the streaming evaluation component.
// Dependencies: driftgate-core, serde
// ============================================================================

//! ## Overview
//! Turns a stream of telemetry events into a sequence of windowed decision
//! snapshots. Watermark tracking governs which events are on-time and which
//! window is considered closed; the sliding-window aggregator folds accepted
//! events into overlapping buckets; the evaluator compares each closed
//! window's aggregates against a baseline and records decision latency.
//!
//! Invariants:
//! - The watermark is monotonically non-decreasing for the lifetime of a
//!   clock.
//! - An event lands in every window bucket whose range contains it, not just
//!   one.
//! - `emit_decision` never mutates window state; pruning is explicit.

pub mod event_time;
pub mod evaluator;
pub mod latency;
pub mod snapshot;
pub mod window;

pub use crate::event_time::EventDecision;
pub use crate::event_time::EventTimeClock;
pub use crate::event_time::LateEventPolicy;
pub use crate::event_time::WatermarkPolicy;
pub use crate::evaluator::StreamEvent;
pub use crate::evaluator::StreamingEvaluator;
pub use crate::latency::LatencyRecorder;
pub use crate::latency::DEFAULT_MAX_SAMPLES;
pub use crate::snapshot::DecisionPayload;
pub use crate::snapshot::DecisionSnapshot;
pub use crate::snapshot::InputSliceRef;
pub use crate::window::SlidingWindowAggregator;
pub use crate::window::WindowSpec;
pub use crate::window::mean_aggregate;
