// crates/driftgate-streaming/src/event_time.rs
// ============================================================================
// Module: Event-Time Clock
// Description: Tracks the event-time watermark and classifies events as
//              on-time or late.
// Purpose: Implement C5's "Watermark policy" (§4.5).
// Dependencies: (none beyond std)
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/streaming/event_time.py`'s
//! `EventTimeClock`/`WatermarkPolicy`.

/// How the engine handles an event whose `event_time` is behind the
/// watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateEventPolicy {
    /// Discard the event entirely.
    Drop,
    /// Hold the event until the next window close.
    Buffer,
    /// Emit the event to a separate channel instead of the main aggregator.
    SideOutput,
}

/// Parameters controlling watermark advancement and late-event handling
/// (§4.5 "Watermark policy").
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WatermarkPolicy {
    /// Watermark lags the maximum observed event time by this many seconds.
    pub allowed_lateness_sec: f64,
    /// Minimum spacing between watermark advances (informational; this
    /// implementation advances eagerly and records the interval for
    /// parity with the original).
    pub watermark_interval_sec: f64,
    /// How to handle an event that arrives after the watermark has passed it.
    pub late_event_policy: LateEventPolicy,
}

impl Default for WatermarkPolicy {
    fn default() -> Self {
        Self {
            allowed_lateness_sec: 60.0,
            watermark_interval_sec: 1.0,
            late_event_policy: LateEventPolicy::Drop,
        }
    }
}

/// Outcome of classifying one event against the current watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDecision {
    /// The event is on-time; the caller should fold it into the aggregator.
    Accept,
    /// The event is late and the policy says to discard it.
    Drop,
    /// The event is late and the policy says to buffer it.
    Buffer,
    /// The event is late and the policy says to side-output it.
    SideOutput,
}

/// Tracks the event-time watermark for one stream.
///
/// # Invariants
/// - The watermark is monotonically non-decreasing: it only ever advances as
///   `max_event_time` advances (§4.5: `W = max_event_time − allowed_lateness_sec`).
#[derive(Debug, Clone)]
pub struct EventTimeClock {
    policy: WatermarkPolicy,
    max_event_time: Option<f64>,
    watermark: Option<f64>,
}

impl EventTimeClock {
    /// Creates a clock governed by `policy`.
    #[must_use]
    pub const fn new(policy: WatermarkPolicy) -> Self {
        Self { policy, max_event_time: None, watermark: None }
    }

    /// Current watermark, if any event has been observed.
    #[must_use]
    pub const fn watermark(&self) -> Option<f64> {
        self.watermark
    }

    /// Maximum event time observed so far.
    #[must_use]
    pub const fn max_event_time(&self) -> Option<f64> {
        self.max_event_time
    }

    /// Observes `event_time`, advancing `max_event_time` and the watermark.
    pub fn update(&mut self, event_time: f64) {
        let max = self.max_event_time.map_or(event_time, |current| current.max(event_time));
        self.max_event_time = Some(max);
        let candidate = max - self.policy.allowed_lateness_sec;
        self.watermark = Some(self.watermark.map_or(candidate, |current| current.max(candidate)));
    }

    /// Whether `event_time` is behind the current watermark.
    #[must_use]
    pub fn is_late(&self, event_time: f64) -> bool {
        self.watermark.is_some_and(|w| event_time < w)
    }

    /// Classifies `event_time`, updating internal state for accepted events.
    pub fn decide(&mut self, event_time: f64) -> EventDecision {
        if !self.is_late(event_time) {
            self.update(event_time);
            return EventDecision::Accept;
        }
        match self.policy.late_event_policy {
            LateEventPolicy::Drop => EventDecision::Drop,
            LateEventPolicy::Buffer => EventDecision::Buffer,
            LateEventPolicy::SideOutput => EventDecision::SideOutput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watermark_lags_max_event_time_by_allowed_lateness() {
        let mut clock = EventTimeClock::new(WatermarkPolicy { allowed_lateness_sec: 10.0, ..WatermarkPolicy::default() });
        clock.update(100.0);
        assert_eq!(clock.watermark(), Some(90.0));
    }

    #[test]
    fn watermark_never_regresses_on_out_of_order_updates() {
        let mut clock = EventTimeClock::new(WatermarkPolicy { allowed_lateness_sec: 10.0, ..WatermarkPolicy::default() });
        clock.update(100.0);
        clock.update(50.0);
        assert_eq!(clock.watermark(), Some(90.0));
    }

    #[test]
    fn decide_drops_late_events_under_drop_policy() {
        let mut clock = EventTimeClock::new(WatermarkPolicy { allowed_lateness_sec: 10.0, ..WatermarkPolicy::default() });
        clock.update(100.0);
        assert_eq!(clock.decide(50.0), EventDecision::Drop);
    }

    #[test]
    fn decide_buffers_late_events_under_buffer_policy() {
        let mut clock = EventTimeClock::new(WatermarkPolicy {
            allowed_lateness_sec: 10.0,
            late_event_policy: LateEventPolicy::Buffer,
            ..WatermarkPolicy::default()
        });
        clock.update(100.0);
        assert_eq!(clock.decide(50.0), EventDecision::Buffer);
    }
}
