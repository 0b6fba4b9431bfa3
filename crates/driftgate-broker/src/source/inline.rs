// crates/driftgate-broker/src/source/inline.rs
// ============================================================================
// Module: Inline Source
// Description: In-memory ingest source backed by a fixed event list.
// Purpose: Drive the daemon loop from fixtures in tests without touching
//          the filesystem.
// Dependencies: none
// ============================================================================

//! ## Overview
//! [`InlineSource`] hands back events from a pre-built `Vec`, one `read` call
//! at a time. There is no analogous driver in the original tool; this exists
//! purely so daemon and CLI tests can exercise the `Source` trait without a
//! file on disk.
//!
//! Invariants:
//! - Events are returned in the order they were supplied, never reordered.

use std::collections::VecDeque;

use crate::event::IngestEvent;
use crate::source::Source;
use crate::source::SourceError;

/// In-memory ingest source for tests and fixtures.
pub struct InlineSource {
    events: VecDeque<IngestEvent>,
    connected: bool,
}

impl InlineSource {
    /// Creates a source that will hand back `events` in order.
    #[must_use]
    pub fn new(events: Vec<IngestEvent>) -> Self {
        Self { events: events.into(), connected: false }
    }
}

impl Source for InlineSource {
    fn connect(&mut self) -> Result<(), SourceError> {
        self.connected = true;
        Ok(())
    }

    fn read(&mut self, limit: usize, _timeout_sec: Option<f64>) -> Result<Vec<IngestEvent>, SourceError> {
        if !self.connected {
            return Err(SourceError::NotConnected);
        }
        let mut out = Vec::with_capacity(limit.min(self.events.len()));
        while out.len() < limit {
            let Some(event) = self.events.pop_front() else { break };
            out.push(event);
        }
        Ok(out)
    }

    fn close(&mut self) {
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use driftgate_core::EventTime;

    use super::*;

    fn sample_event(metric: &str) -> IngestEvent {
        IngestEvent { timestamp: EventTime::from_unix_seconds(1_700_000_000), metric: metric.to_string(), value: 1.0, unit: None }
    }

    #[test]
    fn reads_events_in_order_and_respects_limit() {
        let mut source = InlineSource::new(vec![sample_event("a"), sample_event("b"), sample_event("c")]);
        source.connect().expect("connect");
        let first = source.read(2, None).expect("read");
        assert_eq!(first.iter().map(|e| e.metric.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        let second = source.read(2, None).expect("read");
        assert_eq!(second.iter().map(|e| e.metric.as_str()).collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn read_before_connect_fails() {
        let mut source = InlineSource::new(vec![sample_event("a")]);
        let err = source.read(1, None).unwrap_err();
        assert!(matches!(err, SourceError::NotConnected));
    }
}
