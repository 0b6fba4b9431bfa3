// crates/driftgate-core/src/core/time.rs
// ============================================================================
// Module: Driftgate Time Model
// Description: Canonical timestamp representations for events, decisions, and
//              audit records.
// Purpose: Keep replay and verification deterministic by never letting the
//          engine read wall-clock time itself.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Driftgate uses explicit time values embedded in events and records to keep
//! replay deterministic. The core engine never reads wall-clock time
//! directly; hosts (the daemon, the CLI) must supply timestamps.
//!
//! Invariants:
//! - Values are explicitly provided by callers; the core never reads
//!   wall-clock time.
//! - `EventTime` is seconds since the Unix epoch, matching the streaming
//!   evaluator's watermark arithmetic (`max_event_time - allowed_lateness_sec`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::error::CoreError;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Event-time value, seconds since the Unix epoch.
///
/// # Invariants
/// - No validation is performed; monotonicity across a stream is a caller
///   responsibility. Negative values are accepted (pre-epoch events are not
///   rejected, only unusual).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTime(i64);

impl EventTime {
    /// Creates an event time from seconds since the Unix epoch.
    #[must_use]
    pub const fn from_unix_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Returns the event time as seconds since the Unix epoch.
    #[must_use]
    pub const fn unix_seconds(self) -> i64 {
        self.0
    }

    /// Returns the event time shifted back by `delta_sec`, saturating at `i64::MIN`.
    #[must_use]
    pub fn minus_seconds(self, delta_sec: i64) -> Self {
        Self(self.0.saturating_sub(delta_sec))
    }

    /// Parses an RFC 3339 timestamp string into an `EventTime`.
    ///
    /// # Errors
    /// Returns [`CoreError::Parse`] when `text` is not valid RFC 3339.
    pub fn parse_rfc3339(text: &str) -> Result<Self, CoreError> {
        let parsed = OffsetDateTime::parse(text, &Rfc3339)
            .map_err(|source| CoreError::Parse(format!("invalid RFC3339 timestamp: {source}")))?;
        Ok(Self(parsed.unix_timestamp()))
    }

    /// Formats the event time as an RFC 3339 string (UTC).
    ///
    /// # Errors
    /// Returns [`CoreError::Parse`] if the underlying value cannot be
    /// represented (practically unreachable for in-range `i64` seconds).
    pub fn to_rfc3339(self) -> Result<String, CoreError> {
        let dt = OffsetDateTime::from_unix_timestamp(self.0)
            .map_err(|source| CoreError::Parse(format!("out-of-range timestamp: {source}")))?;
        dt.format(&Rfc3339)
            .map_err(|source| CoreError::Parse(format!("failed to format timestamp: {source}")))
    }
}

impl From<i64> for EventTime {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::EventTime;

    #[test]
    fn rfc3339_round_trips() {
        let original = EventTime::from_unix_seconds(1_700_000_000);
        let text = original.to_rfc3339().expect("format");
        let parsed = EventTime::parse_rfc3339(&text).expect("parse");
        assert_eq!(original, parsed);
    }

    #[test]
    fn minus_seconds_saturates() {
        let t = EventTime::from_unix_seconds(5);
        assert_eq!(t.minus_seconds(10).unix_seconds(), -5);
        assert_eq!(EventTime::from_unix_seconds(i64::MIN).minus_seconds(1).unix_seconds(), i64::MIN);
    }
}
