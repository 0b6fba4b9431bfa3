// crates/driftgate-broker/src/source/file_replay.rs
// ============================================================================
// Module: File Replay Source
// Description: Reads a JSONL/CSV telemetry event log from disk, one event
//              per line.
// Purpose: Implement the file-replay ingest driver named in spec.md §4.8's
//          "read from an ingest source (file replay, ...)" .
// Dependencies: driftgate-core, std
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/ingest/sources/file_replay.py`'s
//! `FileReplaySource`. Each line is either a JSON object
//! (`{"metric":..., "value":..., "timestamp"/"ts":..., "unit":...}`) or a
//! bare CSV row (`metric,value,unit` or `timestamp,metric,value,unit`). A
//! leading CSV header row is detected and skipped.
//!
//! Invariants:
//! - A line that is neither valid JSON nor a 3- or 4-column CSV row is a
//!   [`crate::source::SourceError::Parse`], not a silently dropped event.

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use driftgate_core::EventTime;
use serde_json::Value;

use crate::event::IngestEvent;
use crate::source::Source;
use crate::source::SourceError;

/// Replays a telemetry event log from disk, optionally pacing reads with a
/// fixed delay between lines.
///
/// # Invariants
/// - Lines are read in file order; the source never seeks backward.
pub struct FileReplaySource {
    path: PathBuf,
    delay_sec: f64,
    reader: Option<BufReader<File>>,
}

impl FileReplaySource {
    /// Creates a source over `path` with no inter-line delay.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), delay_sec: 0.0, reader: None }
    }

    /// Creates a source over `path` that sleeps `delay_sec` between events,
    /// mirroring a live feed's cadence.
    #[must_use]
    pub fn with_delay(path: impl Into<PathBuf>, delay_sec: f64) -> Self {
        Self { path: path.into(), delay_sec, reader: None }
    }
}

impl Source for FileReplaySource {
    fn connect(&mut self) -> Result<(), SourceError> {
        let file = File::open(&self.path)
            .map_err(|source| SourceError::ConnectFailed(format!("{}: {source}", self.path.display())))?;
        self.reader = Some(BufReader::new(file));
        Ok(())
    }

    fn read(&mut self, limit: usize, _timeout_sec: Option<f64>) -> Result<Vec<IngestEvent>, SourceError> {
        let path = self.path.clone();
        let delay_sec = self.delay_sec;
        let reader = self.reader.as_mut().ok_or(SourceError::NotConnected)?;

        let mut events = Vec::new();
        let mut line_no = 0usize;
        let mut line = String::new();
        while events.len() < limit {
            line.clear();
            let bytes_read = reader.read_line(&mut line).map_err(|source| SourceError::Io(source.to_string()))?;
            if bytes_read == 0 {
                break;
            }
            line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || is_csv_header(trimmed) {
                continue;
            }
            events.push(parse_line(trimmed, &path, line_no)?);
            if delay_sec > 0.0 {
                std::thread::sleep(Duration::from_secs_f64(delay_sec));
            }
        }
        Ok(events)
    }

    fn close(&mut self) {
        self.reader = None;
    }
}

/// Detects a CSV header row the way the original tool did: case-insensitive
/// presence of both "metric" and "value" as substrings.
fn is_csv_header(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    !line.starts_with('{') && lower.contains("metric") && lower.contains("value")
}

fn parse_line(line: &str, path: &Path, line_no: usize) -> Result<IngestEvent, SourceError> {
    if line.starts_with('{') {
        return parse_json_line(line, path, line_no);
    }
    parse_csv_line(line, path, line_no)
}

fn parse_json_line(line: &str, path: &Path, line_no: usize) -> Result<IngestEvent, SourceError> {
    let parse_err = |reason: String| SourceError::Parse { path: path.display().to_string(), line: line_no, reason };

    let value: Value = serde_json::from_str(line).map_err(|err| parse_err(err.to_string()))?;
    let metric = value
        .get("metric")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_err("missing \"metric\" field".to_string()))?
        .to_string();
    let event_value =
        value.get("value").and_then(Value::as_f64).ok_or_else(|| parse_err("missing or non-numeric \"value\" field".to_string()))?;
    let unit = value.get("unit").and_then(Value::as_str).map(str::to_string);
    let timestamp = match value.get("timestamp").or_else(|| value.get("ts")) {
        Some(ts) => parse_timestamp_value(ts).map_err(|reason| parse_err(reason))?,
        None => now_event_time(),
    };
    Ok(IngestEvent { timestamp, metric, value: event_value, unit })
}

fn parse_timestamp_value(ts: &Value) -> Result<EventTime, String> {
    if let Some(seconds) = ts.as_i64() {
        return Ok(EventTime::from_unix_seconds(seconds));
    }
    if let Some(text) = ts.as_str() {
        return EventTime::parse_rfc3339(text).map_err(|err| err.to_string());
    }
    Err("timestamp must be an RFC3339 string or an integer".to_string())
}

fn parse_csv_line(line: &str, path: &Path, line_no: usize) -> Result<IngestEvent, SourceError> {
    let parse_err = |reason: String| SourceError::Parse { path: path.display().to_string(), line: line_no, reason };
    let columns: Vec<&str> = line.split(',').map(str::trim).collect();

    let (timestamp, metric, value_col, unit) = match columns.as_slice() {
        [metric, value, unit] => (now_event_time(), (*metric).to_string(), *value, unit_or_none(unit)),
        [timestamp, metric, value, unit] => {
            let timestamp = parse_csv_timestamp(timestamp).map_err(|reason| parse_err(reason))?;
            (timestamp, (*metric).to_string(), *value, unit_or_none(unit))
        }
        _ => return Err(parse_err(format!("expected 3 or 4 CSV columns, got {}", columns.len()))),
    };

    let value = value_col.parse::<f64>().map_err(|err| parse_err(format!("invalid value column: {err}")))?;
    Ok(IngestEvent { timestamp, metric, value, unit })
}

fn unit_or_none(unit: &str) -> Option<String> {
    if unit.is_empty() { None } else { Some(unit.to_string()) }
}

fn parse_csv_timestamp(text: &str) -> Result<EventTime, String> {
    if let Ok(seconds) = text.parse::<i64>() {
        return Ok(EventTime::from_unix_seconds(seconds));
    }
    EventTime::parse_rfc3339(text).map_err(|err| err.to_string())
}

fn now_event_time() -> EventTime {
    let seconds = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX)).unwrap_or(0);
    EventTime::from_unix_seconds(seconds)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn reads_json_lines_in_order() {
        let file = write_temp("{\"metric\":\"error_rate\",\"value\":0.1,\"timestamp\":1700000000}\n{\"metric\":\"latency_ms\",\"value\":42.0,\"ts\":\"2023-11-14T22:13:20Z\"}\n");
        let mut source = FileReplaySource::new(file.path());
        source.connect().expect("connect");
        let events = source.read(10, None).expect("read");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].metric, "error_rate");
        assert_eq!(events[1].timestamp, EventTime::from_unix_seconds(1_700_000_000));
    }

    #[test]
    fn skips_csv_header_and_parses_four_column_rows() {
        let file = write_temp("timestamp,metric,value,unit\n1700000000,error_rate,0.02,ratio\n");
        let mut source = FileReplaySource::new(file.path());
        source.connect().expect("connect");
        let events = source.read(10, None).expect("read");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].metric, "error_rate");
        assert_eq!(events[0].unit.as_deref(), Some("ratio"));
    }

    #[test]
    fn rejects_malformed_row() {
        let file = write_temp("not,a,valid,csv,row,at,all\n");
        let mut source = FileReplaySource::new(file.path());
        source.connect().expect("connect");
        let err = source.read(10, None).unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[test]
    fn read_before_connect_fails() {
        let mut source = FileReplaySource::new("/nonexistent/path.jsonl");
        let err = source.read(1, None).unwrap_err();
        assert!(matches!(err, SourceError::NotConnected));
    }
}
