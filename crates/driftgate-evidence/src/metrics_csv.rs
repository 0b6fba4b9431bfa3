// crates/driftgate-evidence/src/metrics_csv.rs
// ============================================================================
// Module: Metrics CSV
// Description: Read/write of `metrics_normalized.csv`.
// Purpose: Persist normalized metrics alongside a run's other evidence so
//          replay does not need a live metrics backend.
// Dependencies: csv, driftgate-core
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/replay.py`'s `_load_metrics_from_path`
//! and the CSV writer in `hb/evidence.py`.
//!
//! Invariants:
//! - Column order is always `metric, value, unit, tags`.
//! - `tags` is a JSON object serialized to a single CSV field; an empty tag
//!   set is written as `{}`.

use std::collections::BTreeMap;
use std::path::Path;

use driftgate_core::RawMetrics;
use serde_json::Value;

use crate::error::EvidenceError;

/// Writes `path` as a `metric, value, unit, tags` CSV from raw metrics.
/// `units` supplies the unit label for metrics that have one; metrics
/// absent from `units` get an empty unit field.
///
/// # Errors
/// Returns [`EvidenceError::Csv`] if a row cannot be written, or
/// [`EvidenceError::Io`] if the file cannot be created or flushed.
pub fn write_metrics_csv(path: &Path, metrics: &RawMetrics, units: &BTreeMap<String, String>, tags: &Value) -> Result<(), EvidenceError> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| EvidenceError::Csv { path: path.display().to_string(), source })?;
    writer
        .write_record(["metric", "value", "unit", "tags"])
        .map_err(|source| EvidenceError::Csv { path: path.display().to_string(), source })?;

    let tags_field = serde_json::to_string(tags).unwrap_or_else(|_| "{}".to_string());
    for (name, value) in metrics {
        let unit = units.get(name.as_str()).map_or("", String::as_str);
        writer
            .write_record([name.as_str(), value.to_string().as_str(), unit, tags_field.as_str()])
            .map_err(|source| EvidenceError::Csv { path: path.display().to_string(), source })?;
    }
    writer.flush().map_err(|source| EvidenceError::Io { path: path.display().to_string(), source })?;
    Ok(())
}

/// One row of `metrics_normalized.csv`, as read back for replay.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsCsvRow {
    pub metric: String,
    pub value: Value,
    pub unit: String,
    pub tags: Value,
}

/// Reads `metrics_normalized.csv` back into rows, preserving file order.
///
/// # Errors
/// Returns [`EvidenceError::Csv`] if the file cannot be parsed.
pub fn read_metrics_csv(path: &Path) -> Result<Vec<MetricsCsvRow>, EvidenceError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| EvidenceError::Csv { path: path.display().to_string(), source })?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| EvidenceError::Csv { path: path.display().to_string(), source })?;
        let metric = record.get(0).unwrap_or_default().to_string();
        let raw_value = record.get(1).unwrap_or_default();
        let value = raw_value.parse::<f64>().map_or_else(|_| Value::String(raw_value.to_string()), |number| {
            serde_json::Number::from_f64(number).map_or_else(|| Value::String(raw_value.to_string()), Value::Number)
        });
        let unit = record.get(2).unwrap_or_default().to_string();
        let tags = record
            .get(3)
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        rows.push(MetricsCsvRow { metric, value, unit, tags });
    }
    Ok(rows)
}

/// Converts CSV rows back into a [`RawMetrics`] map, dropping the unit/tag
/// columns that `normalize_metrics` does not consume.
#[must_use]
pub fn rows_to_raw_metrics(rows: &[MetricsCsvRow]) -> RawMetrics {
    let mut metrics = RawMetrics::new();
    for row in rows {
        metrics.insert(row.metric.clone(), row.value.clone());
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("metrics_normalized.csv");

        let mut metrics = RawMetrics::new();
        metrics.insert("error_rate".to_string(), serde_json::json!(0.02));
        metrics.insert("p99_latency_ms".to_string(), serde_json::json!(340.5));
        let mut units = BTreeMap::new();
        units.insert("p99_latency_ms".to_string(), "ms".to_string());

        write_metrics_csv(&path, &metrics, &units, &serde_json::json!({"region": "us-east-1"})).expect("write");
        let rows = read_metrics_csv(&path).expect("read");

        assert_eq!(rows.len(), 2);
        let latency = rows.iter().find(|r| r.metric == "p99_latency_ms").expect("row present");
        assert_eq!(latency.unit, "ms");
        assert_eq!(latency.value, serde_json::json!(340.5));
        assert_eq!(latency.tags, serde_json::json!({"region": "us-east-1"}));

        let recovered = rows_to_raw_metrics(&rows);
        assert_eq!(recovered.get("error_rate"), Some(&serde_json::json!(0.02)));
    }

    #[test]
    fn write_defaults_missing_unit_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("metrics_normalized.csv");
        let mut metrics = RawMetrics::new();
        metrics.insert("error_rate".to_string(), serde_json::json!(0.01));

        write_metrics_csv(&path, &metrics, &BTreeMap::new(), &serde_json::json!({})).expect("write");
        let rows = read_metrics_csv(&path).expect("read");

        assert_eq!(rows[0].unit, "");
    }
}
