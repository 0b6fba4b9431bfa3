// crates/driftgate-core/src/runtime/normalize.rs
// ============================================================================
// Module: Metric Normalization
// Description: Coerces raw metric input into canonical, unit-converted
//              values keyed by canonical metric name.
// Purpose: Give the decision engine a single, registry-aware ingestion path.
// Dependencies: bigdecimal, serde_json
// ============================================================================

//! ## Overview
//! `normalize_metrics` implements the four-step pipeline in `SPEC_FULL.md`
//! §4.4: alias resolution, numeric coercion, unit conversion, and
//! canonical-name re-keying. Warnings are sorted and deduplicated so output
//! is deterministic regardless of the input map's iteration order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use bigdecimal::ToPrimitive;

use crate::core::model::MetricMap;
use crate::core::model::MetricValue;
use crate::core::registry::MetricRegistry;
use crate::core::registry::normalize_alias;

// ============================================================================
// SECTION: Numeric Coercion
// ============================================================================

/// Coerces a raw JSON value into an `f64`, accepting numbers and trimmed
/// numeric strings; an empty string coerces to `None`.
///
/// Values are routed through [`BigDecimal`] rather than `serde_json`'s own
/// float parsing so that numeric strings and JSON numbers take the same
/// parse path and round the same way.
#[must_use]
pub fn to_float(value: Option<&serde_json::Value>) -> Option<f64> {
    let value = value?;
    if value.is_null() {
        return None;
    }
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    text.parse::<BigDecimal>().ok()?.to_f64()
}

// ============================================================================
// SECTION: Unit Conversion
// ============================================================================

/// Converts `value` from `unit` into the metric's canonical unit using
/// `unit_map`, per Open Question 2: when no `unit_map` entry matches the
/// normalized unit, the **original** unit is kept even if a canonical unit
/// is defined on the config.
#[must_use]
pub fn unit_convert(
    value: Option<f64>,
    unit: Option<&str>,
    config: &crate::core::registry::MetricConfig,
) -> (Option<f64>, Option<String>) {
    let Some(value) = value else {
        return (None, unit.map(ToString::to_string));
    };
    let Some(unit) = unit else {
        return (Some(value), config.unit.clone());
    };
    let normalized = normalize_alias(unit);
    if let Some(factor) = config.unit_map.get(&normalized) {
        (Some(value * factor), config.unit.clone())
    } else {
        (Some(value), Some(unit.to_string()))
    }
}

// ============================================================================
// SECTION: normalize_metrics
// ============================================================================

/// Raw metric input prior to normalization: canonical-or-raw name to a JSON
/// object carrying `value`, `unit`, and `tags`.
pub type RawMetrics = BTreeMap<String, serde_json::Value>;

/// Normalizes raw metric input against a registry (§4.4).
///
/// Unknown metrics are dropped with a warning; warnings are returned sorted
/// and deduplicated.
#[must_use]
pub fn normalize_metrics(raw: &RawMetrics, registry: &MetricRegistry) -> (MetricMap, Vec<String>) {
    let mut normalized = MetricMap::new();
    let mut warnings = Vec::new();

    for (name, data) in raw {
        let Some(canonical) = registry.resolve_alias(name) else {
            warnings.push(format!("unknown metric: {name}"));
            continue;
        };
        let canonical = canonical.to_string();
        let config = registry.get(&canonical).cloned().unwrap_or_default();

        let raw_value = to_float(data.get("value"));
        let raw_unit = data.get("unit").and_then(serde_json::Value::as_str);
        let (value, unit) = unit_convert(raw_value, raw_unit, &config);

        normalized.insert(
            canonical,
            MetricValue {
                value,
                unit,
                tags: data.get("tags").cloned(),
            },
        );
    }

    warnings.sort();
    warnings.dedup();
    (normalized, warnings)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::core::registry::MetricConfig;

    fn registry_with_unit_map() -> MetricRegistry {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            "latency_ms".to_string(),
            MetricConfig {
                unit: Some("ms".to_string()),
                unit_map: BTreeMap::from([("s".to_string(), 1000.0)]),
                ..MetricConfig::default()
            },
        );
        MetricRegistry::new("1.0", metrics)
    }

    #[test]
    fn unknown_metric_is_dropped_with_warning() {
        let registry = registry_with_unit_map();
        let mut raw = RawMetrics::new();
        raw.insert("mystery".to_string(), serde_json::json!({"value": 1.0}));
        let (normalized, warnings) = normalize_metrics(&raw, &registry);
        assert!(normalized.is_empty());
        assert_eq!(warnings, vec!["unknown metric: mystery".to_string()]);
    }

    #[test]
    fn unit_conversion_multiplies_by_factor_and_sets_canonical_unit() {
        let registry = registry_with_unit_map();
        let mut raw = RawMetrics::new();
        raw.insert(
            "latency_ms".to_string(),
            serde_json::json!({"value": "1.5", "unit": "s"}),
        );
        let (normalized, warnings) = normalize_metrics(&raw, &registry);
        assert!(warnings.is_empty());
        let v = &normalized["latency_ms"];
        assert_eq!(v.value, Some(1500.0));
        assert_eq!(v.unit.as_deref(), Some("ms"));
    }

    #[test]
    fn unmatched_unit_keeps_original_unit_even_with_canonical_defined() {
        // Open Question 2.
        let registry = registry_with_unit_map();
        let mut raw = RawMetrics::new();
        raw.insert(
            "latency_ms".to_string(),
            serde_json::json!({"value": 2.0, "unit": "minutes"}),
        );
        let (normalized, _) = normalize_metrics(&raw, &registry);
        let v = &normalized["latency_ms"];
        assert_eq!(v.value, Some(2.0));
        assert_eq!(v.unit.as_deref(), Some("minutes"));
    }

    #[test]
    fn empty_string_value_coerces_to_none() {
        assert_eq!(to_float(Some(&serde_json::json!(""))), None);
    }

    #[test]
    fn declared_aliases_resolve_through_normalize_alias() {
        let mut metrics = BTreeMap::new();
        let mut aliases = BTreeSet::new();
        aliases.insert("Latency (ms)".to_string());
        metrics.insert(
            "latency_ms".to_string(),
            MetricConfig {
                aliases,
                ..MetricConfig::default()
            },
        );
        let registry = MetricRegistry::new("1.0", metrics);
        let mut raw = RawMetrics::new();
        raw.insert("Latency (ms)".to_string(), serde_json::json!({"value": 3}));
        let (normalized, warnings) = normalize_metrics(&raw, &registry);
        assert!(warnings.is_empty());
        assert_eq!(normalized["latency_ms"].value, Some(3.0));
    }
}
