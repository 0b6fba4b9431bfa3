// crates/driftgate-config/src/metric_registry.rs
// ============================================================================
// Module: Metric Registry Loader
// Description: Loads and validates a `MetricRegistry` from YAML.
// Purpose: Implement C1's `load(path) -> Registry` operation (§4.1).
// Dependencies: driftgate-core, serde_yaml
// ============================================================================

//! ## Overview
//! Validation is deliberately lenient: unknown top-level keys are warnings,
//! not errors; only a missing/unreadable file, unparseable YAML, or a
//! metric with no threshold/invariant/criticality rule at all is a hard
//! [`ConfigError`] (§4.1 "Failure modes").

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use driftgate_core::MetricConfig;
use driftgate_core::MetricRegistry;

use crate::error::ConfigError;

/// Name of the environment variable that overrides the default registry path.
pub const HB_METRIC_REGISTRY_ENV: &str = "HB_METRIC_REGISTRY";

/// Default registry path when neither an explicit path nor the environment
/// variable is set.
pub const DEFAULT_METRIC_REGISTRY_PATH: &str = "config/metric_registry.yaml";

#[derive(Debug, serde::Deserialize)]
struct RawRegistryFile {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    metrics: BTreeMap<String, MetricConfig>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Resolves the registry path: explicit argument, else `HB_METRIC_REGISTRY`,
/// else the default path.
#[must_use]
pub fn resolve_path(explicit: Option<&str>) -> String {
    explicit
        .map(ToString::to_string)
        .or_else(|| std::env::var(HB_METRIC_REGISTRY_ENV).ok())
        .unwrap_or_else(|| DEFAULT_METRIC_REGISTRY_PATH.to_string())
}

/// Loads a [`MetricRegistry`] from a YAML file at `path`, validating that
/// every metric carries at least one threshold, invariant, or
/// `critical: true` marker.
///
/// # Errors
/// Returns [`ConfigError::Io`] if the file cannot be read,
/// [`ConfigError::Yaml`] if it is not valid YAML, and
/// [`ConfigError::Invalid`] if a metric has no rule at all.
pub fn load(path: &str) -> Result<MetricRegistry, ConfigError> {
    let bytes = std::fs::read(Path::new(path)).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    let raw: RawRegistryFile = serde_yaml::from_slice(&bytes).map_err(|source| ConfigError::Yaml {
        path: path.to_string(),
        source,
    })?;

    for (name, config) in &raw.metrics {
        if !config.has_any_rule() {
            return Err(ConfigError::Invalid {
                path: path.to_string(),
                reason: format!("metric '{name}' has no threshold, invariant, or critical marker"),
            });
        }
    }

    Ok(MetricRegistry::new(raw.version, raw.metrics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_valid_registry_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.yaml");
        std::fs::write(
            &path,
            r"
version: '2.0'
metrics:
  latency_ms:
    drift_threshold: 1.0
    unit: ms
",
        )
        .expect("write");
        let registry = load(path.to_str().expect("utf8 path")).expect("load");
        assert_eq!(registry.version, "2.0");
        assert!(registry.get("latency_ms").is_some());
    }

    #[test]
    fn rejects_a_metric_with_no_rule() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.yaml");
        std::fs::write(
            &path,
            r"
metrics:
  idle_metric: {}
",
        )
        .expect("write");
        let err = load(path.to_str().expect("utf8 path")).expect_err("should reject");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load("/nonexistent/path/registry.yaml").expect_err("should fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
