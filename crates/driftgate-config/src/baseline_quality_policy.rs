// crates/driftgate-config/src/baseline_quality_policy.rs
// ============================================================================
// Module: Baseline Quality Policy
// Description: Weighted-sum confidence scoring policy for candidate baselines.
// Purpose: Implement C3's quality-scoring configuration (§4.3 "Quality score").
// Dependencies: serde_yaml
// ============================================================================

//! ## Overview
//! Defaults are grounded on `original_source/hb/baseline_quality.py::_default_policy`.

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

/// Name of the environment variable that overrides the default policy path.
pub const HB_BASELINE_QUALITY_POLICY_ENV: &str = "HB_BASELINE_QUALITY_POLICY";

/// Default baseline quality policy path.
pub const DEFAULT_BASELINE_QUALITY_POLICY_PATH: &str = "config/baseline_quality_policy.yaml";

/// Weights applied to each quality dimension; must sum to `1.0` in spirit but
/// are not renormalized if they do not (§4.3 "Open question: weight drift").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    /// Weight for the sample-size dimension.
    pub sample_size: f64,
    /// Weight for the stability (inverse coefficient-of-variation) dimension.
    pub stability: f64,
    /// Weight for the no-unresolved-alerts dimension.
    pub no_alerts: f64,
    /// Weight for the environment-match dimension.
    pub environment_match: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            sample_size: 0.2,
            stability: 0.3,
            no_alerts: 0.3,
            environment_match: 0.2,
        }
    }
}

/// Thresholds and weights used to score candidate baselines (§4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineQualityPolicy {
    /// Minimum sample count for full credit on the sample-size dimension.
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u64,
    /// Minimum seconds a run must have spent in its state before being
    /// eligible as a baseline.
    #[serde(default = "default_min_time_in_state_sec")]
    pub min_time_in_state_sec: i64,
    /// Coefficient-of-variation above which the stability dimension scores
    /// zero.
    #[serde(default = "default_max_coefficient_of_variation")]
    pub max_coefficient_of_variation: f64,
    /// Whether a candidate with unresolved alerts is disqualified outright.
    #[serde(default = "default_no_unresolved_alerts")]
    pub no_unresolved_alerts: bool,
    /// Minimum environment-match score (0.0-1.0) for full credit.
    #[serde(default = "default_min_environment_match_score")]
    pub min_environment_match_score: f64,
    /// Per-dimension weights.
    #[serde(default)]
    pub weights: QualityWeights,
}

const fn default_min_sample_size() -> u64 {
    10
}

const fn default_min_time_in_state_sec() -> i64 {
    3600
}

const fn default_max_coefficient_of_variation() -> f64 {
    0.5
}

const fn default_no_unresolved_alerts() -> bool {
    true
}

const fn default_min_environment_match_score() -> f64 {
    0.7
}

impl Default for BaselineQualityPolicy {
    fn default() -> Self {
        Self {
            min_sample_size: default_min_sample_size(),
            min_time_in_state_sec: default_min_time_in_state_sec(),
            max_coefficient_of_variation: default_max_coefficient_of_variation(),
            no_unresolved_alerts: default_no_unresolved_alerts(),
            min_environment_match_score: default_min_environment_match_score(),
            weights: QualityWeights::default(),
        }
    }
}

/// Resolves the baseline quality policy path: explicit argument, else
/// `HB_BASELINE_QUALITY_POLICY`, else the default path.
#[must_use]
pub fn resolve_path(explicit: Option<&str>) -> String {
    explicit
        .map(ToString::to_string)
        .or_else(|| std::env::var(HB_BASELINE_QUALITY_POLICY_ENV).ok())
        .unwrap_or_else(|| DEFAULT_BASELINE_QUALITY_POLICY_PATH.to_string())
}

/// Loads a [`BaselineQualityPolicy`] from `path`, or the default policy if
/// the file does not exist.
///
/// # Errors
/// Returns [`ConfigError::Io`] for errors other than "file not found", and
/// [`ConfigError::Yaml`] if the file is not valid YAML.
pub fn load(path: &str) -> Result<BaselineQualityPolicy, ConfigError> {
    match std::fs::read(path) {
        Ok(bytes) => serde_yaml::from_slice(&bytes).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(BaselineQualityPolicy::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_documented_defaults() {
        let policy = BaselineQualityPolicy::default();
        assert_eq!(policy.min_sample_size, 10);
        assert_eq!(policy.min_time_in_state_sec, 3600);
        assert!((policy.max_coefficient_of_variation - 0.5).abs() < f64::EPSILON);
        assert!(policy.no_unresolved_alerts);
        assert!((policy.min_environment_match_score - 0.7).abs() < f64::EPSILON);
        assert!((policy.weights.sample_size - 0.2).abs() < f64::EPSILON);
        assert!((policy.weights.stability - 0.3).abs() < f64::EPSILON);
        assert!((policy.weights.no_alerts - 0.3).abs() < f64::EPSILON);
        assert!((policy.weights.environment_match - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_returns_default() {
        let policy = load("/nonexistent/baseline_quality_policy.yaml").expect("default");
        assert_eq!(policy, BaselineQualityPolicy::default());
    }

    #[test]
    fn partial_override_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, "min_sample_size: 25\n").expect("write");
        let policy = load(path.to_str().expect("utf8 path")).expect("load");
        assert_eq!(policy.min_sample_size, 25);
        assert_eq!(policy.min_time_in_state_sec, 3600);
    }
}
