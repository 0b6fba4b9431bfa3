// crates/driftgate-core/src/core/registry.rs
// ============================================================================
// Module: Metric Registry
// Description: Canonical metric catalog with aliases, units, thresholds,
//              invariants, and criticality; compiles a cache-friendly
//              ComparePlan for repeated use.
// Purpose: Own the single source of truth a run is compared against.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! A [`MetricRegistry`] is loaded once (by `driftgate-config`) and then
//! shared read-only: the registry and its compiled [`ComparePlan`] are
//! immutable after load and safe to share across threads without locking.
//!
//! Invariants:
//! - Every alias in every [`MetricConfig`] appears in `alias_index` and
//!   resolves back to that metric's canonical name.
//! - `alias_index` is the only alias source of truth; case/punctuation
//!   variants must never be compared directly elsewhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Distribution Drift Config
// ============================================================================

/// Per-metric distribution-drift configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionDriftConfig {
    /// Kolmogorov-Smirnov statistic threshold above which distribution drift fires.
    pub ks_threshold: f64,
}

// ============================================================================
// SECTION: Metric Config
// ============================================================================

/// Configuration for a single canonical metric.
///
/// # Invariants
/// - `aliases` are stored as written; normalization happens at lookup time
///   via [`normalize_alias`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Alternate names this metric may appear under in raw input.
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    /// Canonical unit, if any.
    #[serde(default)]
    pub unit: Option<String>,
    /// Map from a normalized alias unit to a multiplicative factor onto `unit`.
    #[serde(default)]
    pub unit_map: BTreeMap<String, f64>,
    /// Absolute drift threshold.
    #[serde(default)]
    pub drift_threshold: Option<f64>,
    /// Relative drift threshold, as a percent.
    #[serde(default)]
    pub drift_percent: Option<f64>,
    /// Absolute floor below which a detected drift is suppressed.
    #[serde(default)]
    pub min_effect: Option<f64>,
    /// Threshold above which a `critical` metric forces `FAIL`.
    #[serde(default)]
    pub fail_threshold: Option<f64>,
    /// Exact-value invariant.
    #[serde(default)]
    pub invariant_eq: Option<f64>,
    /// Minimum-value invariant.
    #[serde(default)]
    pub invariant_min: Option<f64>,
    /// Maximum-value invariant.
    #[serde(default)]
    pub invariant_max: Option<f64>,
    /// Whether this metric is safety-critical.
    #[serde(default)]
    pub critical: bool,
    /// Consecutive-sample run length required for a "sustained" onset.
    #[serde(default = "default_drift_persistence")]
    pub drift_persistence: u32,
    /// Distribution-drift (KS test) configuration, if enabled for this metric.
    #[serde(default)]
    pub distribution_drift: Option<DistributionDriftConfig>,
    /// Source column names, carried through for attribution labels only.
    #[serde(default)]
    pub source_columns: Vec<String>,
}

const fn default_drift_persistence() -> u32 {
    5
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            aliases: BTreeSet::new(),
            unit: None,
            unit_map: BTreeMap::new(),
            drift_threshold: None,
            drift_percent: None,
            min_effect: None,
            fail_threshold: None,
            invariant_eq: None,
            invariant_min: None,
            invariant_max: None,
            critical: false,
            drift_persistence: default_drift_persistence(),
            distribution_drift: None,
            source_columns: Vec::new(),
        }
    }
}

impl MetricConfig {
    /// Whether this config carries at least one threshold, invariant, or
    /// criticality marker, as required by registry validation.
    #[must_use]
    pub const fn has_any_rule(&self) -> bool {
        self.drift_threshold.is_some()
            || self.drift_percent.is_some()
            || self.invariant_eq.is_some()
            || self.invariant_min.is_some()
            || self.invariant_max.is_some()
            || self.critical
    }
}

// ============================================================================
// SECTION: Alias Normalization
// ============================================================================

/// Normalizes a raw alias: lowercase, then strip every character outside
/// `[a-z0-9]`.
#[must_use]
pub fn normalize_alias(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| {
            let lower = c.to_ascii_lowercase();
            lower.is_ascii_alphanumeric().then_some(lower)
        })
        .collect()
}

// ============================================================================
// SECTION: Metric Registry
// ============================================================================

/// Canonical metric catalog.
///
/// # Invariants
/// - Every alias in every [`MetricConfig`] appears in `alias_index` and
///   resolves back to that metric's canonical name (enforced by [`MetricRegistry::new`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRegistry {
    /// Registry schema version, carried through to decision records.
    pub version: String,
    /// Canonical metrics, keyed by canonical name.
    pub metrics: BTreeMap<String, MetricConfig>,
    /// Normalized alias to canonical name.
    #[serde(skip)]
    alias_index: BTreeMap<String, String>,
}

impl MetricRegistry {
    /// Builds a registry from a version and metric map, computing the
    /// alias index. Each canonical name is implicitly its own alias.
    #[must_use]
    pub fn new(version: impl Into<String>, metrics: BTreeMap<String, MetricConfig>) -> Self {
        let mut alias_index = BTreeMap::new();
        for (canonical, config) in &metrics {
            alias_index.insert(normalize_alias(canonical), canonical.clone());
            for alias in &config.aliases {
                alias_index.insert(normalize_alias(alias), canonical.clone());
            }
        }
        Self {
            version: version.into(),
            metrics,
            alias_index,
        }
    }

    /// Resolves a raw metric name to its canonical form, if known.
    #[must_use]
    pub fn resolve_alias(&self, raw: &str) -> Option<&str> {
        self.alias_index
            .get(&normalize_alias(raw))
            .map(String::as_str)
    }

    /// Returns the config for a canonical metric name, if present.
    #[must_use]
    pub fn get(&self, canonical: &str) -> Option<&MetricConfig> {
        self.metrics.get(canonical)
    }

    /// Returns the configured alias index, for diagnostics and tests.
    #[must_use]
    pub fn alias_index(&self) -> &BTreeMap<String, String> {
        &self.alias_index
    }

    /// Computes the SHA-256 hash of the registry's serialized bytes, used as
    /// `registry_hash` in the run registry and decision record.
    #[must_use]
    pub fn content_hash(&self) -> String {
        hash_bytes(&serde_json::to_vec(self).unwrap_or_default())
    }
}

/// Computes the SHA-256 of a file's raw bytes, used as `registry_hash` in C2
/// and C7.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// SECTION: Compiled Compare Plan
// ============================================================================

/// Compiled, cache-friendly view over a [`MetricRegistry`]: parallel arrays
/// indexed by a single stable sorted metric order.
///
/// # Invariants
/// - `names[i]` is the canonical name whose thresholds/invariants/criticality
///   live at index `i` in every other array.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparePlan {
    /// Canonical metric names in stable sorted order.
    pub names: Vec<String>,
    /// Absolute drift thresholds, parallel to `names`.
    pub drift_thresholds: Vec<Option<f64>>,
    /// Relative drift percent thresholds, parallel to `names`.
    pub drift_percents: Vec<Option<f64>>,
    /// Hysteresis floors, parallel to `names`.
    pub min_effects: Vec<Option<f64>>,
    /// Critical fail thresholds, parallel to `names`.
    pub fail_thresholds: Vec<Option<f64>>,
    /// Whether each metric is critical, parallel to `names`.
    pub critical: Vec<bool>,
}

/// Compiles a [`MetricRegistry`] into a [`ComparePlan`] with a stable sorted
/// metric order (`BTreeMap` iteration is already sorted by key).
#[must_use]
pub fn compile_plan(registry: &MetricRegistry) -> ComparePlan {
    let mut plan = ComparePlan {
        names: Vec::with_capacity(registry.metrics.len()),
        drift_thresholds: Vec::with_capacity(registry.metrics.len()),
        drift_percents: Vec::with_capacity(registry.metrics.len()),
        min_effects: Vec::with_capacity(registry.metrics.len()),
        fail_thresholds: Vec::with_capacity(registry.metrics.len()),
        critical: Vec::with_capacity(registry.metrics.len()),
    };
    for (name, config) in &registry.metrics {
        plan.names.push(name.clone());
        plan.drift_thresholds.push(config.drift_threshold);
        plan.drift_percents.push(config.drift_percent);
        plan.min_effects.push(config.min_effect);
        plan.fail_thresholds.push(config.fail_threshold);
        plan.critical.push(config.critical);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_alias_strips_punctuation_and_case() {
        assert_eq!(normalize_alias("CPU-Load %"), "cpuload");
        assert_eq!(normalize_alias("mem_usage"), "memusage");
    }

    #[test]
    fn alias_index_resolves_declared_aliases_and_canonical_name() {
        let mut metrics = BTreeMap::new();
        let mut aliases = BTreeSet::new();
        aliases.insert("CPU %".to_string());
        metrics.insert(
            "cpu_load".to_string(),
            MetricConfig {
                aliases,
                ..MetricConfig::default()
            },
        );
        let registry = MetricRegistry::new("1.0", metrics);
        assert_eq!(registry.resolve_alias("cpu_load"), Some("cpu_load"));
        assert_eq!(registry.resolve_alias("CPU %"), Some("cpu_load"));
        assert_eq!(registry.resolve_alias("unknown"), None);
    }

    #[test]
    fn compile_plan_is_sorted_by_canonical_name() {
        let mut metrics = BTreeMap::new();
        metrics.insert("zeta".to_string(), MetricConfig::default());
        metrics.insert("alpha".to_string(), MetricConfig::default());
        let registry = MetricRegistry::new("1.0", metrics);
        let plan = compile_plan(&registry);
        assert_eq!(plan.names, vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
