// crates/driftgate-config/src/baseline_policy.rs
// ============================================================================
// Module: Baseline Policy
// Description: Selection and tagging-governance policy consumed by C3.
// Purpose: Load the policy that drives baseline selection (§4.3) and the
//          tagging request/approval workflow.
// Dependencies: serde_yaml
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/baseline.py` and the tagging workflow
//! described in `SPEC_FULL.md` §4.3.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

/// Name of the environment variable that overrides the default policy path.
pub const HB_BASELINE_POLICY_ENV: &str = "HB_BASELINE_POLICY";

/// Default baseline policy path.
pub const DEFAULT_BASELINE_POLICY_PATH: &str = "config/baseline_policy.yaml";

/// Governance rules for baseline tagging (§4.3 "Tagging workflow").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernancePolicy {
    /// Whether tagging requires an approval workflow at all.
    #[serde(default)]
    pub require_approval: bool,
    /// Distinct approvals required before a request transitions to `approved`.
    #[serde(default = "default_approvals_required")]
    pub approvals_required: u32,
    /// Approver identities allowed to approve a request.
    #[serde(default)]
    pub approvers: BTreeSet<String>,
}

const fn default_approvals_required() -> u32 {
    1
}

impl Default for GovernancePolicy {
    fn default() -> Self {
        Self {
            require_approval: false,
            approvals_required: default_approvals_required(),
            approvers: BTreeSet::new(),
        }
    }
}

/// Baseline selection and governance policy (§4.3 "Selection").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselinePolicy {
    /// Explicit tag to select by, if set.
    #[serde(default)]
    pub tag: Option<String>,
    /// Fallback behavior when no `PASS` run exists; `"latest"` is the only
    /// recognized value.
    #[serde(default)]
    pub fallback: Option<String>,
    /// Whether `compare_metrics` runs the KS distribution-drift test.
    #[serde(default = "default_distribution_drift_enabled")]
    pub distribution_drift_enabled: bool,
    /// Tagging governance rules.
    #[serde(default)]
    pub governance: GovernancePolicy,
}

const fn default_distribution_drift_enabled() -> bool {
    true
}

impl Default for BaselinePolicy {
    fn default() -> Self {
        Self {
            tag: None,
            fallback: None,
            distribution_drift_enabled: default_distribution_drift_enabled(),
            governance: GovernancePolicy::default(),
        }
    }
}

impl BaselinePolicy {
    /// Whether `fallback` requests falling back to the newest matching run.
    #[must_use]
    pub fn fallback_latest(&self) -> bool {
        self.fallback.as_deref() == Some("latest")
    }
}

/// Resolves the baseline policy path: explicit argument, else
/// `HB_BASELINE_POLICY`, else the default path.
#[must_use]
pub fn resolve_path(explicit: Option<&str>) -> String {
    explicit
        .map(ToString::to_string)
        .or_else(|| std::env::var(HB_BASELINE_POLICY_ENV).ok())
        .unwrap_or_else(|| DEFAULT_BASELINE_POLICY_PATH.to_string())
}

/// Loads a [`BaselinePolicy`] from `path`, or returns the default policy if
/// the file does not exist.
///
/// # Errors
/// Returns [`ConfigError::Io`] for errors other than "file not found", and
/// [`ConfigError::Yaml`] if the file is not valid YAML.
pub fn load(path: &str) -> Result<BaselinePolicy, ConfigError> {
    match std::fs::read(path) {
        Ok(bytes) => serde_yaml::from_slice(&bytes).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(BaselinePolicy::default()),
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
    fn missing_file_returns_default_policy() {
        let policy = load("/nonexistent/baseline_policy.yaml").expect("default");
        assert!(!policy.governance.require_approval);
        assert!(!policy.fallback_latest());
    }

    #[test]
    fn fallback_latest_is_recognized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, "fallback: latest\n").expect("write");
        let policy = load(path.to_str().expect("utf8 path")).expect("load");
        assert!(policy.fallback_latest());
    }

    #[test]
    fn distribution_drift_enabled_defaults_true_when_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, "fallback: latest\n").expect("write");
        let policy = load(path.to_str().expect("utf8 path")).expect("load");
        assert!(policy.distribution_drift_enabled);
    }

    #[test]
    fn distribution_drift_enabled_can_be_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, "distribution_drift_enabled: false\n").expect("write");
        let policy = load(path.to_str().expect("utf8 path")).expect("load");
        assert!(!policy.distribution_drift_enabled);
    }
}
