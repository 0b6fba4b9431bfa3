// crates/driftgate-config/src/action_policy.rs
// ============================================================================
// Module: Action Policy
// Description: Rules, tiers, and gating parameters consumed by C6.
// Purpose: Implement C6's policy load operation (§4.6).
// Dependencies: driftgate-core, serde_yaml
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/actions/policy.py`. Unlike the Python
//! loader, which folds `safety_gate`/`decision_authority` in as untyped
//! dicts, this loader gives both a concrete shape so callers get type
//! checking and serde validation instead of stringly-typed lookups.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use driftgate_core::RunStatus;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

/// Name of the environment variable that overrides the default policy path.
pub const HB_ACTION_POLICY_ENV: &str = "HB_ACTION_POLICY";

/// Default action policy path.
pub const DEFAULT_ACTION_POLICY_PATH: &str = "config/action_policy.yaml";

/// Comparison operator for a rule condition (§4.6 "Policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `==`
    #[serde(rename = "==")]
    Eq,
}

impl ConditionOp {
    /// Applies this operator to `ctx_val` against `threshold`.
    #[must_use]
    pub fn holds(self, ctx_val: f64, threshold: f64) -> bool {
        match self {
            Self::Ge => ctx_val >= threshold,
            Self::Gt => ctx_val > threshold,
            Self::Lt => ctx_val < threshold,
            Self::Le => ctx_val <= threshold,
            Self::Eq => (ctx_val - threshold).abs() < f64::EPSILON,
        }
    }
}

/// One rule condition: `context[key] op value` (§4.6 "Policy").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Context key to read.
    pub key: String,
    /// Comparison operator.
    #[serde(default = "default_op")]
    pub op: ConditionOp,
    /// Threshold value.
    pub value: f64,
}

const fn default_op() -> ConditionOp {
    ConditionOp::Ge
}

/// Action type (§4.6 "Action types and default tiers").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Send a notification; always safe, the only action allowed in safe mode.
    Notify,
    /// Apply or tighten a rate limit.
    RateLimit,
    /// Signal degradation (reduced fidelity, non-critical paths disabled).
    Degrade,
    /// Isolate a subsystem or segment.
    Isolate,
    /// Trigger failover to a standby.
    Failover,
    /// Abort the current operation or test. Safety-critical.
    Abort,
    /// Orderly shutdown. Safety-critical.
    Shutdown,
}

impl ActionType {
    /// Default tier for this action type, used when a rule doesn't override
    /// it (§4.6 "Action types and default tiers").
    #[must_use]
    pub const fn default_tier(self) -> u8 {
        match self {
            Self::Notify | Self::RateLimit => 1,
            Self::Degrade | Self::Isolate | Self::Failover => 2,
            Self::Abort | Self::Shutdown => 3,
        }
    }

    /// Whether this action type is safety-critical and subject to the
    /// two-condition safety gate.
    #[must_use]
    pub const fn is_safety_critical(self) -> bool {
        matches!(self, Self::Abort | Self::Shutdown)
    }

    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::RateLimit => "rate_limit",
            Self::Degrade => "degrade",
            Self::Isolate => "isolate",
            Self::Failover => "failover",
            Self::Abort => "abort",
            Self::Shutdown => "shutdown",
        }
    }
}

/// One action a matching rule proposes (§4.6 "Policy").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Action type.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Arbitrary parameters carried through to the executor untouched.
    #[serde(default)]
    pub params: serde_json::Value,
    /// Tier override; defaults to [`ActionType::default_tier`] when absent.
    #[serde(default)]
    pub tier: Option<u8>,
}

/// One policy rule: when `status` and `conditions` match, propose `actions`
/// (§4.6 "Policy").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRule {
    /// Statuses this rule applies to.
    #[serde(default)]
    pub status: Vec<RunStatus>,
    /// Conditions that must all hold against the caller's context.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Actions to propose when this rule matches.
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

/// Safety-gate configuration for safety-critical action types (§4.6
/// "Safety gate").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyGate {
    /// Whether safety-critical actions require >= 2 independent conditions.
    #[serde(default = "default_require_two_conditions")]
    pub require_two_conditions: bool,
    /// Action types considered safety-critical (informational; the closed
    /// set in [`ActionType::is_safety_critical`] is authoritative).
    #[serde(default = "default_critical_actions")]
    pub critical_actions: BTreeSet<ActionType>,
}

const fn default_require_two_conditions() -> bool {
    true
}

fn default_critical_actions() -> BTreeSet<ActionType> {
    BTreeSet::from([ActionType::Abort, ActionType::Shutdown])
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self {
            require_two_conditions: default_require_two_conditions(),
            critical_actions: default_critical_actions(),
        }
    }
}

/// Confidence and persistence gating parameters (§4.6 "Confidence gate").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionAuthority {
    /// Minimum `confidence` required, if set.
    #[serde(default)]
    pub min_confidence: Option<f64>,
    /// Minimum `baseline_confidence` required, if set.
    #[serde(default)]
    pub min_baseline_confidence: Option<f64>,
    /// Minimum number of flagged metrics required for safety-critical
    /// actions.
    #[serde(default = "default_min_metrics_for_critical")]
    pub min_metrics_for_critical: u32,
    /// Minimum number of consecutive cycles a condition must persist.
    #[serde(default)]
    pub time_persistence_cycles: u32,
}

const fn default_min_metrics_for_critical() -> u32 {
    2
}

impl Default for DecisionAuthority {
    fn default() -> Self {
        Self {
            min_confidence: None,
            min_baseline_confidence: None,
            min_metrics_for_critical: default_min_metrics_for_critical(),
            time_persistence_cycles: 0,
        }
    }
}

/// Operating mode (§4.6 "Policy"): `safe` restricts proposals to `notify`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HbMode {
    /// Normal operation; all rules apply as configured.
    #[default]
    Normal,
    /// Safe mode; only `notify` actions are ever allowed.
    Safe,
}

/// Full action-engine policy (§4.6 "Policy").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPolicy {
    /// Policy schema version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Ordered rules, evaluated independently (a status can match several).
    #[serde(default)]
    pub rules: Vec<ActionRule>,
    /// Safety-gate configuration.
    #[serde(default)]
    pub safety_gate: SafetyGate,
    /// Confidence/persistence gating configuration.
    #[serde(default)]
    pub decision_authority: DecisionAuthority,
    /// Highest tier ever allowed, regardless of rule configuration.
    #[serde(default)]
    pub max_allowed_tier: Option<u8>,
    /// Whether tier-3 actions require a second approver.
    #[serde(default = "default_require_two_man_for_tier3")]
    pub require_two_man_for_tier3: bool,
    /// Operating mode.
    #[serde(default)]
    pub hb_mode: HbMode,
    /// When `true`, a missed timing SLO blocks all safety-critical actions.
    #[serde(default)]
    pub fail_safe_on_timing: bool,
}

const fn default_require_two_man_for_tier3() -> bool {
    true
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            version: default_version(),
            rules: Vec::new(),
            safety_gate: SafetyGate::default(),
            decision_authority: DecisionAuthority::default(),
            max_allowed_tier: None,
            require_two_man_for_tier3: default_require_two_man_for_tier3(),
            hb_mode: HbMode::default(),
            fail_safe_on_timing: false,
        }
    }
}

/// Resolves the action policy path: explicit argument, else
/// `HB_ACTION_POLICY`, else the default path.
#[must_use]
pub fn resolve_path(explicit: Option<&str>) -> String {
    explicit
        .map(ToString::to_string)
        .or_else(|| std::env::var(HB_ACTION_POLICY_ENV).ok())
        .unwrap_or_else(|| DEFAULT_ACTION_POLICY_PATH.to_string())
}

/// Loads an [`ActionPolicy`] from `path`, or returns the default
/// (rule-free, notify-only-safe) policy if the file does not exist.
///
/// # Errors
/// Returns [`ConfigError::Io`] for errors other than "file not found", and
/// [`ConfigError::Yaml`] if the file is not valid YAML.
pub fn load(path: &str) -> Result<ActionPolicy, ConfigError> {
    match std::fs::read(path) {
        Ok(bytes) => serde_yaml::from_slice(&bytes).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(ActionPolicy::default()),
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
        let policy = load("/nonexistent/action_policy.yaml").expect("default");
        assert!(policy.rules.is_empty());
        assert!(policy.safety_gate.require_two_conditions);
        assert_eq!(policy.hb_mode, HbMode::Normal);
    }

    #[test]
    fn parses_a_rule_with_condition_and_action() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("action_policy.yaml");
        std::fs::write(
            &path,
            r#"
rules:
  - status: [FAIL]
    conditions:
      - key: flagged_metric_count
        op: ">="
        value: 1
    actions:
      - type: notify
        params: {sink: webhook}
      - type: shutdown
        tier: 3
"#,
        )
        .expect("write");
        let policy = load(path.to_str().expect("utf8 path")).expect("load");
        assert_eq!(policy.rules.len(), 1);
        let rule = &policy.rules[0];
        assert_eq!(rule.status, vec![RunStatus::Fail]);
        assert_eq!(rule.actions.len(), 2);
        assert_eq!(rule.actions[1].action_type, ActionType::Shutdown);
        assert_eq!(rule.actions[1].tier, Some(3));
    }

    #[test]
    fn condition_op_defaults_to_ge() {
        assert!(ConditionOp::Ge.holds(2.0, 2.0));
        assert!(!ConditionOp::Gt.holds(2.0, 2.0));
        assert!(ConditionOp::Eq.holds(2.0, 2.0));
    }

    #[test]
    fn action_type_default_tiers_match_spec() {
        assert_eq!(ActionType::Notify.default_tier(), 1);
        assert_eq!(ActionType::Degrade.default_tier(), 2);
        assert_eq!(ActionType::Abort.default_tier(), 3);
        assert!(ActionType::Shutdown.is_safety_critical());
        assert!(!ActionType::Degrade.is_safety_critical());
    }
}
