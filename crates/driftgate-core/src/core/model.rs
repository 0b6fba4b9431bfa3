// crates/driftgate-core/src/core/model.rs
// ============================================================================
// Module: Driftgate Data Model
// Description: Shared record types for runs, metrics, baseline governance,
//              the action ledger, and decision records.
// Purpose: Give every crate in the workspace (store, baseline, action,
//          evidence, daemon) one canonical set of wire-compatible types.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! These types are the wire format: they are serialized verbatim into the
//! run registry, the action ledger, and the decision record JSON artifact.
//! Renaming a field here changes a stable on-disk format (see `SPEC_FULL.md`
//! §6) and must not be done lightly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActionId;
use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::DecisionId;
use crate::core::identifiers::RunId;

// ============================================================================
// SECTION: Metric Value
// ============================================================================

/// A single raw or normalized metric value as it flows through ingest and
/// the decision engine.
///
/// # Invariants
/// - `tags` may carry a `"samples"` array used for distribution tests and
///   attribution; no other key in `tags` is interpreted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Coerced numeric value, or `None` if absent/blank.
    pub value: Option<f64>,
    /// Unit string as recorded (post unit-conversion for normalized metrics).
    #[serde(default)]
    pub unit: Option<String>,
    /// Free-form tags, optionally containing a `"samples"` array.
    #[serde(default)]
    pub tags: Option<serde_json::Value>,
}

impl MetricValue {
    /// Extracts the `tags.samples` numeric array, if present and non-empty.
    #[must_use]
    pub fn samples(&self) -> Option<Vec<f64>> {
        let tags = self.tags.as_ref()?;
        let samples = tags.get("samples")?.as_array()?;
        let cleaned: Vec<f64> = samples.iter().filter_map(serde_json::Value::as_f64).collect();
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

/// Map of canonical metric name to its value, as produced by
/// `normalize_metrics` and consumed by `compare_metrics`.
pub type MetricMap = BTreeMap<String, MetricValue>;

// ============================================================================
// SECTION: Run Metadata
// ============================================================================

/// Build provenance attached to a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Git commit SHA, if known.
    #[serde(default)]
    pub git_sha: Option<String>,
    /// CI/build system identifier, if known.
    #[serde(default)]
    pub build_id: Option<String>,
}

/// Start/end timestamps for a run, RFC 3339 strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTimestamps {
    /// Run start, RFC 3339 UTC.
    #[serde(default)]
    pub start_utc: Option<String>,
    /// Run end, RFC 3339 UTC.
    #[serde(default)]
    pub end_utc: Option<String>,
}

/// Descriptive metadata about a run, independent of its metrics.
///
/// # Invariants
/// - `run_id` is unique within a registry; when absent at ingest time a
///   random 128-bit identifier is generated (see `driftgate-core::hashing::random_run_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    /// Unique run identifier.
    pub run_id: RunId,
    /// Program or test-suite name.
    #[serde(default)]
    pub program: Option<String>,
    /// Subsystem under observation.
    #[serde(default)]
    pub subsystem: Option<String>,
    /// Test name, if applicable.
    #[serde(default)]
    pub test_name: Option<String>,
    /// Environment label (e.g. `"staging"`).
    #[serde(default)]
    pub environment: Option<String>,
    /// Build provenance.
    #[serde(default)]
    pub build: BuildInfo,
    /// Start/end timestamps.
    #[serde(default)]
    pub timestamps: RunTimestamps,
    /// Name of the system that produced this run (e.g. `"daemon"`, `"ingest"`).
    #[serde(default)]
    pub source_system: Option<String>,
    /// Correlation identifier threaded through to the decision record.
    #[serde(default)]
    pub correlation_id: Option<CorrelationId>,
}

// ============================================================================
// SECTION: Run Status
// ============================================================================

/// Stable, pattern-matchable run/decision status.
///
/// # Invariants
/// - String representations are stable across releases (§7 "User-visible
///   behavior"): consumers pattern-match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// No drift, no fail.
    Pass,
    /// Drift or distribution drift present, no fail.
    PassWithDrift,
    /// At least one invariant violation or critical breach.
    Fail,
    /// Zero metrics were evaluable.
    NoMetrics,
    /// No matching test/run was found (surfaced by baseline selection paths).
    NoTest,
}

impl RunStatus {
    /// Returns the stable string form used in reports and wire events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::PassWithDrift => "PASS_WITH_DRIFT",
            Self::Fail => "FAIL",
            Self::NoMetrics => "NO_METRICS",
            Self::NoTest => "NO_TEST",
        }
    }
}

// ============================================================================
// SECTION: Decision Record
// ============================================================================

/// Canonical, immutable decision artifact (§4.7, §6). Schema version `"1.0"`.
///
/// # Invariants
/// - Immutable once written; never mutated in place.
/// - `config_hash` is the SHA-256 over the sorted hash map of config file
///   hashes, used by [`crate::core::model::RunStatus`]-independent replay
///   verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Schema version; currently always `"1.0"`.
    pub schema_version: String,
    /// Unique decision identifier.
    pub decision_id: DecisionId,
    /// RFC 3339 UTC timestamp the decision was produced.
    pub timestamp: String,
    /// Resulting status.
    pub status: RunStatus,
    /// Decision confidence, if computed (baseline quality derived).
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Baseline confidence, if computed.
    #[serde(default)]
    pub baseline_confidence: Option<f64>,
    /// Canonical names of metrics that triggered the decision.
    #[serde(default)]
    pub trigger_metrics: Vec<String>,
    /// Action type requested as a result of this decision, if any.
    #[serde(default)]
    pub action_requested: Option<String>,
    /// Whether the requested action was allowed by the action engine.
    pub action_allowed: bool,
    /// Human-readable reason for the status/action outcome.
    pub reason: String,
    /// Policy version in effect when the decision was made.
    #[serde(default)]
    pub policy_version: Option<String>,
    /// SHA-256 over the sorted map of config file hashes.
    pub config_hash: String,
    /// Path or URI of the evidence bundle for this decision.
    #[serde(default)]
    pub evidence_ref: Option<String>,
    /// Run this decision was made for.
    pub run_id: RunId,
    /// Baseline run used for comparison, if any.
    #[serde(default)]
    pub baseline_run_id: Option<RunId>,
    /// Correlation identifier threaded from the triggering event.
    #[serde(default)]
    pub correlation_id: Option<CorrelationId>,
}

/// Current schema version written by this implementation.
pub const DECISION_RECORD_SCHEMA_VERSION: &str = "1.0";

// ============================================================================
// SECTION: Action Ledger
// ============================================================================

/// Status of an action-ledger entry.
///
/// # Invariants
/// - Entries transition only `pending -> ack`; `blocked`, `dry_run`, and
///   `idempotent_skip` are terminal on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Awaiting execution by an external executor.
    Pending,
    /// Acknowledged as executed by an external executor.
    Ack,
    /// Blocked by a gate; no side effects were attempted.
    Blocked,
    /// Skipped because an identical `idempotency_key` already exists.
    IdempotentSkip,
    /// Recorded for audit only; no side effects were attempted.
    DryRun,
}

/// Append-only action-ledger row (§3, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLedgerEntry {
    /// Unique action identifier.
    pub action_id: ActionId,
    /// Run this action relates to, if any.
    #[serde(default)]
    pub run_id: Option<RunId>,
    /// Decision this action relates to, if any.
    #[serde(default)]
    pub decision_id: Option<DecisionId>,
    /// Action type (e.g. `"notify"`, `"shutdown"`).
    pub action_type: String,
    /// Current status.
    pub status: ActionStatus,
    /// Arbitrary action parameters, carried through to the executor.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Caller-supplied idempotency key, if any.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Whether the safety gate passed for this action.
    pub safety_gate_passed: bool,
    /// Whether this entry was recorded in dry-run mode.
    pub dry_run: bool,
    /// RFC 3339 UTC creation timestamp.
    pub created_at: String,
    /// RFC 3339 UTC acknowledgement timestamp, set only on `ack`.
    #[serde(default)]
    pub ack_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_strings_are_stable() {
        assert_eq!(RunStatus::Pass.as_str(), "PASS");
        assert_eq!(RunStatus::PassWithDrift.as_str(), "PASS_WITH_DRIFT");
        assert_eq!(RunStatus::Fail.as_str(), "FAIL");
        assert_eq!(RunStatus::NoMetrics.as_str(), "NO_METRICS");
        assert_eq!(RunStatus::NoTest.as_str(), "NO_TEST");
    }

    #[test]
    fn metric_value_extracts_samples() {
        let mv = MetricValue {
            value: Some(1.0),
            unit: None,
            tags: Some(serde_json::json!({"samples": [1.0, 2.0, "bad", 3.0]})),
        };
        assert_eq!(mv.samples(), Some(vec![1.0, 2.0, 3.0]));
    }
}
