// crates/driftgate-action/src/context.rs
// ============================================================================
// Module: Action Context
// Description: Caller-supplied signals a decision carries into the action
//              engine: confidence, flagged-metric counts, persistence, and
//              approvals.
// Purpose: Implement the `context` dict of C6's `propose_actions` (§4.6).
// Dependencies: (none beyond std)
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/actions/engine.py`'s `context` dict
//! shape: confidence, `baseline_confidence`, `flagged_metric_count`,
//! `persistence_cycles`, `approval_token`/`second_approver_id`, and
//! `timing_slo_met`/`fail_safe`.

use std::collections::BTreeMap;

use driftgate_config::HbMode;

/// Signals supplied by the caller when proposing actions for a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionContext {
    /// Drift-detection confidence for the triggering decision.
    pub confidence: Option<f64>,
    /// Confidence in the selected baseline.
    pub baseline_confidence: Option<f64>,
    /// Number of metrics flagged as drifted or failed.
    pub flagged_metric_count: u32,
    /// Consecutive cycles the triggering condition has persisted.
    pub persistence_cycles: u32,
    /// Approval token presented for a tier-3 action, if any.
    pub approval_token: Option<String>,
    /// Second-approver identity presented for a tier-3 action, if any.
    pub second_approver_id: Option<String>,
    /// Whether the decision's timing SLO was met.
    pub timing_slo_met: bool,
    /// Caller-forced fail-safe override.
    pub fail_safe: bool,
    /// Per-cycle operating mode override; falls back to the policy's mode.
    pub hb_mode: Option<HbMode>,
    /// Arbitrary numeric context values rule conditions are matched against.
    pub values: BTreeMap<String, f64>,
}

impl Default for ActionContext {
    fn default() -> Self {
        Self {
            confidence: None,
            baseline_confidence: None,
            flagged_metric_count: 0,
            persistence_cycles: 0,
            approval_token: None,
            second_approver_id: None,
            timing_slo_met: true,
            fail_safe: false,
            hb_mode: None,
            values: BTreeMap::new(),
        }
    }
}
