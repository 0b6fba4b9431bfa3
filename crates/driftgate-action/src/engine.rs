// crates/driftgate-action/src/engine.rs
// ============================================================================
// Module: Action Engine
// Description: Proposes and records actions from a decision status, context,
//              and policy.
// Purpose: Implement C6's `propose_actions`/`execute` operations (§4.6).
// Dependencies: driftgate-config, driftgate-core, driftgate-store-sqlite,
//              serde_json, uuid
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/actions/engine.py`'s `ActionEngine`.
//!
//! Invariants:
//! - `propose_actions` never touches the action ledger; it is pure given
//!   `policy`, `status`, `context`, and `independent_conditions`.
//! - `execute` never performs the external side effect itself. A `Pending`
//!   ledger row is the engine's entire contract; a separate executor
//!   consumes `pending` rows and acknowledges them via
//!   [`driftgate_store_sqlite::RunRegistry::action_ledger_ack`].

use driftgate_config::ActionPolicy;
use driftgate_config::ActionType;
use driftgate_config::HbMode;
use driftgate_core::ActionId;
use driftgate_core::ActionLedgerEntry;
use driftgate_core::ActionStatus;
use driftgate_core::DecisionId;
use driftgate_core::RunId;
use driftgate_core::RunStatus;
use driftgate_store_sqlite::RunRegistry;
use serde::Serialize;
use uuid::Uuid;

use crate::context::ActionContext;
use crate::error::ActionError;
use crate::gates::confidence_gate;
use crate::gates::matches_conditions;
use crate::gates::safety_gate_passed;
use crate::gates::tier_allowed;

/// One proposed action and the gates it passed or failed (§4.6
/// "Evaluation").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionProposal {
    /// Action type.
    pub action_type: ActionType,
    /// Parameters carried through from the rule.
    pub params: serde_json::Value,
    /// Resolved tier.
    pub tier: u8,
    /// Whether the safety gate passed.
    pub safety_gate_passed: bool,
    /// Whether every gate passed.
    pub action_allowed: bool,
    /// Reason the action was blocked, if it was.
    pub block_reason: Option<String>,
    /// Confidence carried from the context, for audit.
    pub confidence: Option<f64>,
    /// Baseline confidence carried from the context, for audit.
    pub baseline_confidence: Option<f64>,
    /// Whether this action would actually execute.
    pub would_execute: bool,
}

/// Classifies every action a matching rule proposes for `status` against
/// `policy`, without any side effects (§4.6 "Evaluation").
#[must_use]
pub fn propose_actions(
    policy: &ActionPolicy,
    status: RunStatus,
    context: &ActionContext,
    independent_conditions: &[bool],
) -> Vec<ActionProposal> {
    let safe_mode = context.hb_mode.unwrap_or(policy.hb_mode) == HbMode::Safe;
    let mut out = Vec::new();

    for rule in &policy.rules {
        if !rule.status.contains(&status) {
            continue;
        }
        if !matches_conditions(&rule.conditions, &context.values) {
            continue;
        }
        for action_spec in &rule.actions {
            let tier = action_spec.tier.unwrap_or(action_spec.action_type.default_tier());

            if safe_mode && action_spec.action_type != ActionType::Notify {
                out.push(ActionProposal {
                    action_type: action_spec.action_type,
                    params: action_spec.params.clone(),
                    tier,
                    safety_gate_passed: false,
                    action_allowed: false,
                    block_reason: Some("safe_mode_only_notify".to_string()),
                    confidence: context.confidence,
                    baseline_confidence: context.baseline_confidence,
                    would_execute: false,
                });
                continue;
            }

            if let Err(reason) = tier_allowed(policy, tier, context) {
                out.push(ActionProposal {
                    action_type: action_spec.action_type,
                    params: action_spec.params.clone(),
                    tier,
                    safety_gate_passed: false,
                    action_allowed: false,
                    block_reason: Some(reason.to_string()),
                    confidence: context.confidence,
                    baseline_confidence: context.baseline_confidence,
                    would_execute: false,
                });
                continue;
            }

            let safety_ok = safety_gate_passed(policy, action_spec.action_type, independent_conditions);
            let (action_ok, block_reason) = confidence_gate(policy, action_spec.action_type, context);
            let allowed = safety_ok && action_ok;

            out.push(ActionProposal {
                action_type: action_spec.action_type,
                params: action_spec.params.clone(),
                tier,
                safety_gate_passed: safety_ok,
                action_allowed: allowed,
                block_reason: if allowed {
                    None
                } else {
                    Some(block_reason.unwrap_or("safety_gate_not_passed").to_string())
                },
                confidence: context.confidence,
                baseline_confidence: context.baseline_confidence,
                would_execute: allowed,
            });
        }
    }

    out
}

/// Outcome of attempting to record one proposed action (§4.6 "Execute").
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteOutcome {
    /// Recorded for audit only; no ledger row was written.
    DryRun,
    /// A gate blocked the action; no ledger row was written.
    Blocked {
        /// Why the action was blocked.
        reason: String,
    },
    /// A new `pending` ledger row was written.
    Pending,
    /// An existing ledger row with the same idempotency key was found.
    IdempotentSkip {
        /// Status of the existing entry.
        existing_status: ActionStatus,
    },
}

/// Result of executing one proposed action.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteResult {
    /// Action identifier (freshly generated, even for skips and blocks).
    pub action_id: ActionId,
    /// Action type.
    pub action_type: ActionType,
    /// What happened.
    pub outcome: ExecuteOutcome,
}

/// Proposes actions for `status` and records durable ledger state for each
/// (§4.6 "Execute"). External side effects are never performed here.
///
/// # Errors
/// Returns [`ActionError::Store`] if a ledger read or write fails.
#[allow(clippy::too_many_arguments, reason = "mirrors the engine's full execute() call shape; a builder would add indirection for one call site")]
pub fn execute(
    registry: &RunRegistry,
    policy: &ActionPolicy,
    status: RunStatus,
    context: &ActionContext,
    independent_conditions: &[bool],
    dry_run: bool,
    idempotency_key: Option<&str>,
    run_id: Option<&RunId>,
    decision_id: Option<&DecisionId>,
    created_at: &str,
) -> Result<Vec<ExecuteResult>, ActionError> {
    let proposals = propose_actions(policy, status, context, independent_conditions);
    let mut results = Vec::with_capacity(proposals.len());

    for proposal in proposals {
        let action_id = ActionId::new(Uuid::new_v4().to_string());

        if dry_run {
            results.push(ExecuteResult { action_id, action_type: proposal.action_type, outcome: ExecuteOutcome::DryRun });
            continue;
        }

        if !proposal.safety_gate_passed || !proposal.action_allowed {
            let reason = proposal.block_reason.unwrap_or_else(|| "safety_gate_not_passed".to_string());
            results.push(ExecuteResult { action_id, action_type: proposal.action_type, outcome: ExecuteOutcome::Blocked { reason } });
            continue;
        }

        if let Some(key) = idempotency_key {
            if let Some(existing) = registry.action_ledger_by_idempotency(key)? {
                results.push(ExecuteResult {
                    action_id: existing.action_id,
                    action_type: proposal.action_type,
                    outcome: ExecuteOutcome::IdempotentSkip { existing_status: existing.status },
                });
                continue;
            }
        }

        let payload = serde_json::json!({
            "params": proposal.params,
            "decision": status.as_str(),
            "confidence": proposal.confidence,
            "baseline_confidence": proposal.baseline_confidence,
        });
        let entry = ActionLedgerEntry {
            action_id: action_id.clone(),
            run_id: run_id.cloned(),
            decision_id: decision_id.cloned(),
            action_type: proposal.action_type.as_str().to_string(),
            status: ActionStatus::Pending,
            payload,
            idempotency_key: idempotency_key.map(str::to_string),
            safety_gate_passed: true,
            dry_run: false,
            created_at: created_at.to_string(),
            ack_at: None,
        };
        registry.action_ledger_insert(&entry)?;
        results.push(ExecuteResult { action_id, action_type: proposal.action_type, outcome: ExecuteOutcome::Pending });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use driftgate_config::ActionRule;
    use driftgate_config::ActionSpec;

    use super::*;

    fn registry() -> RunRegistry {
        RunRegistry::open_in_memory().expect("open")
    }

    fn policy_with_shutdown_rule() -> ActionPolicy {
        let mut policy = ActionPolicy::default();
        policy.rules.push(ActionRule {
            status: vec![RunStatus::Fail],
            conditions: vec![],
            actions: vec![ActionSpec { action_type: ActionType::Shutdown, params: serde_json::json!({}), tier: None }],
        });
        policy
    }

    #[test]
    fn propose_actions_only_matches_configured_status() {
        let policy = policy_with_shutdown_rule();
        let proposals = propose_actions(&policy, RunStatus::Pass, &ActionContext::default(), &[]);
        assert!(proposals.is_empty());
    }

    #[test]
    fn safe_mode_blocks_non_notify_actions() {
        let mut policy = policy_with_shutdown_rule();
        policy.hb_mode = HbMode::Safe;
        let proposals = propose_actions(&policy, RunStatus::Fail, &ActionContext::default(), &[true, true]);
        assert_eq!(proposals.len(), 1);
        assert!(!proposals[0].would_execute);
        assert_eq!(proposals[0].block_reason.as_deref(), Some("safe_mode_only_notify"));
    }

    #[test]
    fn shutdown_requires_safety_gate_and_multi_signal() {
        let policy = policy_with_shutdown_rule();
        let context = ActionContext { flagged_metric_count: 2, ..ActionContext::default() };
        let blocked = propose_actions(&policy, RunStatus::Fail, &context, &[true]);
        assert!(!blocked[0].would_execute);

        let allowed = propose_actions(&policy, RunStatus::Fail, &context, &[true, true]);
        assert!(allowed[0].would_execute);
    }

    #[test]
    fn execute_writes_pending_ledger_row_for_allowed_action() {
        let registry = registry();
        let mut policy = ActionPolicy::default();
        policy.rules.push(ActionRule {
            status: vec![RunStatus::Fail],
            conditions: vec![],
            actions: vec![ActionSpec { action_type: ActionType::Notify, params: serde_json::json!({}), tier: None }],
        });
        let results = execute(
            &registry,
            &policy,
            RunStatus::Fail,
            &ActionContext::default(),
            &[],
            false,
            None,
            None,
            None,
            "2026-07-28T00:00:00Z",
        )
        .expect("execute");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].outcome, ExecuteOutcome::Pending);
    }

    #[test]
    fn execute_is_idempotent_on_repeated_key() {
        let registry = registry();
        let mut policy = ActionPolicy::default();
        policy.rules.push(ActionRule {
            status: vec![RunStatus::Fail],
            conditions: vec![],
            actions: vec![ActionSpec { action_type: ActionType::Notify, params: serde_json::json!({}), tier: None }],
        });
        let first = execute(
            &registry,
            &policy,
            RunStatus::Fail,
            &ActionContext::default(),
            &[],
            false,
            Some("idem-1"),
            None,
            None,
            "2026-07-28T00:00:00Z",
        )
        .expect("execute");
        let second = execute(
            &registry,
            &policy,
            RunStatus::Fail,
            &ActionContext::default(),
            &[],
            false,
            Some("idem-1"),
            None,
            None,
            "2026-07-28T00:00:01Z",
        )
        .expect("execute");
        assert_eq!(second[0].action_id, first[0].action_id);
        assert!(matches!(second[0].outcome, ExecuteOutcome::IdempotentSkip { .. }));
    }

    #[test]
    fn execute_dry_run_writes_no_ledger_row() {
        let registry = registry();
        let mut policy = ActionPolicy::default();
        policy.rules.push(ActionRule {
            status: vec![RunStatus::Fail],
            conditions: vec![],
            actions: vec![ActionSpec { action_type: ActionType::Notify, params: serde_json::json!({}), tier: None }],
        });
        let results = execute(
            &registry,
            &policy,
            RunStatus::Fail,
            &ActionContext::default(),
            &[],
            true,
            None,
            None,
            None,
            "2026-07-28T00:00:00Z",
        )
        .expect("execute");
        assert_eq!(results[0].outcome, ExecuteOutcome::DryRun);
    }
}
