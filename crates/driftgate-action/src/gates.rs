// crates/driftgate-action/src/gates.rs
// ============================================================================
// Module: Action Gates
// Description: Rule-condition matching, tier gating, the safety gate, and
//              the confidence/persistence gate.
// Purpose: Implement C6's per-action gating steps (§4.6 "Evaluation").
// Dependencies: driftgate-config, ret-logic
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/actions/engine.py`'s `_matches_conditions`,
//! `_tier_allowed`, `_safety_gate_passed`, and `_action_allowed`.
//!
//! The safety gate composes the caller's independent-condition booleans
//! through `ret_logic::convenience::at_least`, reusing the same requirement
//! tree the teacher uses for gate composition elsewhere, rather than a
//! bespoke `count >= 2` check.

use std::collections::BTreeMap;

use driftgate_config::ActionPolicy;
use driftgate_config::ActionType;
use driftgate_config::Condition;
use ret_logic::Requirement;
use ret_logic::convenience;

use crate::context::ActionContext;

/// Evaluates a [`Requirement<bool>`] tree built from pre-evaluated leaf
/// conditions. Leaves carry their own truth value, so no
/// [`ret_logic::traits::PredicateEval`] reader is needed.
fn eval_bool(req: &Requirement<bool>) -> bool {
    match req {
        Requirement::Predicate(value) => *value,
        Requirement::Not(inner) => !eval_bool(inner),
        Requirement::And(reqs) => reqs.iter().all(|r| eval_bool(r)),
        Requirement::Or(reqs) => reqs.iter().any(|r| eval_bool(r)),
        Requirement::RequireGroup { min, reqs } => {
            reqs.iter().filter(|r| eval_bool(r)).count() >= usize::from(*min)
        }
    }
}

/// Whether every condition in `conditions` holds against `values`. A
/// condition whose key is absent from `values` never holds.
#[must_use]
pub fn matches_conditions(conditions: &[Condition], values: &BTreeMap<String, f64>) -> bool {
    conditions.iter().all(|condition| {
        values
            .get(&condition.key)
            .is_some_and(|ctx_val| condition.op.holds(*ctx_val, condition.value))
    })
}

/// Tier gate: enforces `max_allowed_tier` and the tier-3 two-man rule
/// (§4.6 "Evaluation", tier gate).
///
/// # Errors
/// Returns a block reason string when the tier is disallowed.
pub fn tier_allowed(policy: &ActionPolicy, tier: u8, context: &ActionContext) -> Result<(), &'static str> {
    if let Some(max_tier) = policy.max_allowed_tier {
        if tier > max_tier {
            return Err("tier_above_max_allowed");
        }
    }
    if tier >= 3 && policy.require_two_man_for_tier3 {
        if context.approval_token.is_none() && context.second_approver_id.is_none() {
            return Err("tier3_requires_two_man_rule");
        }
        if context.persistence_cycles < policy.decision_authority.time_persistence_cycles {
            return Err("tier3_persistence_not_met");
        }
    }
    Ok(())
}

/// Safety gate: safety-critical action types require >= 2 independent
/// conditions when `safety_gate.require_two_conditions` is set (§4.6
/// "Evaluation", safety gate).
#[must_use]
pub fn safety_gate_passed(policy: &ActionPolicy, action_type: ActionType, independent_conditions: &[bool]) -> bool {
    if !action_type.is_safety_critical() {
        return true;
    }
    if !policy.safety_gate.require_two_conditions {
        return true;
    }
    let tree = convenience::at_least(2, independent_conditions.iter().map(|&value| convenience::predicate(value)).collect());
    eval_bool(&tree)
}

/// Confidence and persistence gate (§4.6 "Evaluation", confidence gate).
/// Returns `(allowed, block_reason)`.
#[must_use]
pub fn confidence_gate(policy: &ActionPolicy, action_type: ActionType, context: &ActionContext) -> (bool, Option<&'static str>) {
    let auth = &policy.decision_authority;

    if let (Some(min_confidence), Some(confidence)) = (auth.min_confidence, context.confidence) {
        if confidence < min_confidence {
            return (false, Some("confidence_below_min"));
        }
    }
    if let (Some(min_baseline), Some(baseline_confidence)) = (auth.min_baseline_confidence, context.baseline_confidence) {
        if baseline_confidence < min_baseline {
            return (false, Some("baseline_confidence_below_min"));
        }
    }
    if action_type.is_safety_critical() {
        if context.flagged_metric_count < auth.min_metrics_for_critical {
            return (false, Some("multi_signal_not_met"));
        }
        if auth.time_persistence_cycles > 0 && context.persistence_cycles < auth.time_persistence_cycles {
            return (false, Some("time_persistence_not_met"));
        }
    }
    let fail_safe = context.fail_safe || (policy.fail_safe_on_timing && !context.timing_slo_met);
    if fail_safe && action_type.is_safety_critical() {
        return (false, Some("fail_safe_on_timing"));
    }
    (true, None)
}

#[cfg(test)]
mod tests {
    use driftgate_config::ConditionOp;

    use super::*;

    #[test]
    fn matches_conditions_requires_present_key() {
        let conditions = vec![Condition { key: "flagged_metric_count".to_string(), op: ConditionOp::Ge, value: 2.0 }];
        let mut values = BTreeMap::new();
        assert!(!matches_conditions(&conditions, &values));
        values.insert("flagged_metric_count".to_string(), 2.0);
        assert!(matches_conditions(&conditions, &values));
    }

    #[test]
    fn tier_gate_blocks_above_max_allowed() {
        let mut policy = ActionPolicy::default();
        policy.max_allowed_tier = Some(2);
        let context = ActionContext::default();
        assert_eq!(tier_allowed(&policy, 3, &context), Err("tier_above_max_allowed"));
    }

    #[test]
    fn tier3_requires_approval_and_persistence() {
        let mut policy = ActionPolicy::default();
        policy.decision_authority.time_persistence_cycles = 3;
        let mut context = ActionContext::default();
        assert_eq!(tier_allowed(&policy, 3, &context), Err("tier3_requires_two_man_rule"));
        context.approval_token = Some("tok".to_string());
        assert_eq!(tier_allowed(&policy, 3, &context), Err("tier3_persistence_not_met"));
        context.persistence_cycles = 3;
        assert_eq!(tier_allowed(&policy, 3, &context), Ok(()));
    }

    #[test]
    fn safety_gate_requires_two_independent_conditions() {
        let policy = ActionPolicy::default();
        assert!(!safety_gate_passed(&policy, ActionType::Shutdown, &[true]));
        assert!(safety_gate_passed(&policy, ActionType::Shutdown, &[true, true]));
        assert!(safety_gate_passed(&policy, ActionType::Notify, &[]));
    }

    #[test]
    fn confidence_gate_blocks_below_minimum() {
        let mut policy = ActionPolicy::default();
        policy.decision_authority.min_confidence = Some(0.8);
        let mut context = ActionContext { confidence: Some(0.5), ..ActionContext::default() };
        assert_eq!(confidence_gate(&policy, ActionType::Notify, &context), (false, Some("confidence_below_min")));
        context.confidence = Some(0.9);
        assert_eq!(confidence_gate(&policy, ActionType::Notify, &context), (true, None));
    }

    #[test]
    fn confidence_gate_requires_flagged_metrics_for_critical() {
        let policy = ActionPolicy::default();
        let context = ActionContext { flagged_metric_count: 1, ..ActionContext::default() };
        assert_eq!(confidence_gate(&policy, ActionType::Abort, &context), (false, Some("multi_signal_not_met")));
    }

    #[test]
    fn fail_safe_blocks_safety_critical_actions() {
        let mut policy = ActionPolicy::default();
        policy.fail_safe_on_timing = true;
        let context = ActionContext { timing_slo_met: false, flagged_metric_count: 5, ..ActionContext::default() };
        assert_eq!(confidence_gate(&policy, ActionType::Abort, &context), (false, Some("fail_safe_on_timing")));
        assert_eq!(confidence_gate(&policy, ActionType::Notify, &context), (true, None));
    }
}
