// crates/driftgate-baseline/src/tagging.rs
// ============================================================================
// Module: Baseline Tagging Workflow
// Description: Governs how a baseline tag request accumulates approvals
//              before the tag is actually set.
// Purpose: Implement C3's "Tagging workflow" operation (§4.3).
// Dependencies: driftgate-config, driftgate-store-sqlite
// ============================================================================

//! ## Overview
//! When `governance.require_approval` is false, [`request_tag`] sets the tag
//! immediately and skips the request/approval bookkeeping entirely — the
//! workflow only exists to gate tagging when governance demands it.

use driftgate_config::GovernancePolicy;
use driftgate_core::RunId;
use driftgate_store_sqlite::RunRegistry;

use crate::error::BaselineError;

/// Outcome of requesting a baseline tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRequestOutcome {
    /// Governance does not require approval; the tag was set immediately.
    TaggedImmediately,
    /// A request was opened and is awaiting approvals.
    Pending {
        /// Identifier of the opened request.
        request_id: String,
    },
}

/// Requests that `tag` be pointed at `run_id`, honoring `policy`'s
/// governance rules (§4.3 "Tagging workflow").
///
/// # Errors
/// Returns [`BaselineError::Store`] on a registry failure.
pub fn request_tag(
    registry: &RunRegistry,
    policy: &GovernancePolicy,
    request_id: &str,
    tag: &str,
    run_id: &RunId,
    requested_by: Option<&str>,
    registry_hash: Option<&str>,
) -> Result<TagRequestOutcome, BaselineError> {
    if !policy.require_approval {
        registry.set_tag(tag, run_id, registry_hash)?;
        return Ok(TagRequestOutcome::TaggedImmediately);
    }

    registry.add_request(request_id, tag, run_id, requested_by)?;
    Ok(TagRequestOutcome::Pending { request_id: request_id.to_string() })
}

/// Records an approval from `approver` and, once `approvals_required`
/// distinct approvals are reached, resolves the request and sets the tag.
///
/// # Errors
/// Returns [`BaselineError::Governance`] if `approver` is not in
/// `policy.approvers`, or [`BaselineError::Store`] on a registry failure.
pub fn approve_tag(
    registry: &RunRegistry,
    policy: &GovernancePolicy,
    request_id: &str,
    approver: &str,
    registry_hash: Option<&str>,
) -> Result<bool, BaselineError> {
    if !policy.approvers.is_empty() && !policy.approvers.contains(approver) {
        return Err(BaselineError::Governance(format!("'{approver}' is not an authorized approver")));
    }

    registry.add_approval(request_id, approver)?;
    let approvals = registry.count_approvals(request_id)?;
    if approvals < policy.approvals_required {
        return Ok(false);
    }

    let request = registry.get_request(request_id)?;
    registry.set_status(request_id, "approved")?;
    registry.set_tag(&request.tag, &request.run_id, registry_hash)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn registry_with_run(run_id: &str) -> RunRegistry {
        use driftgate_core::BuildInfo;
        use driftgate_core::RunMeta;
        use driftgate_core::RunStatus;
        use driftgate_core::RunTimestamps;

        let registry = RunRegistry::open_in_memory().expect("open");
        registry
            .upsert_run(
                &RunMeta {
                    run_id: RunId::new(run_id),
                    program: None,
                    subsystem: None,
                    test_name: None,
                    environment: None,
                    build: BuildInfo::default(),
                    timestamps: RunTimestamps::default(),
                    source_system: None,
                    correlation_id: None,
                },
                RunStatus::Pass,
                None,
                None,
            )
            .expect("upsert");
        registry
    }

    #[test]
    fn no_approval_required_tags_immediately() {
        let registry = registry_with_run("run-1");
        let policy = GovernancePolicy::default();
        let run_id = RunId::new("run-1");
        let outcome =
            request_tag(&registry, &policy, "req-1", "stable", &run_id, None, None).expect("request");
        assert_eq!(outcome, TagRequestOutcome::TaggedImmediately);
        let tags = registry.list_tags().expect("list");
        assert_eq!(tags, vec![("stable".to_string(), run_id)]);
    }

    #[test]
    fn approval_required_stays_pending_until_threshold_met() {
        let registry = registry_with_run("run-2");
        let run_id = RunId::new("run-2");
        let policy = GovernancePolicy {
            require_approval: true,
            approvals_required: 2,
            approvers: BTreeSet::from(["alice".to_string(), "bob".to_string()]),
        };
        let outcome =
            request_tag(&registry, &policy, "req-2", "stable", &run_id, Some("carol"), None).expect("request");
        assert!(matches!(outcome, TagRequestOutcome::Pending { .. }));

        let resolved_after_first = approve_tag(&registry, &policy, "req-2", "alice", None).expect("approve");
        assert!(!resolved_after_first);
        assert!(registry.list_tags().expect("list").is_empty());

        let resolved_after_second = approve_tag(&registry, &policy, "req-2", "bob", None).expect("approve");
        assert!(resolved_after_second);
        assert_eq!(registry.list_tags().expect("list"), vec![("stable".to_string(), run_id)]);
    }

    #[test]
    fn unauthorized_approver_is_rejected() {
        let registry = registry_with_run("run-3");
        let run_id = RunId::new("run-3");
        let policy = GovernancePolicy {
            require_approval: true,
            approvals_required: 1,
            approvers: BTreeSet::from(["alice".to_string()]),
        };
        request_tag(&registry, &policy, "req-3", "stable", &run_id, None, None).expect("request");
        let err = approve_tag(&registry, &policy, "req-3", "mallory", None).expect_err("rejected");
        assert!(matches!(err, BaselineError::Governance(_)));
    }
}
