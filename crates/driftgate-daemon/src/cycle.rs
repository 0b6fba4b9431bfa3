// crates/driftgate-daemon/src/cycle.rs
// ============================================================================
// Module: Daemon Cycle
// Description: One full ingest-to-report pass: normalize, select a
//              baseline, compare, persist, act, report, alert, and
//              optionally export an evidence pack.
// Purpose: Implement `run_daemon_cycle` (§4.8).
// Dependencies: driftgate-action, driftgate-broker, driftgate-config,
//              driftgate-core, driftgate-evidence, driftgate-store-sqlite,
//              time
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/daemon.py::run_daemon_cycle`. Each stage
//! mirrors the original's order: normalize, select baseline, compare,
//! write report, persist to the registry, alert, evidence pack.
//!
//! Invariants:
//! - A cycle with an empty buffer short-circuits to [`RunStatus::NoMetrics`]
//!   before touching the registry or metric registry config.
//! - Alert dispatch and evidence export never turn a successful cycle into
//!   a failed one; their errors are logged, not propagated.

use std::path::Path;
use std::path::PathBuf;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use driftgate_action::ActionContext;
use driftgate_action::execute;
use driftgate_broker::AlertEvent;
use driftgate_broker::IngestEvent;
use driftgate_config::ActionPolicy;
use driftgate_config::BaselinePolicy;
use driftgate_core::BuildInfo;
use driftgate_core::CompareOptions;
use driftgate_core::CorrelationId;
use driftgate_core::DecisionId;
use driftgate_core::RunId;
use driftgate_core::RunMeta;
use driftgate_core::RunStatus;
use driftgate_core::RunTimestamps;
use driftgate_core::compare_metrics;
use driftgate_core::normalize_metrics;
use driftgate_evidence::DecisionRecordInput;
use driftgate_evidence::EvidencePackInput;
use driftgate_evidence::build_decision_record;
use driftgate_evidence::export_evidence_pack;
use driftgate_evidence::write_decision_record;
use driftgate_store_sqlite::RunRegistry;
use driftgate_store_sqlite::SelectionPolicy;

use crate::aggregate::aggregate_last;
use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::report::DriftReport;
use crate::report::write_report;
use crate::sinks::NamedSink;
use crate::sinks::dispatch;

/// Outcome of a single daemon cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Resulting status.
    pub status: RunStatus,
    /// Report directory written for this cycle, if the buffer was non-empty.
    pub report_dir: Option<PathBuf>,
}

fn primary_issue(drift_metrics: &[String], fail_metrics: &[String]) -> &'static str {
    if !fail_metrics.is_empty() {
        "fail"
    } else if !drift_metrics.is_empty() {
        "drift"
    } else {
        "ok"
    }
}

fn severity_for_status(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Fail => "critical",
        RunStatus::PassWithDrift => "warning",
        RunStatus::Pass | RunStatus::NoMetrics | RunStatus::NoTest => "info",
    }
}

/// Runs one full daemon cycle over the buffered events.
///
/// # Errors
/// Returns [`DaemonError`] when the metric registry, action policy, or run
/// registry fail; alert dispatch and evidence export failures are logged
/// and never surfaced here.
#[allow(clippy::too_many_arguments, reason = "mirrors the cycle's distinct config/collaborator inputs")]
pub fn run_daemon_cycle(
    config: &DaemonConfig,
    metric_registry: &driftgate_core::MetricRegistry,
    registry_hash: Option<&str>,
    baseline_policy: &BaselinePolicy,
    action_policy: &ActionPolicy,
    registry: &RunRegistry,
    buffer: &[IngestEvent],
    sinks: &[NamedSink],
) -> Result<CycleOutcome, DaemonError> {
    if buffer.is_empty() {
        return Ok(CycleOutcome { status: RunStatus::NoMetrics, report_dir: None });
    }

    let raw = aggregate_last(buffer);
    let (normalized, mut warnings) = normalize_metrics(&raw, metric_registry);

    let now = OffsetDateTime::now_utc();
    let now_rfc3339 = now.format(&Rfc3339).unwrap_or_default();
    let compact_utc = format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    );
    let run_id = RunId::new(format!("daemon_{compact_utc}_{}", buffer.len()));
    let correlation_id = std::env::var("DRIFTGATE_CORRELATION_ID")
        .unwrap_or_else(|_| driftgate_core::core::hashing::random_run_id());

    let run_meta = RunMeta {
        run_id: run_id.clone(),
        program: None,
        subsystem: None,
        test_name: None,
        environment: None,
        build: BuildInfo::default(),
        timestamps: RunTimestamps { start_utc: Some(now_rfc3339.clone()), end_utc: Some(now_rfc3339.clone()) },
        source_system: Some("daemon".to_string()),
        correlation_id: Some(CorrelationId::new(correlation_id)),
    };

    let selection_policy = SelectionPolicy {
        tag: Some(config.baseline_tag.clone()),
        fallback_latest: baseline_policy.fallback_latest(),
    };
    let selection = registry.select_baseline(&run_meta, &selection_policy, registry_hash)?;
    let baseline_metrics = match &selection.baseline_run_id {
        Some(baseline_run_id) => registry.fetch_metrics(baseline_run_id)?,
        None => driftgate_core::MetricMap::new(),
    };

    let options = CompareOptions { distribution_enabled: baseline_policy.distribution_drift_enabled, ..CompareOptions::default() };
    let outcome = compare_metrics(&normalized, &baseline_metrics, metric_registry, options);
    warnings.extend(outcome.warnings.clone());

    let report_dir = config.output_dir.join(format!("daemon_{compact_utc}_{}", buffer.len()));
    let report = DriftReport::from_outcome(
        run_id.clone(),
        &outcome,
        selection.baseline_run_id.clone(),
        selection.reason.as_str().to_string(),
        selection.warning.clone(),
        warnings,
    );
    write_report(&report_dir, &report)?;

    registry.upsert_run(&run_meta, outcome.status, selection.baseline_run_id.as_ref(), registry_hash)?;
    registry.replace_metrics(&run_id, &normalized)?;

    let drift_metrics: Vec<String> = outcome.drift.iter().map(|entry| entry.metric.clone()).collect();
    let decision_record_path = propose_and_record_actions(
        registry,
        action_policy,
        &run_id,
        selection.baseline_run_id.as_ref(),
        run_meta.correlation_id.clone(),
        outcome.status,
        &drift_metrics,
        &outcome.fail,
        &report_dir,
        &now_rfc3339,
    )?;

    let alert = AlertEvent {
        timestamp: driftgate_core::EventTime::from_unix_seconds(now.unix_timestamp()),
        severity: severity_for_status(outcome.status).to_string(),
        status: outcome.status,
        run_id: run_id.clone(),
        primary_issue: Some(primary_issue(&drift_metrics, &outcome.fail).to_string()),
        report_path: Some(report_dir.display().to_string()),
        drift_metrics: drift_metrics.into_iter().take(10).collect(),
    };
    dispatch(sinks, &alert);

    maybe_export_evidence_pack(config, &run_id, &report_dir, Some(&decision_record_path), &now_rfc3339, outcome.status);

    Ok(CycleOutcome { status: outcome.status, report_dir: Some(report_dir) })
}

/// Turns the cycle's status into action proposals, executes the allowed
/// ones against the ledger, and writes the cycle's decision record
/// alongside the drift report (§4.6, §4.7).
#[allow(clippy::too_many_arguments, reason = "threads the cycle's run/baseline/correlation identity through to the decision record")]
fn propose_and_record_actions(
    registry: &RunRegistry,
    action_policy: &ActionPolicy,
    run_id: &RunId,
    baseline_run_id: Option<&RunId>,
    correlation_id: Option<CorrelationId>,
    status: RunStatus,
    drift_metrics: &[String],
    fail_metrics: &[String],
    report_dir: &Path,
    now_rfc3339: &str,
) -> Result<PathBuf, DaemonError> {
    let context = ActionContext {
        flagged_metric_count: u32::try_from(drift_metrics.len() + fail_metrics.len()).unwrap_or(u32::MAX),
        ..ActionContext::default()
    };
    let decision_id = DecisionId::new(format!("dec_{}", run_id.as_str()));
    let idempotency_key = run_id.as_str().to_string();
    let results = execute(
        registry,
        action_policy,
        status,
        &context,
        &[],
        false,
        Some(&idempotency_key),
        Some(run_id),
        Some(&decision_id),
        now_rfc3339,
    )?;
    for result in &results {
        tracing::info!(action_type = ?result.action_type, outcome = ?result.outcome, "action executed");
    }
    let action_allowed = results.iter().any(|result| matches!(result.outcome, driftgate_action::ExecuteOutcome::Pending));
    let action_requested = results.first().map(|result| result.action_type.as_str().to_string());

    let mut trigger_metrics = drift_metrics.to_vec();
    trigger_metrics.extend(fail_metrics.iter().cloned());

    let input = DecisionRecordInput {
        decision_id,
        run_id: run_id.clone(),
        status,
        confidence: None,
        baseline_confidence: None,
        trigger_metrics,
        action_requested,
        action_allowed,
        reason: primary_issue(drift_metrics, fail_metrics).to_string(),
        policy_version: None,
        config_hashes: std::collections::BTreeMap::new(),
        evidence_ref: None,
        baseline_run_id: baseline_run_id.cloned(),
        correlation_id,
    };
    let record = build_decision_record(input, now_rfc3339.to_string());
    Ok(write_decision_record(report_dir, &record)?)
}

/// Exports an evidence pack when the cycle failed (and the policy opts in)
/// or the policy always wants one. Failures are logged, not propagated,
/// matching `run_daemon_cycle`'s try/except around evidence export.
fn maybe_export_evidence_pack(
    config: &DaemonConfig,
    run_id: &RunId,
    report_dir: &Path,
    decision_record_path: Option<&Path>,
    generated_utc: &str,
    status: RunStatus,
) {
    let should_export = config.evidence_pack_always || (config.evidence_pack_on_fail && status == RunStatus::Fail);
    if !should_export {
        return;
    }
    let input = EvidencePackInput {
        case_id: run_id.as_str().to_string(),
        report_dir: report_dir.to_path_buf(),
        decision_record_path: decision_record_path.map(Path::to_path_buf),
        config_paths: std::collections::BTreeMap::from([(
            "metric_registry".to_string(),
            PathBuf::from(&config.metric_registry_path),
        )]),
        actions_policy_path: config.action_policy_path.as_ref().map(PathBuf::from),
        baseline_snapshot_path: None,
        raw_slice_path: None,
        sbom_hash: None,
        code_version: None,
        zip_output: true,
    };
    if let Err(error) = export_evidence_pack(&input, &config.output_dir, generated_utc) {
        tracing::warn!(%error, "evidence pack error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftgate_config::GovernancePolicy;
    use driftgate_core::EventTime;
    use driftgate_store_sqlite::RunRegistry;
    use std::collections::BTreeSet;

    fn sample_config(dir: &std::path::Path) -> DaemonConfig {
        DaemonConfig {
            source: "inline".to_string(),
            path: None,
            interval_sec: 60,
            window_sec: 60,
            output_dir: dir.to_path_buf(),
            db_path: dir.join("registry.db"),
            metric_registry_path: "registry.yaml".to_string(),
            baseline_policy_path: None,
            action_policy_path: None,
            baseline_tag: "golden".to_string(),
            alert_sinks: vec!["stdout".to_string()],
            webhook_url: None,
            alert_file_path: "alerts.jsonl".to_string(),
            evidence_pack_on_fail: false,
            evidence_pack_always: false,
            max_report_dir_mb: 0.0,
            circuit_breaker: None,
            checkpoint_history_entries: 50,
        }
    }

    fn empty_baseline_policy() -> BaselinePolicy {
        BaselinePolicy {
            tag: None,
            fallback: None,
            distribution_drift_enabled: true,
            governance: GovernancePolicy { require_approval: false, approvals_required: 1, approvers: BTreeSet::new() },
        }
    }

    #[test]
    fn empty_buffer_short_circuits_to_no_metrics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = sample_config(dir.path());
        let metric_registry = driftgate_core::MetricRegistry::new("1", std::collections::BTreeMap::new());
        let action_policy = ActionPolicy::default();
        let store = RunRegistry::open_in_memory().expect("open registry");

        let outcome = run_daemon_cycle(&config, &metric_registry, None, &empty_baseline_policy(), &action_policy, &store, &[], &[])
            .expect("cycle");
        assert_eq!(outcome.status, RunStatus::NoMetrics);
        assert!(outcome.report_dir.is_none());
    }

    #[test]
    fn non_empty_buffer_writes_a_report_and_persists_the_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = sample_config(dir.path());
        let metric_registry = driftgate_core::MetricRegistry::new("1", std::collections::BTreeMap::new());
        let action_policy = ActionPolicy::default();
        let store = RunRegistry::open_in_memory().expect("open registry");
        let buffer = vec![IngestEvent {
            timestamp: EventTime::from_unix_seconds(0),
            metric: "latency_ms".to_string(),
            value: 12.0,
            unit: None,
        }];

        let outcome =
            run_daemon_cycle(&config, &metric_registry, None, &empty_baseline_policy(), &action_policy, &store, &buffer, &[])
                .expect("cycle");
        assert!(outcome.report_dir.is_some());
        let report_dir = outcome.report_dir.expect("report dir");
        assert!(report_dir.join("drift_report.json").exists());
        assert!(report_dir.join("decision_record.json").exists());
    }
}
