// crates/driftgate-daemon/src/runner.rs
// ============================================================================
// Module: Daemon Runner
// Description: The long-running orchestrator loop tying ingest, the sliding
//              buffer, cycle execution, checkpointing, and pruning together.
// Purpose: Implement `daemon_main` (§4.8).
// Dependencies: driftgate-broker, driftgate-config, driftgate-core,
//              driftgate-store-sqlite, time, tracing
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/daemon.py::daemon_main`. A single
//! ingest-buffer-cycle loop that never exits on an ordinary cycle failure;
//! only the caller's shutdown flag or an unrecoverable setup error (a
//! config file that cannot be parsed, a registry that cannot be opened)
//! ends it.
//!
//! Invariants:
//! - The loop polls `shutdown` at least once per iteration and returns
//!   promptly once it is set, regardless of where in the interval it is.
//! - A single cycle's error is logged and never propagated out of the loop;
//!   only setup (building the source, opening the registry) can fail the
//!   whole run.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use driftgate_broker::FileReplaySource;
use driftgate_broker::IngestEvent;
use driftgate_broker::InlineSource;
use driftgate_broker::Source;
use driftgate_broker::SourceError;
use driftgate_core::MetricRegistry;
use driftgate_store_sqlite::RunRegistry;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::checkpoint::Checkpoint;
use crate::checkpoint::load_checkpoint;
use crate::checkpoint::save_checkpoint;
use crate::checkpoint::save_checkpoint_to_history;
use crate::circuit_breaker::CircuitBreaker;
use crate::config::DaemonConfig;
use crate::cycle::run_daemon_cycle;
use crate::error::DaemonError;
use crate::idempotency::IdempotencyStore;
use crate::prune::prune_reports;
use crate::sinks::NamedSink;
use crate::sinks::build_sinks;

const READ_BATCH_LIMIT: usize = 1000;
const POLL_TIMEOUT_SEC: f64 = 1.0;

/// Builds the configured ingest source. MQTT, Kafka, and syslog are named
/// in the config schema but have no driver here; selecting one is a setup
/// error rather than a silent no-op.
///
/// # Errors
/// Returns [`DaemonError::Source`] when the source kind is unrecognized or
/// a file-replay source has no configured path.
fn build_source(config: &DaemonConfig) -> Result<Box<dyn Source>, DaemonError> {
    match config.source.as_str() {
        "file_replay" => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| SourceError::ConnectFailed("file_replay source requires `path`".to_string()))?;
            Ok(Box::new(FileReplaySource::new(path)))
        }
        "inline" => Ok(Box::new(InlineSource::new(Vec::new()))),
        other => Err(SourceError::ConnectFailed(format!("unsupported ingest source: {other}")).into()),
    }
}

/// Drops buffered events older than `window_sec` relative to `now_unix`.
fn prune_buffer_to_window(buffer: &mut Vec<IngestEvent>, window_sec: u64, now_unix: i64) {
    let cutoff = now_unix.saturating_sub(window_sec as i64);
    buffer.retain(|event| event.timestamp.unix_seconds() >= cutoff);
}

fn status_label(status: driftgate_core::RunStatus) -> String {
    status.as_str().to_string()
}

/// Builds the idempotency key for an ingest event: stable across a restart
/// that re-reads the same source position, distinct across metrics/values/
/// timestamps.
fn ingest_idempotency_key(event: &IngestEvent) -> String {
    format!("{}:{}:{}", event.metric, event.timestamp.unix_seconds(), event.value)
}

/// Runs one buffered-window poll: reads from `source`, drops events already
/// seen by `idempotency` (a restart replaying the same source position),
/// appends the rest to `buffer`, then prunes `buffer` to `config.window_sec`.
fn poll_once(
    source: &mut dyn Source,
    idempotency: &IdempotencyStore,
    buffer: &mut Vec<IngestEvent>,
    config: &DaemonConfig,
) -> Result<(), DaemonError> {
    let events = source.read(READ_BATCH_LIMIT, Some(POLL_TIMEOUT_SEC))?;
    let now_unix = OffsetDateTime::now_utc().unix_timestamp();
    let now_rfc3339 = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    for event in events {
        let key = ingest_idempotency_key(&event);
        if idempotency.seen(&key)?.is_some() {
            continue;
        }
        idempotency.record(&key, "ingest", config.output_dir.to_string_lossy().as_ref(), &now_rfc3339)?;
        buffer.push(event);
    }
    prune_buffer_to_window(buffer, config.window_sec, now_unix);
    Ok(())
}

/// Runs the daemon's long-running loop until `shutdown` is set.
///
/// # Errors
/// Returns [`DaemonError`] if the metric registry, baseline policy, action
/// policy, run registry, or ingest source cannot be set up. Once running,
/// per-cycle errors are logged and the loop continues.
pub fn run(config: &DaemonConfig, shutdown: &AtomicBool) -> Result<(), DaemonError> {
    let metric_registry = load_metric_registry(config)?;
    let registry_hash = None;
    let baseline_policy = driftgate_config::baseline_policy::load(
        &driftgate_config::baseline_policy::resolve_path(config.baseline_policy_path.as_deref()),
    )?;
    let action_policy = driftgate_config::action_policy::load(
        &driftgate_config::action_policy::resolve_path(config.action_policy_path.as_deref()),
    )?;

    let store = RunRegistry::open(&config.db_path)?;
    let sinks: Vec<NamedSink> = build_sinks(config);

    let mut source = build_source(config)?;
    source.connect()?;
    let idempotency = IdempotencyStore::new(&config.output_dir);

    let mut breaker = config.circuit_breaker.as_ref().map(CircuitBreaker::new);
    let mut buffer: Vec<IngestEvent> = Vec::new();
    let now = Instant::now();
    let mut last_cycle = now.checked_sub(Duration::from_secs(config.interval_sec)).unwrap_or(now);

    if let Some(checkpoint) = load_checkpoint(&config.output_dir) {
        tracing::info!(last_status = %checkpoint.last_status, last_cycle_utc = %checkpoint.last_cycle_utc, "resumed from checkpoint");
    }

    while !shutdown.load(Ordering::SeqCst) {
        if let Err(error) = poll_once(source.as_mut(), &idempotency, &mut buffer, config) {
            tracing::warn!(%error, "ingest poll failed");
        }

        if last_cycle.elapsed() >= Duration::from_secs(config.interval_sec) {
            last_cycle = Instant::now();
            run_tick(config, &metric_registry, registry_hash, &baseline_policy, &action_policy, &store, &mut buffer, &sinks, breaker.as_mut());
        }

        std::thread::sleep(Duration::from_millis(200));
    }

    source.close();
    Ok(())
}

fn load_metric_registry(config: &DaemonConfig) -> Result<MetricRegistry, DaemonError> {
    Ok(driftgate_config::metric_registry::load(&driftgate_config::metric_registry::resolve_path(Some(
        &config.metric_registry_path,
    )))?)
}

#[allow(clippy::too_many_arguments, reason = "one tick needs every long-lived collaborator the loop owns")]
fn run_tick(
    config: &DaemonConfig,
    metric_registry: &MetricRegistry,
    registry_hash: Option<&str>,
    baseline_policy: &driftgate_config::BaselinePolicy,
    action_policy: &driftgate_config::ActionPolicy,
    store: &RunRegistry,
    buffer: &mut Vec<IngestEvent>,
    sinks: &[NamedSink],
    breaker: Option<&mut CircuitBreaker>,
) {
    let drained: Vec<IngestEvent> = std::mem::take(buffer);
    let cycle = || run_daemon_cycle(config, metric_registry, registry_hash, baseline_policy, action_policy, store, &drained, sinks);

    let outcome = match breaker {
        Some(breaker) => match breaker.call(cycle) {
            Ok(result) => result,
            Err(_circuit_open) => {
                tracing::warn!("circuit breaker open, skipping cycle");
                *buffer = drained;
                return;
            }
        },
        None => cycle(),
    };

    match outcome {
        Ok(cycle_outcome) => {
            let now_rfc3339 = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
            let checkpoint = Checkpoint {
                last_cycle_utc: now_rfc3339,
                last_status: status_label(cycle_outcome.status),
                last_report_dir: cycle_outcome.report_dir.as_ref().map(|p| p.display().to_string()),
            };
            if let Err(error) = save_checkpoint(&config.output_dir, &checkpoint) {
                tracing::warn!(%error, "failed to save checkpoint");
            }
            if let Err(error) = save_checkpoint_to_history(&config.output_dir, &checkpoint, config.checkpoint_history_entries) {
                tracing::warn!(%error, "failed to append checkpoint history");
            }
            prune_reports(&config.output_dir, config.max_report_dir_mb);
        }
        Err(error) => {
            tracing::warn!(%error, "daemon cycle failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use driftgate_core::EventTime;

    use super::*;

    fn event(metric: &str, unix_seconds: i64) -> IngestEvent {
        IngestEvent { timestamp: EventTime::from_unix_seconds(unix_seconds), metric: metric.to_string(), value: 1.0, unit: None }
    }

    #[test]
    fn prune_buffer_to_window_drops_events_older_than_the_window() {
        let mut buffer = vec![event("a", 0), event("b", 50), event("c", 100)];
        prune_buffer_to_window(&mut buffer, 60, 100);
        assert_eq!(buffer.iter().map(|e| e.metric.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn build_source_rejects_an_unknown_kind() {
        let config = DaemonConfig {
            source: "kafka".to_string(),
            path: None,
            interval_sec: 60,
            window_sec: 60,
            output_dir: std::env::temp_dir(),
            db_path: std::env::temp_dir().join("registry.db"),
            metric_registry_path: "registry.yaml".to_string(),
            baseline_policy_path: None,
            action_policy_path: None,
            baseline_tag: "golden".to_string(),
            alert_sinks: vec![],
            webhook_url: None,
            alert_file_path: "alerts.jsonl".to_string(),
            evidence_pack_on_fail: false,
            evidence_pack_always: false,
            max_report_dir_mb: 0.0,
            circuit_breaker: None,
            checkpoint_history_entries: 50,
        };
        assert!(build_source(&config).is_err());
    }
}
