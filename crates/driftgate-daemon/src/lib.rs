// crates/driftgate-daemon/src/lib.rs
// ============================================================================
// Crate: driftgate-daemon (C8)
// Description: The long-running orchestrator that ties ingest, comparison,
//              baseline selection, action proposal, alerting, and evidence
//              export into one scheduled loop.
// Purpose: Crate root for the daemon component.
// Dependencies: driftgate-action, driftgate-baseline, driftgate-broker,
//              driftgate-config, driftgate-core, driftgate-evidence,
//              driftgate-store-sqlite, time, tracing
// ============================================================================

//! ## Overview
//! `driftgate-daemon` is the only component that runs forever. Everything
//! else in this workspace is a library called from a single cycle or a CLI
//! command; this crate schedules those calls, buffers ingest between them,
//! and survives individual failures without crashing the process.
//!
//! Invariants:
//! - A single cycle's failure is logged and never unwinds the loop; only
//!   setup failures (an unreadable config, an unopenable registry) abort a
//!   run before it starts.
//! - The circuit breaker, when configured, wraps cycle execution only; it
//!   never suppresses ingest polling or checkpoint persistence.

pub mod aggregate;
pub mod checkpoint;
pub mod circuit_breaker;
pub mod config;
pub mod cycle;
pub mod error;
pub mod idempotency;
pub mod prune;
pub mod report;
pub mod runner;
pub mod sinks;

pub use crate::aggregate::aggregate_last;
pub use crate::checkpoint::Checkpoint;
pub use crate::checkpoint::load_checkpoint;
pub use crate::checkpoint::load_checkpoint_history;
pub use crate::checkpoint::save_checkpoint;
pub use crate::checkpoint::save_checkpoint_to_history;
pub use crate::circuit_breaker::CircuitBreaker;
pub use crate::circuit_breaker::CircuitOpenError;
pub use crate::config::CircuitBreakerConfig;
pub use crate::config::DaemonConfig;
pub use crate::config::load_daemon_config;
pub use crate::cycle::CycleOutcome;
pub use crate::cycle::run_daemon_cycle;
pub use crate::error::DaemonError;
pub use crate::idempotency::IdempotencyStore;
pub use crate::prune::prune_reports;
pub use crate::report::DriftAttributionSummary;
pub use crate::report::DriftReport;
pub use crate::report::write_report;
pub use crate::runner::run;
pub use crate::sinks::NamedSink;
pub use crate::sinks::build_sinks;
pub use crate::sinks::dispatch;
