// crates/driftgate-core/src/lib.rs
// ============================================================================
// Crate: driftgate-core
// Description: Metric registry (C1) and decision engine (C4) — the data
//              model and pure comparison algorithms shared by the rest of
//              the Driftgate workspace.
// Purpose: Be the one crate every other Driftgate crate depends on.
// Dependencies: ret-logic, serde, serde_json, sha2, thiserror, bigdecimal,
//               time, rand
// ============================================================================

//! ## Overview
//! `driftgate-core` owns:
//! - the canonical metric catalog and compiled compare plan (C1),
//! - the pure `normalize_metrics` / `compare_metrics` pipeline (C4),
//! - the shared wire-format data model (runs, metrics, decision records,
//!   action-ledger entries) used by every other crate in the workspace.
//!
//! Invariants:
//! - Nothing in this crate performs I/O or reads the wall clock.
//! - `compare_metrics` is deterministic: identical inputs always produce
//!   byte-identical output.
//!
//! Security posture: this crate only processes already-normalized, locally
//! supplied configuration and metric data; it does not parse untrusted
//! network input directly.

pub mod core;
pub mod runtime;

pub use crate::core::ActionId;
pub use crate::core::ActionLedgerEntry;
pub use crate::core::ActionStatus;
pub use crate::core::ApprovalId;
pub use crate::core::BuildInfo;
pub use crate::core::ComparePlan;
pub use crate::core::CoreError;
pub use crate::core::CorrelationId;
pub use crate::core::DecisionId;
pub use crate::core::DecisionRecord;
pub use crate::core::DistributionDriftConfig;
pub use crate::core::EventTime;
pub use crate::core::MetricConfig;
pub use crate::core::MetricMap;
pub use crate::core::MetricRegistry;
pub use crate::core::MetricValue;
pub use crate::core::RequestId;
pub use crate::core::RunId;
pub use crate::core::RunMeta;
pub use crate::core::RunStatus;
pub use crate::core::RunTimestamps;
pub use crate::core::TagName;
pub use crate::core::DECISION_RECORD_SCHEMA_VERSION;
pub use crate::core::compile_plan;
pub use crate::core::hash_bytes;
pub use crate::core::normalize_alias;
pub use crate::runtime::Attribution;
pub use crate::runtime::CompareOptions;
pub use crate::runtime::CompareOutcome;
pub use crate::runtime::Confidence;
pub use crate::runtime::DistributionDrift;
pub use crate::runtime::DriftEntry;
pub use crate::runtime::InvariantViolation;
pub use crate::runtime::RawMetrics;
pub use crate::runtime::compare_metrics;
pub use crate::runtime::ks_statistic;
pub use crate::runtime::normalize_metrics;
