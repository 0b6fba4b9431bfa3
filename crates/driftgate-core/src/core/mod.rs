// crates/driftgate-core/src/core/mod.rs
// ============================================================================
// Module: Core
// Description: Identifiers, time, data model, metric registry, and errors —
//              the types shared by every other crate in the workspace.
// Purpose: Keep the pure data model separate from the runtime algorithms
//          that operate on it (see `crate::runtime`).
// Dependencies: serde, sha2, time
// ============================================================================

//! ## Overview
//! Nothing in `core` performs I/O or reads the wall clock. Callers (the
//! config loader, the store, the daemon) own those effects and pass values
//! in.

pub mod error;
pub mod hashing;
pub mod identifiers;
pub mod model;
pub mod registry;
pub mod time;

pub use error::CoreError;
pub use identifiers::ActionId;
pub use identifiers::ApprovalId;
pub use identifiers::CorrelationId;
pub use identifiers::DecisionId;
pub use identifiers::RequestId;
pub use identifiers::RunId;
pub use identifiers::TagName;
pub use model::ActionLedgerEntry;
pub use model::ActionStatus;
pub use model::BuildInfo;
pub use model::DecisionRecord;
pub use model::MetricMap;
pub use model::MetricValue;
pub use model::RunMeta;
pub use model::RunStatus;
pub use model::RunTimestamps;
pub use model::DECISION_RECORD_SCHEMA_VERSION;
pub use registry::ComparePlan;
pub use registry::DistributionDriftConfig;
pub use registry::MetricConfig;
pub use registry::MetricRegistry;
pub use registry::compile_plan;
pub use registry::hash_bytes;
pub use registry::normalize_alias;
pub use time::EventTime;
