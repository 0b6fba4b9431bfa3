// crates/driftgate-config/src/lib.rs
// ============================================================================
// Crate: driftgate-config
// Description: YAML configuration loaders for the metric registry, baseline
//              selection policy, baseline quality policy, action policy, and
//              the plaintext secret scanner.
// Purpose: Be the single place that touches the filesystem and environment
//          variables to produce the config types `driftgate-core` defines.
// Dependencies: driftgate-core, serde, serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! Every loader here follows the same shape: resolve a path from an explicit
//! argument, then an `HB_*` environment variable, then a default; read and
//! parse YAML; validate; return a typed policy or [`ConfigError`].
//!
//! Invariants:
//! - No loader in this crate panics on malformed input.
//! - Policies with no corresponding file on disk fall back to documented
//!   defaults rather than failing, except the metric registry, which has no
//!   sensible empty default and so requires a file to exist.

pub mod action_policy;
pub mod baseline_policy;
pub mod baseline_quality_policy;
pub mod error;
pub mod metric_registry;
pub mod secrets;

pub use crate::action_policy::ActionPolicy;
pub use crate::action_policy::ActionRule;
pub use crate::action_policy::ActionSpec;
pub use crate::action_policy::ActionType;
pub use crate::action_policy::Condition;
pub use crate::action_policy::ConditionOp;
pub use crate::action_policy::DecisionAuthority;
pub use crate::action_policy::HbMode;
pub use crate::action_policy::SafetyGate;
pub use crate::baseline_policy::BaselinePolicy;
pub use crate::baseline_policy::GovernancePolicy;
pub use crate::baseline_quality_policy::BaselineQualityPolicy;
pub use crate::baseline_quality_policy::QualityWeights;
pub use crate::error::ConfigError;
pub use crate::secrets::SuspectedSecret;
pub use crate::secrets::reject_plaintext_secrets;
pub use crate::secrets::should_reject_plaintext_secrets;
