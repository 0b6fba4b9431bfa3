// crates/driftgate-baseline/src/lib.rs
// ============================================================================
// Crate: driftgate-baseline
// Description: Baseline governance (C3): selection, tagging workflow,
//              quality scoring, decay detection, window-based creation.
// Purpose: Sit between `driftgate-store-sqlite` (storage) and
//          `driftgate-daemon`/`driftgate-cli` (orchestration) as the home
//          for baseline-specific policy logic.
// Dependencies: driftgate-config, driftgate-core, driftgate-store-sqlite,
//               thiserror
// ============================================================================

//! ## Overview
//! Baseline *selection* itself (`select_baseline`) lives on
//! [`driftgate_store_sqlite::RunRegistry`] since it is a pure registry query;
//! this crate adds the governance, scoring, decay, and aggregation logic
//! layered on top of that query.
//!
//! Invariants:
//! - Quality scoring and decay detection never touch the registry directly;
//!   callers supply the metric maps and signals they already fetched.

pub mod decay;
pub mod error;
pub mod quality;
pub mod tagging;
pub mod window;

pub use crate::decay::DecayPolicy;
pub use crate::decay::DecayReason;
pub use crate::decay::detect_decay;
pub use crate::error::BaselineError;
pub use crate::quality::QualityScore;
pub use crate::quality::QualitySignals;
pub use crate::quality::score_baseline;
pub use crate::tagging::TagRequestOutcome;
pub use crate::tagging::approve_tag;
pub use crate::tagging::request_tag;
pub use crate::window::aggregate_window;
