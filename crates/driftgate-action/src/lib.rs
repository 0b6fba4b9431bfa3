// crates/driftgate-action/src/lib.rs
// ============================================================================
// Module: Action Engine (C6)
// Description: Policy-driven gating and idempotent ledger proposal for
//              operator and automated actions triggered by a decision.
// Purpose: Crate root for the action-engine component.
// Dependencies: driftgate-config, driftgate-core, driftgate-store-sqlite,
//              ret-logic
// ============================================================================

//! ## Overview
//! Turns a decision status and its surrounding context into a list of
//! gated action proposals, then records the allowed ones as `pending`
//! ledger rows. The engine never performs the external side effect of an
//! action itself; a separate executor drains `pending` rows and
//! acknowledges them.
//!
//! Invariants:
//! - `propose_actions` is pure: it reads `policy` and `context` and
//!   produces no side effects.
//! - `execute` checks gates, dry-run, and idempotency in that order before
//!   ever writing a ledger row.
//! - Safety-critical action types (`abort`, `shutdown`) always route
//!   through the safety gate, regardless of rule configuration.

pub mod context;
pub mod engine;
pub mod error;
pub mod gates;

pub use crate::context::ActionContext;
pub use crate::engine::ActionProposal;
pub use crate::engine::ExecuteOutcome;
pub use crate::engine::ExecuteResult;
pub use crate::engine::execute;
pub use crate::engine::propose_actions;
pub use crate::error::ActionError;
pub use crate::gates::confidence_gate;
pub use crate::gates::matches_conditions;
pub use crate::gates::safety_gate_passed;
pub use crate::gates::tier_allowed;
