// crates/driftgate-evidence/src/lib.rs
// ============================================================================
// Module: Evidence, Replay & Verification (C7)
// Description: Decision records, the hash-chained audit log, artifact
//              manifests, evidence-pack export, replay, and independent
//              decision verification.
// Purpose: Crate root for the evidence component.
// Dependencies: csv, driftgate-config, driftgate-core,
//              driftgate-store-sqlite, serde_jcs, zip
// ============================================================================

//! ## Overview
//! Everything a decision needs to be defensible after the fact lives here:
//! the decision record itself, the artifacts it references, the
//! append-only audit trail, and the replay/verify paths an auditor uses to
//! check a decision independently of the daemon that made it.
//!
//! Invariants:
//! - Nothing in this crate reads the wall clock; every timestamp is
//!   supplied by the caller.
//! - Replay and verification never mutate the evidence they read.

pub mod audit;
pub mod decision_record;
pub mod error;
pub mod manifest;
pub mod metrics_csv;
pub mod pack;
pub mod replay;
pub mod verify;

pub use crate::audit::AuditEntry;
pub use crate::audit::append_audit_log;
pub use crate::audit::verify_audit_log;
pub use crate::decision_record::DecisionRecordInput;
pub use crate::decision_record::build_decision_record;
pub use crate::decision_record::write_decision_record;
pub use crate::error::EvidenceError;
pub use crate::manifest::ManifestEntry;
pub use crate::manifest::file_hash;
pub use crate::manifest::verify_artifact_manifest;
pub use crate::manifest::write_artifact_manifest;
pub use crate::metrics_csv::MetricsCsvRow;
pub use crate::metrics_csv::read_metrics_csv;
pub use crate::metrics_csv::rows_to_raw_metrics;
pub use crate::metrics_csv::write_metrics_csv;
pub use crate::pack::EvidenceManifest;
pub use crate::pack::EvidencePackInput;
pub use crate::pack::export_evidence_pack;
pub use crate::replay::MetricSource;
pub use crate::replay::ReplayConfigRef;
pub use crate::replay::ReplayResult;
pub use crate::replay::combined_config_hash;
pub use crate::replay::load_baseline;
pub use crate::replay::load_metrics_from_path;
pub use crate::replay::replay_decision;
pub use crate::verify::VerifyOutcome;
pub use crate::verify::verify_decision;
