// crates/driftgate-broker/src/lib.rs
// ============================================================================
// Module: Broker Library
// Description: Ingest sources and alert sinks (§6, §9 external collaborators).
// Purpose: Crate root wiring the closed `Source`/`Sink` trait objects and
//          their reference implementations.
// Dependencies: driftgate-core, reqwest, tokio, url
// ============================================================================

//! ## Overview
//! Driftgate's daemon loop (C8) never talks to a message broker, syslog
//! socket, or webhook endpoint directly; it goes through the narrow
//! `Source`/`Sink` interfaces defined here. This crate ships the
//! dependency-light implementations — file replay and an in-memory fixture
//! on the ingest side, stdout/log/channel/webhook on the alert side —
//! grounded on `original_source/hb/ingest` and `original_source/hb/alerting`.
//!
//! Invariants:
//! - `Source` and `Sink` are closed sets: MQTT, Kafka, and syslog drivers
//!   are named in spec.md but intentionally unimplemented here.
//! - Neither trait performs decision logic; that stays in `driftgate-core`.

pub mod event;
pub mod sink;
pub mod source;

pub use event::AlertEvent;
pub use event::IngestEvent;
pub use sink::AlertReceipt;
pub use sink::ChannelSink;
pub use sink::LogSink;
pub use sink::Sink;
pub use sink::SinkError;
pub use sink::StdoutSink;
pub use sink::WebhookSink;
pub use sink::WebhookSinkPolicy;
pub use source::FileReplaySource;
pub use source::InlineSource;
pub use source::Source;
pub use source::SourceError;
