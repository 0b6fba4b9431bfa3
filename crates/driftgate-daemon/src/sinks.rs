// crates/driftgate-daemon/src/sinks.rs
// ============================================================================
// Module: Alert Dispatch
// Description: Builds the configured alert sinks and fans an `AlertEvent`
//              out to all of them.
// Purpose: Implement `run_daemon_cycle`'s per-sink try/except alert
//          dispatch (§4.8, §9).
// Dependencies: driftgate-broker, tracing
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/daemon.py::run_daemon_cycle`'s alert
//! loop: each configured sink name is resolved to a concrete [`Sink`] and
//! invoked independently, with a failure in one sink logged and skipped
//! rather than aborting the others or the cycle.
//!
//! Invariants:
//! - One sink's failure never prevents the remaining sinks from being
//!   tried.

use driftgate_broker::AlertEvent;
use driftgate_broker::LogSink;
use driftgate_broker::Sink;
use driftgate_broker::StdoutSink;
use driftgate_broker::WebhookSink;

use crate::config::DaemonConfig;

/// A named, constructed alert sink.
pub struct NamedSink {
    /// Configured sink name, used only for logging.
    pub name: String,
    /// The sink itself.
    pub sink: Box<dyn Sink>,
}

/// Builds the sinks named in `config.alert_sinks`, skipping any that fail
/// to construct (an invalid webhook URL, for example) with a warning.
#[must_use]
pub fn build_sinks(config: &DaemonConfig) -> Vec<NamedSink> {
    let mut sinks = Vec::new();
    for name in &config.alert_sinks {
        let lower = name.to_lowercase();
        let built: Option<Box<dyn Sink>> = match lower.as_str() {
            "stdout" => Some(Box::new(StdoutSink::new())),
            "file" => match std::fs::File::options().create(true).append(true).open(&config.alert_file_path) {
                Ok(file) => Some(Box::new(LogSink::new(file))),
                Err(error) => {
                    tracing::warn!(sink = %lower, %error, "alert sink error");
                    None
                }
            },
            "webhook" => match &config.webhook_url {
                Some(url) => match WebhookSink::new(url) {
                    Ok(sink) => Some(Box::new(sink)),
                    Err(error) => {
                        tracing::warn!(sink = %lower, %error, "alert sink error");
                        None
                    }
                },
                None => {
                    tracing::warn!(sink = %lower, "webhook sink configured without webhook_url");
                    None
                }
            },
            other => {
                tracing::warn!(sink = other, "unknown alert sink, skipping");
                None
            }
        };
        if let Some(sink) = built {
            sinks.push(NamedSink { name: lower, sink });
        }
    }
    sinks
}

/// Emits `event` to every sink in `sinks`, logging and continuing past any
/// individual sink failure.
pub fn dispatch(sinks: &[NamedSink], event: &AlertEvent) {
    for named in sinks {
        if let Err(error) = named.sink.emit(event) {
            tracing::warn!(sink = %named.name, %error, "alert sink error");
        }
    }
}
