// crates/driftgate-daemon/src/config.rs
// ============================================================================
// Module: Daemon Config
// Description: YAML configuration for the orchestrator loop.
// Purpose: Load the single config file `daemon_main` reads in
//          `original_source/hb/daemon.py`.
// Dependencies: driftgate-config, serde, serde_yaml
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/daemon.py::load_daemon_config` and the
//! fields `run_daemon_cycle`/`daemon_main` read off the parsed dict.
//! Unlike the loaders in `driftgate-config`, a missing daemon config file is
//! a hard error: there is no sensible default ingest source or output
//! directory.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use driftgate_config::ConfigError;

fn default_source() -> String {
    "file_replay".to_string()
}

fn default_interval_sec() -> u64 {
    300
}

fn default_window_sec() -> u64 {
    300
}

fn default_baseline_tag() -> String {
    "golden".to_string()
}

fn default_alert_sinks() -> Vec<String> {
    vec!["stdout".to_string()]
}

fn default_alert_file_path() -> String {
    "alerts.jsonl".to_string()
}

fn default_checkpoint_history() -> usize {
    50
}

/// Circuit breaker tuning, present only when the daemon should guard cycles
/// with one (§4.8 "circuit breaker").
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive-window failure count that opens the breaker.
    pub failure_threshold: u32,
    /// Sliding window, in seconds, over which failures are counted.
    pub window_sec: f64,
    /// How long the breaker stays open before auto-resetting.
    pub open_sec: f64,
}

/// Parsed daemon configuration (§4.8).
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Ingest source kind: `"file_replay"`, `"inline"`, or a named-but-out-
    /// of-scope driver (`"mqtt"`, `"kafka"`, `"syslog"`).
    #[serde(default = "default_source")]
    pub source: String,
    /// Source-specific path (the file-replay event log, for example).
    #[serde(default)]
    pub path: Option<String>,
    /// How often, in seconds, a cycle runs against the buffered window.
    #[serde(default = "default_interval_sec")]
    pub interval_sec: u64,
    /// How long buffered events are retained before being pruned.
    #[serde(default = "default_window_sec")]
    pub window_sec: u64,
    /// Directory report subdirectories (`daemon_<utc>_<n>`) are written under.
    pub output_dir: PathBuf,
    /// Path to the `driftgate-store-sqlite` registry database.
    pub db_path: PathBuf,
    /// Path to the metric registry YAML (§4.1).
    pub metric_registry_path: String,
    /// Path to the baseline selection policy YAML (§4.3), if any.
    #[serde(default)]
    pub baseline_policy_path: Option<String>,
    /// Path to the action policy YAML (§4.6), if any.
    #[serde(default)]
    pub action_policy_path: Option<String>,
    /// Baseline tag this daemon's cycles select against.
    #[serde(default = "default_baseline_tag")]
    pub baseline_tag: String,
    /// Alert sink names to dispatch to each cycle (§4.8, §9).
    #[serde(default = "default_alert_sinks")]
    pub alert_sinks: Vec<String>,
    /// Webhook URL, required when `"webhook"` is in `alert_sinks`.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// JSONL path the `"file"` alert sink appends to.
    #[serde(default = "default_alert_file_path")]
    pub alert_file_path: String,
    /// Export an evidence pack whenever a cycle's status is `FAIL`.
    #[serde(default)]
    pub evidence_pack_on_fail: bool,
    /// Export an evidence pack after every cycle, regardless of status.
    #[serde(default)]
    pub evidence_pack_always: bool,
    /// Report-directory size cap in megabytes; `0` or absent disables pruning.
    #[serde(default)]
    pub max_report_dir_mb: f64,
    /// Circuit breaker tuning, if the cycle should be guarded by one.
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    /// Maximum checkpoint history entries retained (§4.8 "rotate checkpoint
    /// history").
    #[serde(default = "default_checkpoint_history")]
    pub checkpoint_history_entries: usize,
}

impl DaemonConfig {
    /// Path the daemon persists its last-cycle checkpoint to.
    #[must_use]
    pub fn checkpoint_path(&self) -> PathBuf {
        self.output_dir.join("daemon_checkpoint.json")
    }
}

/// Loads and parses a daemon config file.
///
/// # Errors
/// Returns [`ConfigError`] when the file is missing or not valid YAML; a
/// missing daemon config has no sensible default, unlike the policy loaders
/// in `driftgate-config`.
pub fn load_daemon_config(path: &Path) -> Result<DaemonConfig, ConfigError> {
    let path_str = path.to_string_lossy().to_string();
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io { path: path_str.clone(), source })?;
    serde_yaml::from_slice(&bytes).map_err(|source| ConfigError::Yaml { path: path_str, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_when_optional_fields_are_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("daemon.yaml");
        std::fs::write(
            &path,
            "output_dir: /tmp/driftgate-reports\ndb_path: /tmp/driftgate.db\nmetric_registry_path: registry.yaml\n",
        )
        .expect("write config");

        let config = load_daemon_config(&path).expect("load");
        assert_eq!(config.source, "file_replay");
        assert_eq!(config.interval_sec, 300);
        assert_eq!(config.window_sec, 300);
        assert_eq!(config.baseline_tag, "golden");
        assert_eq!(config.alert_sinks, vec!["stdout".to_string()]);
        assert!(!config.evidence_pack_on_fail);
        assert!(config.circuit_breaker.is_none());
    }

    #[test]
    fn missing_file_is_an_error_unlike_the_policy_loaders() {
        let err = load_daemon_config(Path::new("/nonexistent/daemon.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
