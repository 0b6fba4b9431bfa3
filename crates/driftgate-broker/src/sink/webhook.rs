// crates/driftgate-broker/src/sink/webhook.rs
// ============================================================================
// Module: Webhook Sink
// Description: Delivers alerts as an HTTP POST, with the SSRF-safe host
//              policy enforcement the source side uses for fetches.
// Purpose: Implement the webhook alert sink named in spec.md §4.8/§9.
// Dependencies: driftgate-core, reqwest, url
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/alerting/sinks/webhook_sink.py`'s
//! `WebhookSink` (`urllib.request.urlopen(..., timeout=10)`), generalized
//! to the same allow/deny host policy the broker's HTTP source enforces on
//! fetches, since a webhook target is just as capable of pointing at an
//! internal service as a fetch URI is.
//!
//! Invariants:
//! - Redirects are rejected.
//! - Hosts resolving to a private, link-local, loopback, or multicast
//!   address are denied unless the policy explicitly allows it.
//! - A response body larger than the configured cap is rejected rather than
//!   read in full.

use std::io::Read;
use std::net::IpAddr;
use std::net::ToSocketAddrs;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use url::Host;
use url::Url;

use crate::event::AlertEvent;
use crate::sink::ReceiptFactory;
use crate::sink::Sink;
use crate::sink::SinkError;

use super::AlertReceipt;

const DEFAULT_MAX_RESPONSE_BYTES: u64 = 64 * 1024;
const DEFAULT_TIMEOUT_SEC: u64 = 10;

/// Host allow/deny policy for webhook targets, mirroring the source-side
/// `HttpSourcePolicy` enforcement.
#[derive(Debug, Clone, Default)]
pub struct WebhookSinkPolicy {
    allowlist: Option<Vec<HostPattern>>,
    denylist: Vec<HostPattern>,
    allow_private_networks: bool,
    max_response_bytes: Option<u64>,
    timeout_sec: Option<u64>,
}

impl WebhookSinkPolicy {
    /// Creates a default policy: public hosts only, a 64 KiB response cap,
    /// and a 10-second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts delivery to the given hosts (exact or `*.suffix` match).
    #[must_use]
    pub fn allow_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowlist = Some(parse_host_patterns(hosts));
        self
    }

    /// Explicitly denies the given hosts, checked before the allowlist.
    #[must_use]
    pub fn deny_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.denylist = parse_host_patterns(hosts);
        self
    }

    /// Allows delivery to private/link-local IP ranges.
    #[must_use]
    pub const fn allow_private_networks(mut self) -> Self {
        self.allow_private_networks = true;
        self
    }

    /// Caps the response body read from the webhook target.
    #[must_use]
    pub const fn max_response_bytes(mut self, bytes: u64) -> Self {
        self.max_response_bytes = Some(bytes);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout_sec: u64) -> Self {
        self.timeout_sec = Some(timeout_sec);
        self
    }

    fn max_bytes(&self) -> u64 {
        self.max_response_bytes.unwrap_or(DEFAULT_MAX_RESPONSE_BYTES)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec.unwrap_or(DEFAULT_TIMEOUT_SEC))
    }

    fn check_host(&self, url: &Url) -> Result<(), SinkError> {
        let host = url.host().ok_or_else(|| SinkError::DeliveryFailed("webhook url has no host".to_string()))?;
        let label = normalize_host_label(&host);
        if self.denylist.iter().any(|pattern| pattern.matches(&label)) {
            return Err(SinkError::DeliveryFailed(format!("host denied: {label}")));
        }
        if let Some(allowlist) = &self.allowlist
            && !allowlist.iter().any(|pattern| pattern.matches(&label))
        {
            return Err(SinkError::DeliveryFailed(format!("host not in allowlist: {label}")));
        }
        if self.allow_private_networks {
            return Ok(());
        }
        let port = url.port_or_known_default().unwrap_or(443);
        let ips = resolve_host_ips(&host, port)?;
        if ips.is_empty() {
            return Err(SinkError::DeliveryFailed(format!("host has no resolved ips: {label}")));
        }
        for ip in ips {
            if is_private_or_link_local(&ip) {
                return Err(SinkError::DeliveryFailed(format!("host resolves to a private or link-local address: {label}")));
            }
        }
        Ok(())
    }
}

/// Alert sink that POSTs each alert as JSON to a webhook URL.
pub struct WebhookSink {
    url: Url,
    client: Client,
    policy: WebhookSinkPolicy,
    receipts: ReceiptFactory,
}

impl WebhookSink {
    /// Creates a webhook sink posting to `url` under the default policy.
    ///
    /// # Errors
    /// Returns [`SinkError`] when `url` fails to parse or the HTTP client
    /// cannot be constructed.
    pub fn new(url: &str) -> Result<Self, SinkError> {
        Self::with_policy(url, WebhookSinkPolicy::new())
    }

    /// Creates a webhook sink posting to `url` under `policy`.
    ///
    /// # Errors
    /// Returns [`SinkError`] when `url` fails to parse or the HTTP client
    /// cannot be constructed.
    pub fn with_policy(url: &str, policy: WebhookSinkPolicy) -> Result<Self, SinkError> {
        let url = Url::parse(url).map_err(|err| SinkError::DeliveryFailed(format!("invalid webhook url: {err}")))?;
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(policy.timeout())
            .build()
            .map_err(|err| SinkError::DeliveryFailed(err.to_string()))?;
        Ok(Self { url, client, policy, receipts: ReceiptFactory::new("webhook") })
    }
}

impl Sink for WebhookSink {
    fn emit(&self, event: &AlertEvent) -> Result<AlertReceipt, SinkError> {
        self.policy.check_host(&self.url)?;

        let response = self
            .client
            .post(self.url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .json(event)
            .send()
            .map_err(|err| SinkError::DeliveryFailed(err.to_string()))?;

        if response.url() != &self.url {
            return Err(SinkError::DeliveryFailed(format!("webhook redirected from {} to {}", self.url, response.url())));
        }
        if !response.status().is_success() {
            return Err(SinkError::DeliveryFailed(format!("webhook returned status {}", response.status())));
        }

        let max_bytes = self.policy.max_bytes();
        let mut limited = response.take(max_bytes.saturating_add(1));
        let mut drained = Vec::new();
        limited.read_to_end(&mut drained).map_err(|err| SinkError::DeliveryFailed(err.to_string()))?;
        if drained.len() as u64 > max_bytes {
            return Err(SinkError::DeliveryFailed(format!("webhook response exceeded {max_bytes} bytes")));
        }

        Ok(self.receipts.next())
    }
}

#[derive(Debug, Clone)]
enum HostPattern {
    Exact(String),
    WildcardSuffix(String),
}

impl HostPattern {
    fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let normalized = normalize_host_string(trimmed);
        if let Some(suffix) = normalized.strip_prefix("*.") {
            return if suffix.is_empty() { None } else { Some(Self::WildcardSuffix(suffix.to_string())) };
        }
        Some(Self::Exact(normalized))
    }

    fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact(value) => host == value,
            Self::WildcardSuffix(suffix) => {
                if host.len() <= suffix.len() || !host.ends_with(suffix.as_str()) {
                    return false;
                }
                host.as_bytes().get(host.len() - suffix.len() - 1) == Some(&b'.')
            }
        }
    }
}

fn parse_host_patterns<I, S>(hosts: I) -> Vec<HostPattern>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    hosts.into_iter().filter_map(|host| HostPattern::parse(host.as_ref())).collect()
}

fn normalize_host_label(host: &Host<&str>) -> String {
    match host {
        Host::Domain(domain) => normalize_host_string(domain),
        Host::Ipv4(ip) => ip.to_string(),
        Host::Ipv6(ip) => ip.to_string(),
    }
}

fn normalize_host_string(host: &str) -> String {
    let trimmed = host.trim_end_matches('.');
    let trimmed = trimmed.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(trimmed);
    trimmed.to_ascii_lowercase()
}

fn resolve_host_ips(host: &Host<&str>, port: u16) -> Result<Vec<IpAddr>, SinkError> {
    match host {
        Host::Ipv4(ip) => Ok(vec![IpAddr::V4(*ip)]),
        Host::Ipv6(ip) => Ok(vec![IpAddr::V6(*ip)]),
        Host::Domain(domain) => (*domain, port)
            .to_socket_addrs()
            .map(|iter| iter.map(|addr| addr.ip()).collect())
            .map_err(|err| SinkError::DeliveryFailed(format!("dns lookup failed: {err}"))),
    }
}

fn is_private_or_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_private() || addr.is_loopback() || addr.is_link_local() || addr.is_unspecified() || addr.is_multicast() || addr.is_broadcast(),
        IpAddr::V6(addr) => {
            let mapped_private = addr.to_ipv4_mapped().is_some_and(|mapped| {
                mapped.is_private() || mapped.is_loopback() || mapped.is_link_local() || mapped.is_unspecified() || mapped.is_multicast() || mapped.is_broadcast()
            });
            mapped_private || addr.is_loopback() || addr.is_unique_local() || addr.is_unicast_link_local() || addr.is_unspecified() || addr.is_multicast()
        }
    }
}

#[cfg(test)]
mod tests {
    use driftgate_core::EventTime;
    use driftgate_core::RunId;
    use driftgate_core::RunStatus;

    use super::*;

    fn sample_event() -> AlertEvent {
        AlertEvent {
            timestamp: EventTime::from_unix_seconds(0),
            severity: "critical".to_string(),
            status: RunStatus::Fail,
            run_id: RunId::new("run-1".to_string()),
            primary_issue: None,
            report_path: None,
            drift_metrics: vec![],
        }
    }

    #[test]
    fn rejects_loopback_target_by_default() {
        let sink = WebhookSink::new("http://127.0.0.1:9/hook").expect("build sink");
        let err = sink.emit(&sample_event()).unwrap_err();
        assert!(matches!(err, SinkError::DeliveryFailed(reason) if reason.contains("private")));
    }

    #[test]
    fn allow_private_networks_permits_loopback_host_check() {
        let policy = WebhookSinkPolicy::new().allow_private_networks();
        let sink = WebhookSink::with_policy("http://127.0.0.1:9/hook", policy).expect("build sink");
        assert!(sink.policy.check_host(&sink.url).is_ok());
    }

    #[test]
    fn denylist_rejects_before_allowlist_is_consulted() {
        let policy = WebhookSinkPolicy::new().allow_private_networks().allow_hosts(["example.com"]).deny_hosts(["example.com"]);
        let sink = WebhookSink::with_policy("http://example.com/hook", policy).expect("build sink");
        let err = sink.policy.check_host(&sink.url).unwrap_err();
        assert!(matches!(err, SinkError::DeliveryFailed(reason) if reason.contains("denied")));
    }
}
