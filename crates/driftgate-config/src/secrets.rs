// crates/driftgate-config/src/secrets.rs
// ============================================================================
// Module: Plaintext Secret Scanner
// Description: Recursive scan of JSON configuration/payload values for
//              plaintext-looking secrets.
// Purpose: Back the `HB_REJECT_PLAINTEXT_SECRETS` ambient safety gate used
//          by the broker and daemon when ingesting external metric payloads.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/config_validation.py`'s plaintext-secret
//! heuristics: key names that look credential-shaped, plus long high-entropy
//! bearer-token-shaped string values.
//!
//! This is a heuristic, not a guarantee. It exists to catch accidental
//! plaintext secrets in metric tags and payloads before they are persisted
//! or exported in an evidence pack.

/// Name of the environment variable that enables secret rejection.
pub const HB_REJECT_PLAINTEXT_SECRETS_ENV: &str = "HB_REJECT_PLAINTEXT_SECRETS";

const SUSPICIOUS_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "api_key",
    "apikey",
    "access_token",
    "private_key",
    "client_secret",
];

const MIN_TOKEN_LOOKING_LEN: usize = 20;

/// Whether the `HB_REJECT_PLAINTEXT_SECRETS` environment variable is set to
/// a truthy value (`"1"`, `"true"`, case-insensitive).
#[must_use]
pub fn should_reject_plaintext_secrets() -> bool {
    std::env::var(HB_REJECT_PLAINTEXT_SECRETS_ENV)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true"))
        .unwrap_or(false)
}

/// A single location where a plaintext secret was suspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspectedSecret {
    /// Dotted path to the offending value, e.g. `"tags.api_key"`.
    pub path: String,
    /// Why this value was flagged.
    pub reason: &'static str,
}

fn key_looks_like_secret(key: &str) -> bool {
    let lower = key.to_lowercase();
    SUSPICIOUS_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}

fn value_looks_like_token(value: &str) -> bool {
    value.len() >= MIN_TOKEN_LOOKING_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && value.chars().any(char::is_numeric)
        && value.chars().any(|c| c.is_ascii_alphabetic())
}

fn scan_value(path: &str, value: &serde_json::Value, out: &mut Vec<SuspectedSecret>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                if key_looks_like_secret(key) {
                    if let serde_json::Value::String(s) = child {
                        if !s.is_empty() {
                            out.push(SuspectedSecret {
                                path: child_path.clone(),
                                reason: "key name looks credential-shaped",
                            });
                        }
                    }
                }
                scan_value(&child_path, child, out);
            }
        }
        serde_json::Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let child_path = format!("{path}[{index}]");
                scan_value(&child_path, child, out);
            }
        }
        serde_json::Value::String(s) => {
            if value_looks_like_token(s) {
                out.push(SuspectedSecret {
                    path: path.to_string(),
                    reason: "value looks like a high-entropy bearer token",
                });
            }
        }
        serde_json::Value::Null | serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {}
    }
}

/// Recursively scans `value` for plaintext-looking secrets.
///
/// Returns every suspected location; an empty vector means the value is
/// clean. Callers gate rejection behavior on [`should_reject_plaintext_secrets`].
#[must_use]
pub fn reject_plaintext_secrets(value: &serde_json::Value) -> Vec<SuspectedSecret> {
    let mut out = Vec::new();
    scan_value("", value, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flags_credential_shaped_key() {
        let value = json!({"tags": {"api_key": "abc123def456ghi789jk"}});
        let found = reject_plaintext_secrets(&value);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "tags.api_key");
    }

    #[test]
    fn flags_bearer_token_shaped_value_regardless_of_key() {
        let value = json!({"note": "sk-ab12cd34ef56gh78ij90kl"});
        let found = reject_plaintext_secrets(&value);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn clean_payload_yields_no_findings() {
        let value = json!({"latency_ms": 42.5, "environment": "staging"});
        assert!(reject_plaintext_secrets(&value).is_empty());
    }

    #[test]
    fn token_heuristic_requires_both_letters_and_digits() {
        assert!(value_looks_like_token("abcdefghij1234567890"));
        assert!(!value_looks_like_token("aaaaaaaaaaaaaaaaaaaa"));
        assert!(!value_looks_like_token("short1"));
    }
}
