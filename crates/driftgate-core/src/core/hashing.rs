// crates/driftgate-core/src/core/hashing.rs
// ============================================================================
// Module: Hashing Helpers
// Description: SHA-256 helpers used for registry hashes, config hashes, and
//              generated run identifiers.
// Purpose: Centralize the hashing conventions so decision records, evidence
//          packs, and the audit log stay mutually consistent.
// Dependencies: sha2, serde_json, rand
// ============================================================================

//! ## Overview
//! `config_hash` (§4.7, §8 Invariant 7) is the SHA-256 over a **sorted**
//! map of config file hashes, serialized as canonical JSON — not the hash of
//! any single file. This is what `verify_decision` recomputes and compares.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;

use crate::core::registry::hash_bytes;

// ============================================================================
// SECTION: Config Hash
// ============================================================================

/// Computes the SHA-256 over the sorted map of config file hashes
/// (e.g. `{"metric_registry": "...", "baseline_policy": "...", "action_policy": "..."}`).
///
/// `BTreeMap` iteration is already key-sorted, so the canonical JSON produced
/// here is deterministic across processes for an identical input map.
#[must_use]
pub fn config_hash(hashes: &BTreeMap<String, String>) -> String {
    let canonical = serde_json::to_vec(hashes).unwrap_or_default();
    hash_bytes(&canonical)
}

// ============================================================================
// SECTION: Random Identifiers
// ============================================================================

/// Generates a random 128-bit identifier, hex-encoded, for use as a `run_id`
/// when the caller did not supply one (§3 RunMeta).
#[must_use]
pub fn random_run_id() -> String {
    let mut bytes = [0_u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex_prefix(&digest, 32)
}

fn hex_prefix(bytes: &[u8], hex_chars: usize) -> String {
    let mut out = String::with_capacity(hex_chars);
    for byte in bytes {
        if out.len() >= hex_chars {
            break;
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out.truncate(hex_chars);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_hash_is_order_independent_of_insertion() {
        let mut a = BTreeMap::new();
        a.insert("registry".to_string(), "h1".to_string());
        a.insert("policy".to_string(), "h2".to_string());

        let mut b = BTreeMap::new();
        b.insert("policy".to_string(), "h2".to_string());
        b.insert("registry".to_string(), "h1".to_string());

        assert_eq!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn random_run_id_has_expected_length() {
        let id = random_run_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
