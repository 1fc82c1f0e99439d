//! Request/response integrity.
//!
//! Inbound requests carry an optional client checksum: the original 32-bit
//! string hash over a canonical (key-sorted) serialization of the payload,
//! rendered base36. Deployed clients compute exactly this, so the format is
//! load-bearing; it is a best-effort tamper check, not proof of origin.
//! Responses are signed with SHA-256 over the canonical verdict plus a
//! server-side key, truncated to a short hex digest for log scanning. The
//! asymmetry is deliberate and documented in DESIGN.md.

use serde_json::{Value, json};
use sha2::{Digest, Sha256};

/// Key-sorted JSON text. `serde_json` objects are BTreeMap-backed, so a
/// round trip through `Value` yields sorted keys at every nesting level.
pub fn canonical_json(value: &Value) -> String {
    value.to_string()
}

/// Checksum the client is expected to have computed over its own payload.
pub fn compute_checksum(plan_type: &str, usage: &Value) -> String {
    let payload = json!({ "planType": plan_type, "usage": usage });
    simple_hash(&canonical_json(&payload))
}

/// Recompute and compare. Never fails; a mismatch is a boolean the caller
/// turns into a tamper rejection.
pub fn verify_checksum(plan_type: &str, usage: &Value, client_checksum: &str) -> bool {
    compute_checksum(plan_type, usage) == client_checksum
}

/// Short server signature over the validation verdict.
pub fn sign_response(verdict: &Value, signing_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(verdict).as_bytes());
    hasher.update(signing_key.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

// 32-bit rolling hash over UTF-16 code units (hash = hash * 31 + unit,
// wrapping), base36-encoded with a leading '-' when negative. Matches what
// deployed clients compute.
fn simple_hash(input: &str) -> String {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    to_base36(hash)
}

fn to_base36(value: i32) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let negative = value < 0;
    let mut n = (value as i64).unsigned_abs();
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(char::from_digit((n % 36) as u32, 36).unwrap_or('0'));
        n /= 36;
    }
    if negative {
        digits.push('-');
    }
    digits.into_iter().rev().collect()
}
