//! Ethereum account address validation
//!
//! Accepts 40 hex digits with an optional `0x`/`0X` prefix. Addresses written
//! in a single case are accepted as-is; mixed-case addresses must carry a
//! valid EIP-55 checksum.

use once_cell::sync::Lazy;
use regex::Regex;
use tiny_keccak::{Hasher, Keccak};

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[xX])?[0-9a-fA-F]{40}$").expect("static regex"));

/// Strip the optional hex prefix
fn hex_body(address: &str) -> &str {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address)
}

/// Keccak-256 of `data`
fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// Check whether `address` is a syntactically valid account address
pub fn is_valid_address(address: &str) -> bool {
    if !ADDRESS_RE.is_match(address) {
        return false;
    }

    let body = hex_body(address);
    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    checksum_encode(body) == body
}

/// EIP-55 mixed-case encoding of a 40-digit hex body (no prefix)
pub fn checksum_encode(body: &str) -> String {
    let lower = body.to_ascii_lowercase();
    let hash = hex::encode(keccak256(lower.as_bytes()));

    lower
        .chars()
        .zip(hash.chars())
        .map(|(c, h)| {
            // nibble >= 8 means uppercase
            if c.is_ascii_alphabetic() && h.to_digit(16).unwrap_or(0) >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

/// Canonical `0x`-prefixed checksummed form of a valid address
pub fn to_checksum_address(address: &str) -> Option<String> {
    if !is_valid_address(address) {
        return None;
    }
    Some(format!("0x{}", checksum_encode(hex_body(address))))
}
