//! Time-based one-time passwords (RFC 6238, HMAC-SHA1, 6 digits, 30 s step).
//!
//! Secrets are stored base32-encoded, the form authenticator apps accept.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

pub const DIGITS: usize = 6;
pub const STEP_SECS: i64 = 30;
/// Adjacent steps accepted on either side of the current one.
const SKEW_STEPS: i64 = 1;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// RFC 4648 base32 without padding; spaces and `=` are ignored, case-insensitive.
pub fn decode_base32(input: &str) -> Option<Vec<u8>> {
    let mut bits: u64 = 0;
    let mut bit_count = 0u32;
    let mut out = Vec::with_capacity(input.len() * 5 / 8);

    for ch in input.bytes().filter(|c| !c.is_ascii_whitespace() && *c != b'=') {
        let upper = ch.to_ascii_uppercase();
        let value = BASE32_ALPHABET.iter().position(|c| *c == upper)? as u64;
        bits = (bits << 5) | value;
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push((bits >> bit_count) as u8);
            bits &= (1 << bit_count) - 1;
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// HOTP value for the step containing `unix_secs`.
pub fn code_at(secret: &[u8], unix_secs: i64) -> Option<String> {
    if unix_secs < 0 {
        return None;
    }
    hotp(secret, (unix_secs / STEP_SECS) as u64)
}

fn hotp(secret: &[u8], counter: u64) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret).ok()?;
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = ((hash[offset] as u32 & 0x7f) << 24)
        | ((hash[offset + 1] as u32) << 16)
        | ((hash[offset + 2] as u32) << 8)
        | (hash[offset + 3] as u32);

    let code = binary % 10u32.pow(DIGITS as u32);
    Some(format!("{:0width$}", code, width = DIGITS))
}

/// Checks `code` against the base32 `secret` at `unix_secs`, allowing one step of clock skew.
pub fn verify(secret_b32: &str, code: &str, unix_secs: i64) -> bool {
    let code = code.trim();
    if code.len() != DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Some(secret) = decode_base32(secret_b32) else {
        return false;
    };

    (-SKEW_STEPS..=SKEW_STEPS).any(|delta| {
        code_at(&secret, unix_secs + delta * STEP_SECS)
            .map(|expected| bool::from(expected.as_bytes().ct_eq(code.as_bytes())))
            .unwrap_or(false)
    })
}
