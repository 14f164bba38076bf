//! Cryptographic primitives for the dual MAC chains.
//!
//! Four operations build the entire scheme:
//!
//! - `fwd_key`  — one-way key evolution, `K_i = SHA-256(K_{i-1})`, in place
//! - `mac`      — HMAC-SHA256 over concatenated chunks
//! - `htag`     — `SHA-256(τ)`, the first-step aggregate
//! - `fold`     — `SHA-256(μ_{i-1} ‖ τ_i)`, the running aggregate
//!
//! plus `ct_eq`, the constant-time comparison every verification-path tag
//! check must go through. Variable-time comparison leaks the prefix match
//! length and is considered a bug here.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use sealog_types::{Key, Tag};

type HmacSha256 = Hmac<Sha256>;

/// Evolve a chain key one step in place: `k ← SHA-256(k)`.
///
/// The previous key value is overwritten and irrecoverable afterwards;
/// this is what makes the scheme forward-secure.
pub fn fwd_key(key: &mut Key) {
    let digest = Sha256::digest(&key[..]);
    key.copy_from_slice(&digest);
}

/// HMAC-SHA256 over the concatenation of `chunks` under `key`.
pub fn mac(key: &Key, chunks: &[&[u8]]) -> Tag {
    let mut m = HmacSha256::new_from_slice(&key[..]).expect("HMAC accepts keys of any length");
    for chunk in chunks {
        m.update(chunk);
    }
    m.finalize().into_bytes().into()
}

/// First-step aggregate: `μ_1 = SHA-256(τ_1)`.
pub fn htag(tau: &Tag) -> Tag {
    Sha256::digest(&tau[..]).into()
}

/// Running aggregate: `μ_i = SHA-256(μ_{i-1} ‖ τ_i)`.
pub fn fold(prev: &Tag, tau: &Tag) -> Tag {
    let mut h = Sha256::new();
    h.update(&prev[..]);
    h.update(&tau[..]);
    h.finalize().into()
}

/// Constant-time byte-slice equality.
///
/// Returns `false` for unequal lengths. Timing depends only on the slice
/// lengths, never on content.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// True when `tag` is all zero. The zero tag marks "no aggregate yet":
/// the first fold after it uses `htag` instead of `fold`.
pub fn is_zero(tag: &Tag) -> bool {
    ct_eq(&tag[..], &[0u8; 32])
}
