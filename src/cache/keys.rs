//! Cache key derivation.
//!
//! Keys are `{prefix}[:user=<id>]:{digest}` where the digest is a 12-hex-char
//! hash of the canonicalized request parameters. Canonicalization sorts keys,
//! so two logically equal parameter sets always derive the same key. The
//! caller identity, when present, is embedded as a structured `user=` tag so
//! that per-user invalidation patterns can never collide with digest text.

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Digest width in hex characters (48 bits of the 64-bit hash).
const DIGEST_HEX_WIDTH: usize = 12;

/// Canonicalized parameter mapping: ordered by key, order-independent by
/// construction.
pub type CacheParams = BTreeMap<String, String>;

/// Derive a cache key from a semantic prefix, an optional caller identity,
/// and a parameter mapping.
pub fn build_key(prefix: &str, identity: Option<&str>, params: &CacheParams) -> String {
    let digest = short_digest(&canonicalize(params));
    match identity {
        Some(id) => format!("{prefix}:user={id}:{digest}"),
        None => format!("{prefix}:{digest}"),
    }
}

/// Serialize params to a compact deterministic `k=v&k=v` form. Separator
/// characters inside keys and values are percent-escaped, so a value
/// containing `&` or `=` cannot reproduce another mapping's canonical string.
fn canonicalize(params: &CacheParams) -> String {
    let mut out = String::new();
    for (index, (key, value)) in params.iter().enumerate() {
        if index > 0 {
            out.push('&');
        }
        escape_into(&mut out, key);
        out.push('=');
        escape_into(&mut out, value);
    }
    out
}

fn escape_into(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3d"),
            _ => out.push(c),
        }
    }
}

/// Fast non-cryptographic digest truncated to a fixed width.
///
/// Collisions are an accepted, bounded risk: a collision only serves a stale
/// or mismatched cached payload until TTL expiry, never corrupts state.
fn short_digest(canonical: &str) -> String {
    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    let truncated = hasher.finish() & ((1u64 << (DIGEST_HEX_WIDTH as u32 * 4)) - 1);
    format!("{truncated:0width$x}", width = DIGEST_HEX_WIDTH)
}

/// Match `input` against a glob `pattern` supporting `*` (any run) and `?`
/// (any single character), the subset of Redis `KEYS` globbing the
/// invalidation patterns use.
pub fn glob_match(pattern: &str, input: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let input: Vec<char> = input.chars().collect();

    let mut p = 0;
    let mut i = 0;
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while i < input.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == input[i]) {
            p += 1;
            i += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            mark = i;
            p += 1;
        } else if let Some(star_at) = star {
            // Backtrack: let the last `*` absorb one more character.
            p = star_at + 1;
            mark += 1;
            i = mark;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
