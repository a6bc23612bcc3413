// src/ids.rs
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

pub const DEFAULT_ID_BYTES: usize = 12;

/// Generate a fresh record id from the OS RNG, e.g. `rpt_Xq2kLw...`.
/// This is what the services should call.
pub fn generate_id_default(prefix: &str) -> String {
    let mut rng = OsRng;
    generate_id(&mut rng, prefix, DEFAULT_ID_BYTES)
}

/// Prefix + URL-safe base64 (no padding) of `nbytes` random bytes.
/// 12 bytes -> 16 chars, safe to embed in a URL path segment.
pub fn generate_id<R: RngCore>(rng: &mut R, prefix: &str, nbytes: usize) -> String {
    let mut buf = vec![0u8; nbytes];
    rng.fill_bytes(&mut buf);
    format!(
        "{prefix}_{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&buf)
    )
}
