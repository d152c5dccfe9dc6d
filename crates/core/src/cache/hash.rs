//! Cache key generation.

use sha2::{Digest, Sha256};

/// Compute the storage key for a response in a named cache.
///
/// The URL should already be canonical (no fragment, lowercase host).
pub fn compute_cache_key(cache_name: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cache_name.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
