//! Request identity keys for partition entries.

use sha2::{Digest, Sha256};

use crate::Request;

/// Compute the cache key for a method and canonical URL.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cache key of an intercepted request.
pub fn request_key(request: &Request) -> String {
    compute_cache_key(request.method(), request.url().as_str())
}
