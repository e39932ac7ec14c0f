//! Shared TTL cache between the resolution recorder and the enrichment
//! annotator. The cache is the only integration point between the two
//! stages; neither calls the other.

mod memcached;
mod memory;

pub use memcached::MemcachedClient;
pub use memory::MemoryCache;

use std::time::Duration;

/// Longest key accepted by the backing store.
const MAX_KEY_LENGTH: usize = 250;

/// Errors surfaced by cache backends.
#[derive(Debug)]
pub enum CacheError {
    Connect(String),
    Timeout,
    Protocol(String),
    BadKey(String),
    BadValue(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Connect(msg) => write!(f, "connect error: {}", msg),
            CacheError::Timeout => write!(f, "request timed out"),
            CacheError::Protocol(msg) => write!(f, "protocol error: {}", msg),
            CacheError::BadKey(msg) => write!(f, "bad key: {}", msg),
            CacheError::BadValue(msg) => write!(f, "bad value: {}", msg),
        }
    }
}

/// Key-value store with per-entry expiry, shared between both pipeline
/// stages. `put` is last-write-wins per key; `get` returns the current
/// unexpired value. Callers treat every error as a miss on reads and a
/// skipped write on writes.
#[async_trait::async_trait]
pub trait DnsCache: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`. Overwrites any
    /// existing entry for the key.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Current value for `key` if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
}

/// Reject keys the store cannot frame: empty, oversized, or containing
/// whitespace/control characters.
fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() {
        return Err(CacheError::BadKey("empty key".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::BadKey(format!(
            "key exceeds {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if key
        .bytes()
        .any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
    {
        return Err(CacheError::BadKey(
            "key contains whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}
