//! In-memory fingerprint cache for compile and verify results.
//!
//! Two caches are kept by the engine:
//! - **Compile cache**: dialect source hash → `CompilationResult`
//! - **Verify cache**: host source hash → verifier diagnostics
//!
//! Each cache hashes its keys under its own namespace, so a dialect text and
//! a host text that happen to be equal never share an entry.
//!
//! Entries are append-only: once written, never modified. They leave the
//! cache only when their TTL runs out. The TTL bounds memory, nothing more:
//! a miss is handled exactly like a cold compile.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::hash::ContentHash;

pub const COMPILE_NAMESPACE: &str = "compile";
pub const VERIFY_NAMESPACE: &str = "verify";

struct CacheEntry<V> {
    value: Arc<V>,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// A TTL cache keyed by the content hash of a source string.
pub struct FingerprintCache<V> {
    namespace: &'static str,
    ttl: Duration,
    entries: Mutex<HashMap<ContentHash, CacheEntry<V>>>,
}

impl<V> FingerprintCache<V> {
    pub fn new(namespace: &'static str, ttl: Duration) -> Self {
        Self {
            namespace,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(&self, text: &str) -> ContentHash {
        ContentHash::of(self.namespace, text)
    }

    /// Look up the result cached for `text`, if it has not expired.
    pub fn get(&self, text: &str) -> Option<Arc<V>> {
        let key = self.key(text);
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(&key) {
            Some(entry) if entry.is_live(now) => {
                trace!(namespace = self.namespace, %key, "cache hit");
                Some(Arc::clone(&entry.value))
            }
            Some(_) => {
                entries.remove(&key);
                trace!(namespace = self.namespace, %key, "cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Store `value` for `text` and return the cached value.
    ///
    /// A live entry for the same text is never overwritten; the existing
    /// value is returned instead.
    pub fn put(&self, text: &str, value: V) -> Arc<V> {
        let key = self.key(text);
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| entry.is_live(now));
        if let Some(existing) = entries.get(&key) {
            return Arc::clone(&existing.value);
        }
        let value = Arc::new(value);
        entries.insert(
            key,
            CacheEntry {
                value: Arc::clone(&value),
                expires_at: now + self.ttl,
            },
        );
        value
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
