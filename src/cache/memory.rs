//! In-process cache backend.
//!
//! An LRU map with a per-entry expiry instant. Expired entries are dropped
//! lazily when read or swept by a pattern delete.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;

use super::backend::{CacheBackend, CacheError};
use super::keys::{CacheKey, InvalidationPattern};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::memory";

struct Entry {
    payload: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct MemoryBackend {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryBackend {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live keys, most recently used first.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "keys")
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key.as_str()) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.payload.clone())),
            Some(_) => {}
        }
        entries.pop(key.as_str());
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, payload: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Encode(format!("ttl {ttl:?} overflows the clock")))?;
        rw_write(&self.entries, SOURCE, "set").put(
            key.as_str().to_string(),
            Entry {
                payload,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(rw_write(&self.entries, SOURCE, "delete")
            .pop(key.as_str())
            .is_some())
    }

    async fn delete_matching(&self, pattern: &InvalidationPattern) -> Result<u64, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "delete_matching");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        Ok(doomed.len() as u64)
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "flush_all").clear();
        Ok(())
    }
}
