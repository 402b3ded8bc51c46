//! Storage contract every cache backend fulfils.
//!
//! Backends report failures honestly; the fail-open policy lives one level up
//! in [`CacheClient`](super::CacheClient).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::keys::{CacheKey, InvalidationPattern};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to encode cache payload: {0}")]
    Encode(String),
    #[error("failed to decode cache payload: {0}")]
    Decode(String),
}

impl CacheError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs and the health report.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    /// Overwrites any existing value.
    async fn set(&self, key: &CacheKey, payload: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Returns how many keys were removed.
    async fn delete_matching(&self, pattern: &InvalidationPattern) -> Result<u64, CacheError>;

    async fn flush_all(&self) -> Result<(), CacheError>;
}

/// Backend used when caching is switched off: every read misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBackend;

#[async_trait]
impl CacheBackend for DisabledBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn get(&self, _key: &CacheKey) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: &CacheKey,
        _payload: String,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &CacheKey) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn delete_matching(&self, _pattern: &InvalidationPattern) -> Result<u64, CacheError> {
        Ok(0)
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
