//! Fail-open front for a [`CacheBackend`].
//!
//! Reads collapse every backend failure into a miss and writes into a no-op,
//! each logged at `warn` and counted. Only the administrative operations hand
//! the raw result back so operators can tell success from failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::types::EntityKind;

use super::backend::{CacheBackend, CacheError, DisabledBackend};
use super::config::CacheConfig;
use super::coordinator::InvalidationPlan;
use super::keys::{CacheKey, InvalidationPattern, list_pattern, singles_pattern};

pub(crate) const METRIC_HIT: &str = "userdir_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "userdir_cache_miss_total";
pub(crate) const METRIC_ERROR: &str = "userdir_cache_error_total";
pub(crate) const METRIC_INVALIDATED: &str = "userdir_cache_invalidated_keys_total";

#[derive(Clone)]
pub struct CacheClient {
    backend: Arc<dyn CacheBackend>,
    single_ttl: Duration,
    list_ttl: Duration,
    timeout: Duration,
}

impl CacheClient {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            single_ttl: config.single_ttl,
            list_ttl: config.list_ttl,
            timeout: config.operation_timeout,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledBackend), &CacheConfig::default())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn single_ttl(&self) -> Duration {
        self.single_ttl
    }

    pub fn list_ttl(&self) -> Duration {
        self.list_ttl
    }

    /// Cached value for `key`, or `None` on a miss, a backend failure or an
    /// undecodable payload.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let payload = match self.guarded(self.backend.get(key)).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                record_miss(key);
                return None;
            }
            Err(err) => {
                self.swallow("get", key.as_str(), &err);
                record_miss(key);
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                counter!(METRIC_HIT, "kind" => key.kind().as_str(), "scope" => key.scope().as_str())
                    .increment(1);
                debug!(target = "userdir::cache::client", key = %key, "cache hit");
                Some(value)
            }
            Err(err) => {
                self.swallow("decode", key.as_str(), &CacheError::Decode(err.to_string()));
                record_miss(key);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                self.swallow("encode", key.as_str(), &CacheError::Encode(err.to_string()));
                return;
            }
        };
        if let Err(err) = self.guarded(self.backend.set(key, payload, ttl)).await {
            self.swallow("set", key.as_str(), &err);
        }
    }

    /// Best-effort delete; `true` only when an entry was actually removed.
    pub async fn delete(&self, key: &CacheKey) -> bool {
        match self.guarded(self.backend.delete(key)).await {
            Ok(removed) => {
                record_invalidated(key.kind(), key.scope().as_str(), u64::from(removed));
                removed
            }
            Err(err) => {
                self.swallow("delete", key.as_str(), &err);
                false
            }
        }
    }

    /// Best-effort pattern delete; returns 0 when the backend failed.
    pub async fn delete_matching(&self, pattern: &InvalidationPattern) -> u64 {
        match self.try_delete_matching(pattern).await {
            Ok(removed) => removed,
            Err(err) => {
                self.swallow("delete_matching", pattern.as_str(), &err);
                0
            }
        }
    }

    /// Read-through: serve `key` from the cache, otherwise run `load` and
    /// cache a present result. Absent results are never cached.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        load: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(Some(hit));
        }
        let loaded = load().await?;
        if let Some(value) = loaded.as_ref() {
            self.set(key, value, ttl).await;
        }
        Ok(loaded)
    }

    /// Read-through for loaders that always produce a value, such as list pages.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let fetched = fetch().await?;
        self.set(key, &fetched, ttl).await;
        Ok(fetched)
    }

    /// Drop everything a plan names. Failures are logged per step and the
    /// remaining steps still run.
    pub async fn apply(&self, plan: &InvalidationPlan) -> u64 {
        let mut removed = 0;
        for key in plan.keys() {
            removed += u64::from(self.delete(key).await);
        }
        for pattern in plan.patterns() {
            removed += self.delete_matching(pattern).await;
        }
        debug!(
            target = "userdir::cache::client",
            keys = plan.keys().len(),
            patterns = plan.patterns().len(),
            "applied invalidation plan"
        );
        removed
    }

    /// Administrative full reset.
    pub async fn flush_all(&self) -> Result<(), CacheError> {
        let result = self.guarded(self.backend.flush_all()).await;
        if let Err(err) = &result {
            record_error("flush_all");
            warn!(
                target = "userdir::cache::client",
                backend = self.backend.name(),
                error = %err,
                "cache flush failed"
            );
        }
        result
    }

    /// Administrative drop of every entry, single and list, for one kind.
    pub async fn invalidate_kind(&self, kind: EntityKind) -> Result<u64, CacheError> {
        let mut removed = 0;
        for pattern in [singles_pattern(kind), list_pattern(kind)] {
            match self.try_delete_matching(&pattern).await {
                Ok(count) => removed += count,
                Err(err) => {
                    record_error("invalidate_kind");
                    warn!(
                        target = "userdir::cache::client",
                        kind = kind.as_str(),
                        pattern = %pattern,
                        error = %err,
                        "cache invalidation failed"
                    );
                    return Err(err);
                }
            }
        }
        Ok(removed)
    }

    async fn try_delete_matching(&self, pattern: &InvalidationPattern) -> Result<u64, CacheError> {
        let removed = self
            .guarded(self.backend.delete_matching(pattern))
            .await?;
        record_invalidated(pattern.kind(), pattern.scope().as_str(), removed);
        Ok(removed)
    }

    async fn guarded<T>(
        &self,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }

    fn swallow(&self, op: &'static str, subject: &str, err: &CacheError) {
        record_error(op);
        warn!(
            target = "userdir::cache::client",
            op,
            subject,
            backend = self.backend.name(),
            error = %err,
            "cache operation failed; continuing without cache"
        );
    }
}

fn record_miss(key: &CacheKey) {
    counter!(METRIC_MISS, "kind" => key.kind().as_str(), "scope" => key.scope().as_str())
        .increment(1);
}

fn record_error(op: &'static str) {
    counter!(METRIC_ERROR, "op" => op).increment(1);
}

fn record_invalidated(kind: EntityKind, scope: &'static str, count: u64) {
    if count > 0 {
        counter!(METRIC_INVALIDATED, "kind" => kind.as_str(), "scope" => scope).increment(count);
    }
}
