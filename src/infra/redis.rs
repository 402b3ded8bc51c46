//! Redis cache backend.
//!
//! The connection manager is created on first use, so the API starts even
//! while Redis is down; afterwards it reconnects on its own. Pattern deletes
//! walk the keyspace with `SCAN` rather than `KEYS` to avoid blocking the
//! server.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::info;

use crate::cache::{CacheBackend, CacheError, CacheKey, InvalidationPattern};

use super::error::InfraError;

const SCAN_BATCH: usize = 100;

pub struct RedisBackend {
    client: Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisBackend {
    /// Validates the URL without connecting.
    pub fn new(url: &str) -> Result<Self, InfraError> {
        let client = Client::open(url)
            .map_err(|err| InfraError::cache(format!("invalid redis url `{url}`: {err}")))?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone()).await?;
                info!(target = "infra::redis", "connected to redis");
                Ok::<_, redis::RedisError>(manager)
            })
            .await
            .map_err(CacheError::unavailable)?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key.as_str())
            .await
            .map_err(CacheError::unavailable)
    }

    async fn set(&self, key: &CacheKey, payload: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // SET EX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key.as_str(), payload, seconds)
            .await
            .map_err(CacheError::unavailable)
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn
            .del(key.as_str())
            .await
            .map_err(CacheError::unavailable)?;
        Ok(removed > 0)
    }

    async fn delete_matching(&self, pattern: &InvalidationPattern) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let mut cursor = 0u64;
        let mut removed = 0u64;

        loop {
            let mut scan = redis::cmd("SCAN");
            scan.cursor_arg(cursor)
                .arg("MATCH")
                .arg(pattern.as_str())
                .arg("COUNT")
                .arg(SCAN_BATCH);
            let (next, keys): (u64, Vec<String>) = scan
                .query_async(&mut conn)
                .await
                .map_err(CacheError::unavailable)?;

            if !keys.is_empty() {
                let count: u64 = conn
                    .del(keys.as_slice())
                    .await
                    .map_err(CacheError::unavailable)?;
                removed += count;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut conn)
            .await
            .map_err(CacheError::unavailable)
    }
}
