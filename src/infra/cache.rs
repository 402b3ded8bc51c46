use std::sync::Arc;

use tracing::info;

use crate::cache::{
    CacheBackend, CacheBackendKind, CacheClient, CacheConfig, DisabledBackend, MemoryBackend,
};

use super::error::InfraError;
use super::redis::RedisBackend;

/// Build the configured backend. Only a malformed Redis URL is fatal; an
/// unreachable server is handled by the fail-open client at request time.
pub fn build_backend(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>, InfraError> {
    let backend: Arc<dyn CacheBackend> = match config.backend {
        CacheBackendKind::Redis => Arc::new(RedisBackend::new(&config.redis_url)?),
        CacheBackendKind::Memory => Arc::new(MemoryBackend::new(config.memory_capacity_non_zero())),
        CacheBackendKind::Disabled => Arc::new(DisabledBackend),
    };
    info!(
        target = "infra::cache",
        backend = backend.name(),
        single_ttl_secs = config.single_ttl.as_secs(),
        list_ttl_secs = config.list_ttl.as_secs(),
        "cache backend configured"
    );
    Ok(backend)
}

pub fn build_client(config: &CacheConfig) -> Result<CacheClient, InfraError> {
    Ok(CacheClient::new(build_backend(config)?, config))
}

/// Client for a backend another process can reach. An in-process cache
/// belongs to the running server and can only be flushed through its
/// `DELETE /admin/cache` endpoint.
pub fn build_shared_client(config: &CacheConfig) -> Result<CacheClient, InfraError> {
    match config.backend {
        CacheBackendKind::Redis => build_client(config),
        CacheBackendKind::Memory | CacheBackendKind::Disabled => {
            Err(InfraError::configuration(format!(
                "cache backend `{}` is local to the server process; only a shared (redis) \
                 backend can be flushed from the CLI, use `DELETE /admin/cache` instead",
                config.backend.as_str()
            )))
        }
    }
}
