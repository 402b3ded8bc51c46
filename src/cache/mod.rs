//! Userdir cache layer.
//!
//! Read-through caching with write-invalidate for users and categories:
//!
//! - **Key scheme** (`keys`): deterministic string keys and glob patterns.
//! - **Backends**: Redis (in `infra::redis`), an in-process LRU, or disabled.
//! - **Client**: fail-open wrapper adding timeouts, logging and metrics.
//! - **Coordinator**: which keys and patterns each write makes stale.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "redis"            # redis | memory | disabled
//! redis_url = "redis://127.0.0.1:6379"
//! single_ttl_seconds = 600
//! list_ttl_seconds = 300
//! ```

mod backend;
mod client;
mod config;
mod coordinator;
mod keys;
mod lock;
mod memory;

pub use backend::{CacheBackend, CacheError, DisabledBackend};
pub use client::CacheClient;
pub use config::{CacheBackendKind, CacheConfig, DEFAULT_REDIS_URL};
pub use coordinator::{InvalidationPlan, WriteOp};
pub use keys::{
    CacheKey, InvalidationPattern, KeyScope, category_members_key, list_key, list_pattern,
    single_key, singles_pattern,
};
pub use memory::MemoryBackend;
