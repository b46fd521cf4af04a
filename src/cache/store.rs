//! Cache store contract.
//!
//! The listing cache is an external key/value store holding opaque string
//! payloads. The core only relies on per-key atomic `get`/`set`/`del`; expiry
//! and eviction policy belong to the store, not to this crate.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a cache store backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Key/value store holding serialized payloads under string keys.
///
/// Implementations must provide at least per-key atomicity for each call; no
/// cross-key transactions are required. A deleted or absent key is never an
/// error: the cached listing is a derived artifact and its absence only
/// forces a recompute.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, payload: String) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;
}
