use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

/// Pluggable storage for `ResultCache`. Implementations store and retrieve
/// already-serialized bytes; `ResultCache` owns (de)serialization and TTL
/// bookkeeping is left to the backend since a remote store typically has
/// native TTL support.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}
