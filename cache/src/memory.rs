use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::backend::CacheBackend;
use crate::error::CacheError;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process TTL map, used for `LOCAL=1` / tests. Unbounded in entry count
/// (bounded only by TTL expiry) since the workload here is a handful of
/// hot UCS reads, not a general-purpose cache.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(e) if e.expires_at > Instant::now() => {
                debug!(key, "cache hit");
                Ok(Some(e.value.clone()))
            }
            Some(_) => {
                entries.remove(key);
                debug!(key, "cache entry expired");
                Ok(None)
            }
            None => {
                debug!(key, "cache miss");
                Ok(None)
            }
        }
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn miss_then_hit_then_expiry() {
        let backend = MemoryBackend::new();
        assert!(backend.get_raw("k").await.unwrap().is_none());

        backend
            .set_raw("k", b"v".to_vec(), Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(backend.get_raw("k").await.unwrap(), Some(b"v".to_vec()));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(backend.get_raw("k").await.unwrap().is_none());
    }
}
