use std::io::{Read, Write};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::CacheBackend;
use crate::error::CacheError;

/// A remote key-value store, e.g. Redis. Wiring a real client is out of
/// scope here; this trait is the seam production deployments plug into.
#[async_trait]
pub trait RemoteKv: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

/// Wraps a `RemoteKv` with LZ4 compression, matching the production
/// `Lz4PickleSerializer` the upstream implementation uses before handing
/// values to Redis.
pub struct RemoteBackend<K: RemoteKv> {
    kv: K,
}

impl<K: RemoteKv> RemoteBackend<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>, CacheError> {
    let mut encoder = lz4::EncoderBuilder::new()
        .build(Vec::new())
        .map_err(|e| CacheError::Backend(e.to_string()))?;
    encoder
        .write_all(data)
        .map_err(|e| CacheError::Backend(e.to_string()))?;
    let (out, result) = encoder.finish();
    result.map_err(|e| CacheError::Backend(e.to_string()))?;
    Ok(out)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, CacheError> {
    let mut decoder =
        lz4::Decoder::new(data).map_err(|e| CacheError::Backend(e.to_string()))?;
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CacheError::Backend(e.to_string()))?;
    Ok(out)
}

#[async_trait]
impl<K: RemoteKv> CacheBackend for RemoteBackend<K> {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self.kv.get(key).await? {
            Some(compressed) => Ok(Some(decompress(&compressed)?)),
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let compressed = compress(&value)?;
        self.kv.set(key, compressed, ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeRemote {
        map: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl RemoteKv for FakeRemote {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Ok(self.map.lock().get(key).cloned())
        }

        async fn set(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
            self.map.lock().insert(key.to_string(), value);
            Ok(())
        }
    }

    #[tokio::test]
    async fn roundtrips_through_compression() {
        let backend = RemoteBackend::new(FakeRemote::default());
        let payload = b"{\"hello\":\"world\"}".repeat(50);

        backend
            .set_raw("k", payload.clone(), Duration::from_secs(60))
            .await
            .unwrap();

        // the underlying store really did compress it
        let raw = backend.kv.map.lock().get("k").cloned().unwrap();
        assert!(raw.len() < payload.len());

        let out = backend.get_raw("k").await.unwrap().unwrap();
        assert_eq!(out, payload);
    }
}
