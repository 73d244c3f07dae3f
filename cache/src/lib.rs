mod backend;
mod error;
mod key;
mod memory;
mod remote;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

pub use backend::CacheBackend;
pub use error::CacheError;
pub use key::{CACHE_BYPASS_SENTINEL_USER, CacheKey, KeyArg, build_key};
pub use memory::MemoryBackend;
pub use remote::{RemoteBackend, RemoteKv};

/// TTL for UCS read operations (list_flights, resolve_flight_ref, fetch_igc).
pub const UCS_READ_TTL: Duration = Duration::from_secs(72 * 3600);
/// TTL for the global health probe.
pub const HEALTH_TTL: Duration = Duration::from_secs(10 * 60);

/// Time-bounded cache-aside wrapper over pure UCS query methods (§4.5).
pub struct ResultCache<B: CacheBackend> {
    backend: B,
}

impl<B: CacheBackend> ResultCache<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Runs `f` under cache-aside semantics: on hit, returns the cached
    /// value without calling `f`; on miss, calls `f`, caches its `Ok`
    /// result for `ttl`, and returns it. Errors from `f` are never cached.
    /// The sentinel-user bypass (§4.5) skips the backend entirely.
    #[instrument(skip(self, f), fields(op = op_name))]
    pub async fn get_or_insert_with<T, E, F, Fut>(
        &self,
        op_name: &str,
        ttl: Duration,
        positional: &[KeyArg],
        keyword: &[(String, KeyArg)],
        f: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = build_key(op_name, positional, keyword).map_err(E::from)?;

        let key = match key {
            CacheKey::Bypass(k) => {
                debug!(key = %k, "cache bypass (sentinel user)");
                return f().await;
            }
            CacheKey::Key(k) => k,
        };

        if let Some(raw) = self.backend.get_raw(&key).await.map_err(E::from)? {
            if let Ok(value) = serde_json::from_slice::<T>(&raw) {
                debug!(key = %key, "cache hit");
                return Ok(value);
            }
            debug!(key = %key, "cache entry failed to deserialize; treating as miss");
        }

        let value = f().await?;

        if let Ok(raw) = serde_json::to_vec(&value) {
            let _ = self.backend.set_raw(&key, raw, ttl).await;
        }

        Ok(value)
    }
}
