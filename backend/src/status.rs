use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use domain::{FlightId, StatusEntry};
use parking_lot::Mutex;

/// 5 minutes, matching the source's `status_expiry_seconds`.
pub const STATUS_TTL: Duration = Duration::from_secs(5 * 60);

/// Short-lived per-flight upload status, keyed independently for `status`
/// and `result` so either can expire without clobbering the other. The
/// production backend is Redis; this crate only implements the in-memory
/// variant used by tests and local runs.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn set(&self, flight_id: FlightId, status: Option<String>, result: Option<String>);
    async fn get(&self, flight_id: FlightId) -> StatusEntry;
}

struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemoryStatusStore {
    status: Mutex<HashMap<FlightId, Expiring<String>>>,
    result: Mutex<HashMap<FlightId, Expiring<String>>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T: Clone>(map: &Mutex<HashMap<FlightId, Expiring<T>>>, flight_id: FlightId) -> Option<T> {
        let mut guard = map.lock();
        match guard.get(&flight_id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                guard.remove(&flight_id);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn set(&self, flight_id: FlightId, status: Option<String>, result: Option<String>) {
        let expires_at = Instant::now() + STATUS_TTL;
        if let Some(status) = status {
            self.status.lock().insert(flight_id, Expiring { value: status, expires_at });
        }
        if let Some(result) = result {
            self.result.lock().insert(flight_id, Expiring { value: result, expires_at });
        }
    }

    async fn get(&self, flight_id: FlightId) -> StatusEntry {
        StatusEntry {
            status: Self::read(&self.status, flight_id),
            result: Self::read(&self.result, flight_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_entry_reads_as_all_none() {
        let store = InMemoryStatusStore::new();
        let entry = store.get(1).await;
        assert_eq!(entry, StatusEntry { status: None, result: None });
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = InMemoryStatusStore::new();
        store.set(1, Some("uploading".to_string()), None).await;
        let entry = store.get(1).await;
        assert_eq!(entry.status.as_deref(), Some("uploading"));
        assert_eq!(entry.result, None);
    }

    #[tokio::test]
    async fn status_and_result_expire_independently() {
        let store = InMemoryStatusStore::new();
        store.status.lock().insert(
            1,
            Expiring { value: "stale".to_string(), expires_at: Instant::now() - Duration::from_secs(1) },
        );
        store.result.lock().insert(
            1,
            Expiring { value: "fresh".to_string(), expires_at: Instant::now() + STATUS_TTL },
        );
        let entry = store.get(1).await;
        assert_eq!(entry.status, None);
        assert_eq!(entry.result.as_deref(), Some("fresh"));
    }
}
