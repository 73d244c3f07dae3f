use std::sync::Arc;

use async_trait::async_trait;
use domain::Flight;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum DfsError {
    #[error("upload rejected: {0}")]
    Rejected(String),
}

/// The DFS wire protocol itself is a named collaborator out of scope here;
/// this trait is the seam `GatedDfsUploader` gates with a concurrency limit.
#[async_trait]
pub trait DfsUploader: Send + Sync {
    async fn upload(&self, flight: &Flight) -> Result<(), DfsError>;
}

/// Wraps an inner `DfsUploader` with a process-wide semaphore so at most
/// `capacity` uploads run concurrently, independent of DRR fairness (the
/// scheduler bounds UCS fetch concurrency; this bounds DFS push concurrency).
pub struct GatedDfsUploader<U: DfsUploader> {
    inner: U,
    semaphore: Arc<Semaphore>,
}

impl<U: DfsUploader> GatedDfsUploader<U> {
    pub fn new(inner: U, capacity: usize) -> Self {
        Self { inner, semaphore: Arc::new(Semaphore::new(capacity.max(1))) }
    }
}

#[async_trait]
impl<U: DfsUploader> DfsUploader for GatedDfsUploader<U> {
    #[instrument(skip(self, flight), fields(flight_id = flight.id))]
    async fn upload(&self, flight: &Flight) -> Result<(), DfsError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");
        self.inner.upload(flight).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingUploader {
        peak: Arc<AtomicUsize>,
        current: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DfsUploader for CountingUploader {
        async fn upload(&self, _flight: &Flight) -> Result<(), DfsError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sample_flight(id: u64) -> Flight {
        Flight {
            id,
            airplane: "LS4".to_string(),
            date_of_flight_ms: 0,
            distance_in_km: 100.0,
            speed_in_km_h: 90.0,
            copilot: None,
            airplane_matched: None,
            date: None,
            co_pilot_name: None,
            aircraft: None,
            registration: None,
            competition_id: None,
            pilot_comment: None,
        }
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_capacity() {
        let peak = Arc::new(AtomicUsize::new(0));
        let current = Arc::new(AtomicUsize::new(0));
        let uploader = Arc::new(GatedDfsUploader::new(
            CountingUploader { peak: peak.clone(), current: current.clone() },
            2,
        ));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let uploader = uploader.clone();
                tokio::spawn(async move { uploader.upload(&sample_flight(i)).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
