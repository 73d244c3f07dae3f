mod config;
mod dfs;
mod error;
mod glider;
mod status;

use std::sync::Arc;

use cache::{MemoryBackend, ResultCache};
use common::init_tracing;
use config::AppConfig;
use dfs::{DfsUploader, GatedDfsUploader};
use glider::StubGliderMatcher;
use queries::UcsQueries;
use scheduler::{AdaptiveCap, DrrScheduler};
use session::{UcsSession, UcsSessionManager};
use status::InMemoryStatusStore;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(!config.local_mode);

    info!(local_mode = config.local_mode, "starting up");

    let session_manager = Arc::new(UcsSessionManager::new());
    let session = Arc::new(UcsSession::new(
        "https://www.onlinecontest.org/olc-3.0/",
        config.ucs_default_user.clone(),
        config.ucs_default_password.clone(),
        config.proxy_url.clone(),
        session_manager,
    )?);

    let cache = Arc::new(ResultCache::new(MemoryBackend::new()));
    let glider_matcher = Arc::new(StubGliderMatcher::new(vec!["LS4".to_string(), "ASW27".to_string()]));
    let queries = Arc::new(UcsQueries::new(session, cache, glider_matcher));

    let scheduler = DrrScheduler::new(AdaptiveCap::new(config.adaptive_cap_floor, config.adaptive_cap_ceiling));
    let _status_store = Arc::new(InMemoryStatusStore::new());
    let _dfs_uploader = Arc::new(GatedDfsUploader::new(NoopDfsUploader, config.dfs_upload_concurrency));

    let dispatch_loop = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run().await })
    };

    // Demonstrative enqueue: HTTP handlers are out of scope, so this bootstrap
    // just proves the scheduler/queries wiring end to end on startup.
    let handle = scheduler.enqueue_one(0, 1, async move {
        queries
            .resolve_flight_ref(0)
            .await
            .map_err(scheduler::TaskError::new)
    });
    tokio::spawn(async move {
        if let Err(e) = handle.await {
            info!(error = %e, "bootstrap probe task finished with an error (expected without real credentials)");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    dispatch_loop.abort();
    Ok(())
}

struct NoopDfsUploader;

#[async_trait::async_trait]
impl DfsUploader for NoopDfsUploader {
    async fn upload(&self, _flight: &domain::Flight) -> Result<(), dfs::DfsError> {
        Ok(())
    }
}
