//! # Background Loops
//!
//! The configuration refresh loop and the pipeline sync loop. Both catch
//! and log per-iteration failures, and honor the shutdown token between
//! iterations so termination is prompt.

use crate::constants;
use crate::pipelines::{
    PipelineConfigLoader, PipelineDownloadConfig, PipelineDownloader, PipelineUpdater,
    PipelineUploader,
};
use crate::services::PipelineService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Periodically refresh the pipeline source configuration snapshot.
pub async fn run_config_refresh_loop(
    config_loader: Arc<PipelineConfigLoader>,
    shutdown: CancellationToken,
) {
    info!("Starting pipeline configuration refresh loop");
    loop {
        if let Err(err) = config_loader.refresh().await {
            error!("Failed to refresh pipeline configuration: {err}");
        }
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = sleep(Duration::from_secs(constants::CONFIG_UPDATE_INTERVAL_SECS)) => {}
        }
    }
    info!("Pipeline configuration refresh loop stopped");
}

/// Continuously sync configured pipeline sources to the pipeline service.
///
/// Waits for the config loader to produce a first snapshot, then cycles
/// with the downloader held for the lifetime of the loop; its HTTP session
/// is released when the loop stops.
pub async fn run_pipeline_sync_loop(
    config_loader: Arc<PipelineConfigLoader>,
    pipeline_service: Arc<dyn PipelineService>,
    download_config: PipelineDownloadConfig,
    shutdown: CancellationToken,
) {
    while !config_loader.has_loaded() {
        tokio::select! {
            () = shutdown.cancelled() => return,
            () = sleep(Duration::from_secs(constants::CONFIG_WAIT_POLL_SECS)) => {}
        }
    }

    let downloader = match PipelineDownloader::new(download_config) {
        Ok(downloader) => downloader,
        Err(err) => {
            error!("Failed to initialize pipeline downloader: {err}");
            return;
        }
    };
    let mut updater = PipelineUpdater::new(PipelineUploader::new(pipeline_service));

    info!("Starting pipeline sync loop");
    loop {
        let snapshot = config_loader.snapshot().await;
        updater.run(&snapshot, &downloader).await;
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = sleep(Duration::from_secs(constants::SOURCE_UPDATE_INTERVAL_SECS)) => {}
        }
    }
    info!("Pipeline sync loop stopped");
}
