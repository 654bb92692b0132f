//! # Pipeline Synchronization
//!
//! Continuous sync of remote pipeline packages into the pipeline service:
//! source configuration loading, conditional downloads, and best-effort
//! uploads.

pub mod config;
pub mod downloader;
pub mod updater;
pub mod uploader;

pub use config::{PipelineConfigLoader, PipelineConfigMap, PipelineSourceAuth, PipelineSourceConfig};
pub use downloader::{PipelineDownloadConfig, PipelineDownloader, PipelineFetch, PipelineFileResponse};
pub use updater::PipelineUpdater;
pub use uploader::PipelineUploader;
