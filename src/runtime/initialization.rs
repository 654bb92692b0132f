//! # Initialization
//!
//! Operator startup: rustls setup, tracing subscriber, Kubernetes client,
//! namespace filter, deployment backend selection, and the pipeline
//! service/config wiring shared by the background loops.

use crate::controller::NamespaceFilter;
use crate::deploy::{backend_from_env, DeploymentBackend};
use crate::pipelines::{PipelineConfigLoader, PipelineDownloadConfig};
use crate::services::{KubeflowPipelinesService, PipelineService};
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::info;

/// Everything the supervisor threads through the controllers and loops.
pub struct Runtime {
    pub client: Client,
    pub namespaces: NamespaceFilter,
    pub backend: Arc<dyn DeploymentBackend>,
    pub pipeline_service: Arc<dyn PipelineService>,
    pub config_loader: Arc<PipelineConfigLoader>,
    pub download_config: PipelineDownloadConfig,
}

/// Initialize the operator runtime.
pub async fn initialize() -> Result<Runtime> {
    // Configure rustls crypto provider FIRST, before any other operations.
    // Required for rustls 0.23+ when no default provider is set via features.
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ai_operator=info".into()),
        )
        .init();

    info!("Starting AI operator");

    let client = Client::try_default().await?;

    let namespaces = NamespaceFilter::from_env();
    if namespaces.is_empty() {
        info!("Not filtering on namespaces.");
    } else {
        info!("Filtering on namespaces: {:?}.", namespaces.names());
    }

    let backend = backend_from_env(client.clone());
    let pipeline_service: Arc<dyn PipelineService> = Arc::new(KubeflowPipelinesService::from_env()?);
    let config_loader = Arc::new(PipelineConfigLoader::new(client.clone()));
    let download_config = PipelineDownloadConfig::from_env();

    Ok(Runtime {
        client,
        namespaces,
        backend,
        pipeline_service,
        config_loader,
        download_config,
    })
}
