//! # Deployment Backends
//!
//! Two interchangeable implementations of the deployment contract: the
//! GitOps backend hands the agent chart to Argo CD as an `Application`
//! resource, while the direct backend renders the chart locally and applies
//! the manifests itself. Selection happens once at startup from `PROVIDER`.

use crate::constants;
use crate::error::Result;
use crate::model::AgentData;
use async_trait::async_trait;
use kube::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub mod direct;
pub mod gitops;
pub mod helm;

pub use direct::DirectBackend;
pub use gitops::GitOpsBackend;

/// Contract for deploying an agent's backing workload.
///
/// Tool-name normalization and knowledge-base enrichment are already baked
/// into [`AgentData`]; backends must not re-apply them.
#[async_trait]
pub trait DeploymentBackend: Send + Sync {
    /// Create the backing workload; an existing workload is updated instead.
    async fn create(&self, agent_data: &AgentData) -> Result<String>;

    /// Bring the backing workload in line with `agent_data`.
    async fn update(&self, agent_data: &AgentData) -> Result<String>;

    /// Remove the backing workload; a missing workload is a no-op.
    async fn delete(&self, agent_data: &AgentData) -> Result<()>;

    /// Backend-specific status of the workload, absent when not deployed.
    async fn status(&self, agent_data: &AgentData) -> Result<Option<Value>>;
}

/// Select the deployment backend from the `PROVIDER` environment variable.
pub fn backend_from_env(client: Client) -> Arc<dyn DeploymentBackend> {
    let provider =
        std::env::var("PROVIDER").unwrap_or_else(|_| constants::DEFAULT_PROVIDER.to_string());
    if provider == constants::GITOPS_PROVIDER {
        info!("Using GitOps deployment backend (provider: {provider})");
        Arc::new(GitOpsBackend::new(client))
    } else {
        info!("Using direct deployment backend (provider: {provider})");
        Arc::new(DirectBackend::new(client))
    }
}
