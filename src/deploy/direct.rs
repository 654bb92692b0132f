//! # Direct Backend
//!
//! Renders the agent chart locally and applies the manifests with a
//! recursive `kubectl apply`. Apply is idempotent, so update and create are
//! the same operation. Deletion re-templates the chart when the rendered
//! manifests are gone (e.g. after a restart) before deleting recursively
//! with `--ignore-not-found`.

use crate::constants;
use crate::deploy::{helm, DeploymentBackend};
use crate::error::{OperatorError, Result};
use crate::k8s;
use crate::model::AgentData;
use async_trait::async_trait;
use kube::Client;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info};

pub struct DirectBackend {
    client: Client,
    chart_path: String,
    manifest_root: PathBuf,
}

impl DirectBackend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            chart_path: std::env::var("CHART_PATH")
                .unwrap_or_else(|_| constants::DEFAULT_CHART_PATH.to_string()),
            manifest_root: PathBuf::from(constants::DEFAULT_MANIFEST_ROOT),
        }
    }

    fn manifest_dir(&self, agent_name: &str) -> PathBuf {
        self.manifest_root.join(agent_name)
    }

    async fn template_chart(&self, agent_data: &AgentData) -> Result<PathBuf> {
        let values = helm::chart_values(agent_data)?;
        helm::template_agent_chart(
            &agent_data.name,
            &agent_data.namespace,
            &values,
            &self.chart_path,
            &self.manifest_root,
        )
        .await
    }

    async fn apply_manifest_dir(&self, manifest_dir: &Path, namespace: &str) -> Result<()> {
        let output = Command::new("kubectl")
            .arg("apply")
            .arg("-f")
            .arg(manifest_dir)
            .arg("-n")
            .arg(namespace)
            .arg("--recursive")
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!(
                "kubectl apply failed for {}: {stderr}",
                manifest_dir.display()
            );
            return Err(OperatorError::Subprocess {
                command: "kubectl apply".to_string(),
                stderr,
            });
        }
        info!(
            "Successfully applied manifests from {}",
            manifest_dir.display()
        );
        Ok(())
    }

    async fn delete_manifest_dir(&self, manifest_dir: &Path, namespace: &str) -> Result<()> {
        let output = Command::new("kubectl")
            .arg("delete")
            .arg("-f")
            .arg(manifest_dir)
            .arg("-n")
            .arg(namespace)
            .arg("--recursive")
            .arg("--ignore-not-found=true")
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!(
                "kubectl delete failed for {}: {stderr}",
                manifest_dir.display()
            );
            return Err(OperatorError::Subprocess {
                command: "kubectl delete".to_string(),
                stderr,
            });
        }
        info!(
            "Successfully deleted resources from {}",
            manifest_dir.display()
        );
        Ok(())
    }
}

#[async_trait]
impl DeploymentBackend for DirectBackend {
    async fn create(&self, agent_data: &AgentData) -> Result<String> {
        info!(
            "Deploying agent {} to namespace {}",
            agent_data.name, agent_data.namespace
        );
        let manifest_dir = self.template_chart(agent_data).await?;
        self.apply_manifest_dir(&manifest_dir, &agent_data.namespace)
            .await?;
        info!("Successfully deployed agent {}", agent_data.name);
        Ok(agent_data.name.clone())
    }

    async fn update(&self, agent_data: &AgentData) -> Result<String> {
        // kubectl apply handles both create and update
        self.create(agent_data).await
    }

    async fn delete(&self, agent_data: &AgentData) -> Result<()> {
        let mut manifest_dir = self.manifest_dir(&agent_data.name);

        if !tokio::fs::try_exists(&manifest_dir).await.unwrap_or(false) {
            info!(
                "Manifest directory not found for agent {}, templating chart for deletion",
                agent_data.name
            );
            manifest_dir = self.template_chart(agent_data).await?;
        }

        info!(
            "Deleting agent {} from namespace {}",
            agent_data.name, agent_data.namespace
        );
        self.delete_manifest_dir(&manifest_dir, &agent_data.namespace)
            .await?;
        info!("Successfully deleted agent {}", agent_data.name);
        Ok(())
    }

    async fn status(&self, agent_data: &AgentData) -> Result<Option<Value>> {
        let deployment =
            k8s::get_deployment(&self.client, &agent_data.name, &agent_data.namespace).await?;
        match deployment {
            Some(deployment) => Ok(Some(serde_json::to_value(deployment.status)?)),
            None => Ok(None),
        }
    }
}
