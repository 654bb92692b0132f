//! # GitOps Backend
//!
//! Maps each agent to an Argo CD `Application` in the managed GitOps
//! namespace. The Application's chart source points at the agent chart
//! repository and carries the rendered Helm values inline; the external
//! GitOps controller does the actual deployment.

use crate::constants;
use crate::deploy::{helm, DeploymentBackend};
use crate::error::{OperatorError, Result};
use crate::k8s;
use crate::model::AgentData;
use async_trait::async_trait;
use kube::Client;
use serde_json::{json, Value};
use tracing::{error, info};

pub struct GitOpsBackend {
    client: Client,
    repo_url: String,
    target_revision: String,
    chart_path: String,
}

fn app_name(agent_data: &AgentData) -> String {
    format!("agent-{}", agent_data.name)
}

/// Build the Argo CD Application definition for an agent.
fn application_template(
    repo_url: &str,
    target_revision: &str,
    chart_path: &str,
    agent_data: &AgentData,
) -> Result<Value> {
    let values = helm::chart_values(agent_data)?;
    let helm_values = serde_yaml::to_string(&values)?;
    let app_name = app_name(agent_data);

    Ok(json!({
        "apiVersion": format!("{}/{}", constants::ARGOCD_GROUP, constants::ARGOCD_VERSION),
        "kind": constants::ARGOCD_APPLICATION_KIND,
        "metadata": {
            "name": app_name,
            "namespace": constants::ARGOCD_NAMESPACE,
            "annotations": {
                "argocd.argoproj.io/compare-options": "ServerSideDiff=true,IncludeMutationWebhook=true",
            },
            "labels": {
                "app.kubernetes.io/name": app_name,
                "app.kubernetes.io/component": "agent",
                "app.kubernetes.io/managed-by": "ai-operator",
            },
        },
        "spec": {
            "project": "default",
            "source": {
                "repoURL": repo_url,
                "path": chart_path,
                "targetRevision": target_revision,
                "helm": {
                    "values": helm_values,
                },
            },
            "destination": {
                "server": "https://kubernetes.default.svc",
                "namespace": agent_data.namespace,
            },
            "syncPolicy": {
                "automated": {
                    "prune": true,
                    "allowEmpty": false,
                    "selfHeal": true,
                },
                "syncOptions": ["ServerSideApply=true"],
            },
        },
    }))
}

impl GitOpsBackend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            repo_url: std::env::var("AGENT_CHART_REPO_URL")
                .unwrap_or_else(|_| constants::DEFAULT_CHART_REPO_URL.to_string()),
            target_revision: std::env::var("AGENT_CHART_REPO_REVISION")
                .unwrap_or_else(|_| constants::DEFAULT_CHART_REPO_REVISION.to_string()),
            chart_path: std::env::var("AGENT_CHART_PATH")
                .unwrap_or_else(|_| constants::DEFAULT_AGENT_CHART_PATH.to_string()),
        }
    }

    fn application(&self, agent_data: &AgentData) -> Result<Value> {
        application_template(
            &self.repo_url,
            &self.target_revision,
            &self.chart_path,
            agent_data,
        )
    }
}

#[async_trait]
impl DeploymentBackend for GitOpsBackend {
    async fn create(&self, agent_data: &AgentData) -> Result<String> {
        let application = self.application(agent_data)?;
        let app_name = app_name(agent_data);

        match k8s::create_custom_object(
            &self.client,
            &k8s::ARGO_APPLICATION_RESOURCE,
            constants::ARGOCD_NAMESPACE,
            application,
        )
        .await
        {
            Ok(_) => {
                info!(
                    "Created Argo CD application {app_name} for agent {}",
                    agent_data.name
                );
                Ok(app_name)
            }
            Err(OperatorError::External(409)) => {
                info!("Argo CD application {app_name} already exists, updating...");
                self.update(agent_data).await
            }
            Err(err) => {
                error!("Failed to create Argo CD application {app_name}: {err}");
                Err(err)
            }
        }
    }

    async fn update(&self, agent_data: &AgentData) -> Result<String> {
        let application = self.application(agent_data)?;
        let app_name = app_name(agent_data);

        match k8s::patch_custom_object(
            &self.client,
            &k8s::ARGO_APPLICATION_RESOURCE,
            constants::ARGOCD_NAMESPACE,
            &app_name,
            application,
        )
        .await
        {
            Ok(_) => {
                info!(
                    "Updated Argo CD application {app_name} for agent {}",
                    agent_data.name
                );
                Ok(app_name)
            }
            Err(err) => {
                error!("Failed to update Argo CD application {app_name}: {err}");
                Err(err)
            }
        }
    }

    async fn delete(&self, agent_data: &AgentData) -> Result<()> {
        let app_name = app_name(agent_data);
        k8s::delete_custom_object(
            &self.client,
            &k8s::ARGO_APPLICATION_RESOURCE,
            constants::ARGOCD_NAMESPACE,
            &app_name,
        )
        .await?;
        info!(
            "Deleted Argo CD application {app_name} for agent {}",
            agent_data.name
        );
        Ok(())
    }

    async fn status(&self, agent_data: &AgentData) -> Result<Option<Value>> {
        let app_name = app_name(agent_data);
        let application = k8s::get_custom_object(
            &self.client,
            &k8s::ARGO_APPLICATION_RESOURCE,
            constants::ARGOCD_NAMESPACE,
            &app_name,
        )
        .await?;
        Ok(application.and_then(|app| app.data.get("status").cloned()))
    }
}
