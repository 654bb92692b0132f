//! # Agent Reconciler
//!
//! Drives AkamaiAgent resources through their create/update/delete
//! lifecycle, delegating workload management to the configured deployment
//! backend and recording the outcome on the status subresource.

use crate::constants;
use crate::controller::{NamespaceFilter, StatusReporter};
use crate::crd::{AkamaiAgent, AkamaiAgentSpec};
use crate::deploy::DeploymentBackend;
use crate::error::OperatorError;
use crate::model::{build_agent_data, AgentData};
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{finalizer, Error as FinalizerError, Event};
use kube::{Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Shared state for agent reconciliation
pub struct AgentContext {
    pub client: Client,
    pub backend: Arc<dyn DeploymentBackend>,
    pub reporter: StatusReporter,
    pub namespaces: NamespaceFilter,
}

pub type AgentReconcileError = FinalizerError<OperatorError>;

/// Reconcile one AkamaiAgent event.
///
/// Events outside the namespace filter are ignored. A finalizer keeps
/// deletions observable; per-object serialization and arrival ordering come
/// from the controller runtime.
pub async fn reconcile(
    agent: Arc<AkamaiAgent>,
    ctx: Arc<AgentContext>,
) -> Result<Action, AgentReconcileError> {
    let namespace = agent.namespace().unwrap_or_default();
    if !ctx.namespaces.matches(&namespace) {
        return Ok(Action::await_change());
    }

    let api: Api<AkamaiAgent> = Api::namespaced(ctx.client.clone(), &namespace);
    finalizer(&api, constants::AGENT_FINALIZER, agent, |event| {
        let ctx = Arc::clone(&ctx);
        async move {
            match event {
                Event::Apply(agent) => apply(&agent, &ctx).await,
                Event::Cleanup(agent) => cleanup(&agent, &ctx).await,
            }
        }
    })
    .await
}

/// Requeue with a delay; the status carries the error detail already.
pub fn error_policy(
    agent: Arc<AkamaiAgent>,
    error: &AgentReconcileError,
    _ctx: Arc<AgentContext>,
) -> Action {
    error!(
        "Reconciliation error for agent {}: {error}",
        agent.name_any()
    );
    Action::requeue(Duration::from_secs(constants::RECONCILE_ERROR_REQUEUE_SECS))
}

async fn apply(agent: &AkamaiAgent, ctx: &AgentContext) -> Result<Action, OperatorError> {
    let namespace = agent.namespace().unwrap_or_default();
    let name = agent.name_any();

    // The first reconcile of an object has no status phase yet; later events
    // take the update path.
    let first_seen = agent
        .status
        .as_ref()
        .and_then(|status| status.phase.as_ref())
        .is_none();

    let result = if first_seen {
        created(ctx, &namespace, &name, &agent.spec).await
    } else {
        updated(ctx, &namespace, &name, &agent.spec).await
    };

    if let Err(err) = result {
        let action = if first_seen { "create" } else { "update" };
        error!("Failed to {action} agent {name}: {err}");
        let status_result = match &err {
            OperatorError::KnowledgeBase(message) => {
                ctx.reporter.set_kb_error(&namespace, &name, message).await
            }
            other => {
                ctx.reporter
                    .set_failed(&namespace, &name, &other.to_string())
                    .await
            }
        };
        if let Err(status_err) = status_result {
            error!("Failed to record failure status for agent {name}: {status_err}");
        }
        return Err(err);
    }

    Ok(Action::await_change())
}

async fn created(
    ctx: &AgentContext,
    namespace: &str,
    name: &str,
    spec: &AkamaiAgentSpec,
) -> Result<(), OperatorError> {
    info!("Processing created agent {name} in namespace {namespace}");

    let agent_data = build_agent_data(&ctx.client, namespace, name, spec).await?;

    if ctx.backend.status(&agent_data).await?.is_some() {
        info!("Agent {name} deployment already exists, skipping creation");
        ctx.reporter.set_deployed(namespace, name, name).await?;
        return Ok(());
    }

    let deployment_id = ctx.backend.create(&agent_data).await?;
    ctx.reporter
        .set_deployed(namespace, name, &deployment_id)
        .await?;
    ctx.reporter.clear_failed(namespace, name).await?;

    info!(
        "Agent {name} created successfully with model {} (deployment: {deployment_id})",
        agent_data.foundation_model
    );
    Ok(())
}

async fn updated(
    ctx: &AgentContext,
    namespace: &str,
    name: &str,
    spec: &AkamaiAgentSpec,
) -> Result<(), OperatorError> {
    info!("Processing updated agent {name} in namespace {namespace}");

    let agent_data = build_agent_data(&ctx.client, namespace, name, spec).await?;
    let deployment_id = ctx.backend.update(&agent_data).await?;
    ctx.reporter
        .set_deployed(namespace, name, &deployment_id)
        .await?;
    ctx.reporter.clear_failed(namespace, name).await?;

    info!("Agent {name} updated successfully (deployment: {deployment_id})");
    Ok(())
}

async fn cleanup(agent: &AkamaiAgent, ctx: &AgentContext) -> Result<Action, OperatorError> {
    let namespace = agent.namespace().unwrap_or_default();
    let name = agent.name_any();
    info!("Processing deletion of agent {name} in namespace {namespace}");

    // Deletion needs no endpoint resolution or knowledge-base enrichment.
    let agent_data = AgentData::minimal(&namespace, &name, &agent.spec);
    if let Err(err) = ctx.backend.delete(&agent_data).await {
        error!("Failed to delete agent {name}: {err}");
        return Err(err);
    }

    info!("Agent {name} cleanup completed");
    Ok(Action::await_change())
}
