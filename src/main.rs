//! Operator entry point: wires the two controllers and the background
//! loops, and shuts the loops down once the controllers stop.

use ai_operator::controller::agent::{self, AgentContext};
use ai_operator::controller::knowledge_base::{self, KnowledgeBaseContext};
use ai_operator::controller::StatusReporter;
use ai_operator::crd::{AkamaiAgent, AkamaiKnowledgeBase};
use ai_operator::runtime;
use anyhow::Result;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::controller::Controller;
use kube::runtime::watcher;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = runtime::initialize().await?;

    let shutdown = CancellationToken::new();
    let config_loop = tokio::spawn(runtime::run_config_refresh_loop(
        runtime.config_loader.clone(),
        shutdown.clone(),
    ));
    let sync_loop = tokio::spawn(runtime::run_pipeline_sync_loop(
        runtime.config_loader.clone(),
        runtime.pipeline_service.clone(),
        runtime.download_config.clone(),
        shutdown.clone(),
    ));

    let agent_context = Arc::new(AgentContext {
        client: runtime.client.clone(),
        backend: runtime.backend.clone(),
        reporter: StatusReporter::new(runtime.client.clone()),
        namespaces: runtime.namespaces.clone(),
    });
    let knowledge_base_context = Arc::new(KnowledgeBaseContext {
        client: runtime.client.clone(),
        pipelines: runtime.pipeline_service.clone(),
        namespaces: runtime.namespaces.clone(),
    });

    let agents: Api<AkamaiAgent> = Api::all(runtime.client.clone());
    let agent_controller = Controller::new(agents, watcher::Config::default())
        .shutdown_on_signal()
        .run(agent::reconcile, agent::error_policy, agent_context)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!("Reconciled AkamaiAgent {object}"),
                Err(err) => warn!("AkamaiAgent reconciliation failed: {err}"),
            }
        });

    let knowledge_bases: Api<AkamaiKnowledgeBase> = Api::all(runtime.client.clone());
    let knowledge_base_controller = Controller::new(knowledge_bases, watcher::Config::default())
        .shutdown_on_signal()
        .run(
            knowledge_base::reconcile,
            knowledge_base::error_policy,
            knowledge_base_context,
        )
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!("Reconciled AkamaiKnowledgeBase {object}"),
                Err(err) => warn!("AkamaiKnowledgeBase reconciliation failed: {err}"),
            }
        });

    info!("Operator initialized, starting controllers");
    tokio::join!(agent_controller, knowledge_base_controller);

    info!("Controllers stopped, shutting down background loops");
    shutdown.cancel();
    let _ = tokio::join!(config_loop, sync_loop);

    info!("AI operator shut down.");
    Ok(())
}
