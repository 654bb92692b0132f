//! # Knowledge Base Reconciler
//!
//! Starts the configured embedding pipeline whenever a knowledge base is
//! created or updated, and waits for the run to finish. Deletion performs
//! no backend action beyond logging.

use crate::constants;
use crate::controller::NamespaceFilter;
use crate::crd::AkamaiKnowledgeBase;
use crate::error::OperatorError;
use crate::services::PipelineService;
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{finalizer, Error as FinalizerError, Event};
use kube::{Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Shared state for knowledge-base reconciliation
pub struct KnowledgeBaseContext {
    pub client: Client,
    pub pipelines: Arc<dyn PipelineService>,
    pub namespaces: NamespaceFilter,
}

pub type KnowledgeBaseReconcileError = FinalizerError<OperatorError>;

pub async fn reconcile(
    knowledge_base: Arc<AkamaiKnowledgeBase>,
    ctx: Arc<KnowledgeBaseContext>,
) -> Result<Action, KnowledgeBaseReconcileError> {
    let namespace = knowledge_base.namespace().unwrap_or_default();
    if !ctx.namespaces.matches(&namespace) {
        return Ok(Action::await_change());
    }

    let api: Api<AkamaiKnowledgeBase> = Api::namespaced(ctx.client.clone(), &namespace);
    finalizer(
        &api,
        constants::KNOWLEDGE_BASE_FINALIZER,
        knowledge_base,
        |event| {
            let ctx = Arc::clone(&ctx);
            async move {
                match event {
                    Event::Apply(knowledge_base) => apply(&knowledge_base, &ctx).await,
                    Event::Cleanup(knowledge_base) => cleanup(&knowledge_base).await,
                }
            }
        },
    )
    .await
}

pub fn error_policy(
    knowledge_base: Arc<AkamaiKnowledgeBase>,
    error: &KnowledgeBaseReconcileError,
    _ctx: Arc<KnowledgeBaseContext>,
) -> Action {
    error!(
        "Reconciliation error for knowledge base {}: {error}",
        knowledge_base.name_any()
    );
    Action::requeue(Duration::from_secs(constants::RECONCILE_ERROR_REQUEUE_SECS))
}

async fn apply(
    knowledge_base: &AkamaiKnowledgeBase,
    ctx: &KnowledgeBaseContext,
) -> Result<Action, OperatorError> {
    let namespace = knowledge_base.namespace().unwrap_or_default();
    let name = knowledge_base.name_any();
    info!("Processing knowledge base {name} in namespace {namespace}");

    let run_id = match ctx
        .pipelines
        .run_pipeline(&namespace, &name, &knowledge_base.spec)
        .await
    {
        Ok(run_id) => run_id,
        Err(err) => {
            error!("Failed to start embedding pipeline for {name} in {namespace}: {err}");
            return Err(err);
        }
    };
    info!("Started embedding pipeline for {name} in {namespace}. Run ID: {run_id}");

    let timeout = Duration::from_secs(constants::DEFAULT_RUN_COMPLETION_TIMEOUT_SECS);
    match ctx
        .pipelines
        .wait_for_run_completion(&run_id, timeout)
        .await
    {
        Ok(run) => {
            info!(
                "Pipeline completed for {name} in {namespace}. Final state: {}",
                run.state.as_deref().unwrap_or("unknown")
            );
            Ok(Action::await_change())
        }
        Err(err) => {
            error!("Pipeline failed for {name} in {namespace}: {err}");
            Err(err)
        }
    }
}

async fn cleanup(knowledge_base: &AkamaiKnowledgeBase) -> Result<Action, OperatorError> {
    let namespace = knowledge_base.namespace().unwrap_or_default();
    let name = knowledge_base.name_any();
    info!("Knowledge base {name} in namespace {namespace} deleted");

    // TODO: stop in-flight runs and archive the pipeline and its experiments
    // in Kubeflow when a knowledge base is removed.
    Ok(Action::await_change())
}
