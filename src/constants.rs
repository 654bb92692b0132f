//! # Constants
//!
//! Resource coordinates, environment variable names, and defaults shared
//! across the operator.

/// API group of the watched custom resources
pub const API_GROUP: &str = "akamai.io";
/// API version of the watched custom resources
pub const API_VERSION: &str = "v1alpha1";
/// Plural of the `AkamaiAgent` resource
pub const AGENT_PLURAL: &str = "akamaiagents";
/// Plural of the `AkamaiKnowledgeBase` resource
pub const KNOWLEDGE_BASE_PLURAL: &str = "akamaiknowledgebases";

/// Finalizer recorded on agents so deletions are observed
pub const AGENT_FINALIZER: &str = "akamai.io/agent-cleanup";
/// Finalizer recorded on knowledge bases so deletions are observed
pub const KNOWLEDGE_BASE_FINALIZER: &str = "akamai.io/knowledge-base-cleanup";

/// Field manager recorded on status patches
pub const FIELD_MANAGER: &str = "ai-operator";

/// Name of the ConfigMap holding pipeline source configurations
pub const CONFIG_MAP_NAME: &str = "pipelines";
/// Default namespace for the pipeline source ConfigMap and its secrets
pub const DEFAULT_CONFIG_NAMESPACE: &str = "ml-operator";

/// Argo CD Application coordinates used by the GitOps backend
pub const ARGOCD_GROUP: &str = "argoproj.io";
pub const ARGOCD_VERSION: &str = "v1alpha1";
pub const ARGOCD_NAMESPACE: &str = "argocd";
pub const ARGOCD_APPLICATION_KIND: &str = "Application";
pub const ARGOCD_APPLICATION_PLURAL: &str = "applications";

/// Provider value selecting the GitOps backend
pub const GITOPS_PROVIDER: &str = "apl";
/// Default `PROVIDER` when unset
pub const DEFAULT_PROVIDER: &str = "apl";

/// Default local chart location for the direct backend (`CHART_PATH`)
pub const DEFAULT_CHART_PATH: &str = "/app/agent";
/// Default chart repository for the GitOps backend (`AGENT_CHART_REPO_URL`)
pub const DEFAULT_CHART_REPO_URL: &str = "https://github.com/linode/ai-operators.git";
/// Default chart repository revision (`AGENT_CHART_REPO_REVISION`)
pub const DEFAULT_CHART_REPO_REVISION: &str = "main";
/// Default chart path within the repository (`AGENT_CHART_PATH`)
pub const DEFAULT_AGENT_CHART_PATH: &str = "agent";
/// Root directory for rendered agent manifests (direct backend)
pub const DEFAULT_MANIFEST_ROOT: &str = "/tmp/agents";

/// Interval between pipeline configuration refreshes
pub const CONFIG_UPDATE_INTERVAL_SECS: u64 = 30;
/// Interval between pipeline source sync cycles
pub const SOURCE_UPDATE_INTERVAL_SECS: u64 = 10;
/// Poll interval while waiting for the first configuration snapshot
pub const CONFIG_WAIT_POLL_SECS: u64 = 1;

/// Default maximum pipeline package size (32 MiB)
pub const DEFAULT_MAX_DOWNLOAD_SIZE: u64 = 32 * 1024 * 1024;
/// Default download buffer size
pub const DEFAULT_CHUNK_SIZE: usize = 8192;
/// Default total timeout for pipeline source requests
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;
/// Default idle connection cap per source host
pub const DEFAULT_MAX_IDLE_CONNECTIONS_PER_HOST: usize = 5;
/// Fallback file name when a source response carries no Content-Disposition
pub const DEFAULT_PIPELINE_FILE_NAME: &str = "pipeline.yaml";
/// Default pipeline version label when a source does not pin one
pub const DEFAULT_PIPELINE_VERSION: &str = "1.0.0";

/// Default timeout for pipeline run completion waits (2 hours)
pub const DEFAULT_RUN_COMPLETION_TIMEOUT_SECS: u64 = 7200;
/// Poll interval while waiting for a pipeline run to complete
pub const RUN_COMPLETION_POLL_SECS: u64 = 5;

/// Requeue delay after a failed reconciliation
pub const RECONCILE_ERROR_REQUEUE_SECS: u64 = 30;
