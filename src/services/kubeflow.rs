//! # Kubeflow Pipelines Service
//!
//! Client for the downstream pipeline service: package/version uploads for
//! the pipeline sync loop and run submission for knowledge bases. Talks to
//! the Kubeflow Pipelines v2beta1 REST API at `KUBEFLOW_ENDPOINT`.

use crate::constants;
use crate::crd::AkamaiKnowledgeBaseSpec;
use crate::error::{OperatorError, Result};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// A pipeline run as reported by the pipeline service
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineRun {
    pub run_id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

impl PipelineRun {
    /// Whether the run has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state.as_deref(),
            Some("SUCCEEDED" | "FAILED" | "CANCELED" | "SKIPPED")
        )
    }
}

/// Interface to the downstream pipeline service.
#[async_trait]
pub trait PipelineService: Send + Sync {
    /// Submit a package as a new version of the named pipeline, creating
    /// the pipeline when it does not exist yet. Returns the pipeline id
    /// and, for a new version of an existing pipeline, the version id.
    async fn upload_pipeline_version(
        &self,
        package_path: &Path,
        version_name: &str,
        pipeline_name: Option<&str>,
    ) -> Result<(String, Option<String>)>;

    /// Start the pipeline configured on a knowledge base and return the
    /// run id.
    async fn run_pipeline(
        &self,
        namespace: &str,
        name: &str,
        knowledge_base: &AkamaiKnowledgeBaseSpec,
    ) -> Result<String>;

    /// Poll until the run reaches a terminal state or the timeout elapses.
    async fn wait_for_run_completion(&self, run_id: &str, timeout: Duration)
        -> Result<PipelineRun>;
}

#[derive(Debug, Deserialize)]
struct PipelineSummary {
    pipeline_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct PipelineList {
    #[serde(default)]
    pipelines: Vec<PipelineSummary>,
}

#[derive(Debug, Deserialize)]
struct PipelineVersion {
    #[serde(default)]
    pipeline_version_id: Option<String>,
}

pub struct KubeflowPipelinesService {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl KubeflowPipelinesService {
    pub fn new(endpoint: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(constants::DEFAULT_DOWNLOAD_TIMEOUT_SECS))
            .build()?;
        Ok(Self { endpoint, client })
    }

    /// Endpoint from `KUBEFLOW_ENDPOINT`. A missing endpoint only fails
    /// once the service is actually used.
    pub fn from_env() -> Result<Self> {
        Self::new(std::env::var("KUBEFLOW_ENDPOINT").ok())
    }

    fn endpoint(&self) -> Result<&str> {
        self.endpoint.as_deref().ok_or_else(|| {
            OperatorError::Domain(
                "Kubeflow endpoint not configured. Set KUBEFLOW_ENDPOINT environment variable."
                    .to_string(),
            )
        })
    }

    /// Look up a pipeline id by display name.
    async fn get_pipeline_id(&self, pipeline_name: &str) -> Result<Option<String>> {
        let filter = json!({
            "predicates": [{
                "operation": "EQUALS",
                "key": "display_name",
                "string_value": pipeline_name,
            }],
        })
        .to_string();
        let url = format!("{}/apis/v2beta1/pipelines", self.endpoint()?);
        let response = self
            .client
            .get(&url)
            .query(&[("filter", filter.as_str())])
            .send()
            .await?;
        let list: PipelineList = read_json(response).await?;
        Ok(list
            .pipelines
            .into_iter()
            .next()
            .map(|pipeline| pipeline.pipeline_id))
    }

    fn package_part(package_path: &Path, contents: Vec<u8>) -> multipart::Part {
        let file_name = package_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(constants::DEFAULT_PIPELINE_FILE_NAME)
            .to_string();
        multipart::Part::bytes(contents).file_name(file_name)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(OperatorError::Http(status.as_u16()));
    }
    Ok(response.json().await?)
}

#[async_trait]
impl PipelineService for KubeflowPipelinesService {
    async fn upload_pipeline_version(
        &self,
        package_path: &Path,
        version_name: &str,
        pipeline_name: Option<&str>,
    ) -> Result<(String, Option<String>)> {
        let file_stem = package_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("pipeline");
        let pipeline_name = pipeline_name.unwrap_or(file_stem);
        let contents = tokio::fs::read(package_path).await?;

        match self.get_pipeline_id(pipeline_name).await? {
            Some(pipeline_id) => {
                let url = format!("{}/apis/v2beta1/pipelines/upload_version", self.endpoint()?);
                let form = multipart::Form::new()
                    .part("uploadfile", Self::package_part(package_path, contents));
                let response = self
                    .client
                    .post(&url)
                    .query(&[("name", version_name), ("pipelineid", pipeline_id.as_str())])
                    .multipart(form)
                    .send()
                    .await?;
                let version: PipelineVersion = read_json(response).await?;
                debug!("Uploaded new version of pipeline '{pipeline_name}' ({pipeline_id})");
                Ok((pipeline_id, version.pipeline_version_id))
            }
            None => {
                let url = format!("{}/apis/v2beta1/pipelines/upload", self.endpoint()?);
                let form = multipart::Form::new()
                    .part("uploadfile", Self::package_part(package_path, contents));
                let response = self
                    .client
                    .post(&url)
                    .query(&[("name", pipeline_name)])
                    .multipart(form)
                    .send()
                    .await?;
                let pipeline: PipelineSummary = read_json(response).await?;
                info!(
                    "Registered new pipeline '{pipeline_name}' ({})",
                    pipeline.pipeline_id
                );
                Ok((pipeline.pipeline_id, None))
            }
        }
    }

    async fn run_pipeline(
        &self,
        namespace: &str,
        name: &str,
        knowledge_base: &AkamaiKnowledgeBaseSpec,
    ) -> Result<String> {
        let pipeline_name = &knowledge_base.pipeline_name;
        if pipeline_name.is_empty() {
            return Err(OperatorError::Domain(format!(
                "No pipeline specified for knowledge base {name}"
            )));
        }

        let pipeline_id = self.get_pipeline_id(pipeline_name).await?.ok_or_else(|| {
            OperatorError::Domain(format!("Pipeline '{pipeline_name}' not found in Kubeflow"))
        })?;

        let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let body = json!({
            "display_name": format!("{name}-{namespace}-{timestamp}"),
            "pipeline_version_reference": {"pipeline_id": pipeline_id},
            "runtime_config": {"parameters": knowledge_base.pipeline_parameters},
        });

        let url = format!("{}/apis/v2beta1/runs", self.endpoint()?);
        let response = self.client.post(&url).json(&body).send().await?;
        let run: PipelineRun = read_json(response).await?;
        Ok(run.run_id)
    }

    async fn wait_for_run_completion(
        &self,
        run_id: &str,
        timeout: Duration,
    ) -> Result<PipelineRun> {
        let url = format!("{}/apis/v2beta1/runs/{run_id}", self.endpoint()?);
        let deadline = tokio::time::Instant::now() + timeout;
        let poll_interval = Duration::from_secs(constants::RUN_COMPLETION_POLL_SECS);

        loop {
            let response = self.client.get(&url).send().await?;
            let run: PipelineRun = read_json(response).await?;
            if run.is_finished() {
                return Ok(run);
            }
            if tokio::time::Instant::now() + poll_interval > deadline {
                return Err(OperatorError::Domain(format!(
                    "Timed out waiting for pipeline run '{run_id}' to complete"
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
