//! # Pipeline Updater
//!
//! Performs the entire cycle of checking all configured sources and
//! uploading the pipelines they produce. Conditional-fetch validators from
//! the previous response of each source are cached per source name for the
//! lifetime of the process.

use crate::error::{OperatorError, Result};
use crate::pipelines::config::{PipelineConfigMap, PipelineSourceConfig};
use crate::pipelines::downloader::{PipelineFetch, PipelineFileResponse};
use crate::pipelines::uploader::PipelineUploader;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error, warn};

pub struct PipelineUpdater {
    uploader: PipelineUploader,
    response_cache: HashMap<String, PipelineFileResponse>,
}

/// Read `pipelineInfo.name` from a pipeline package document.
async fn read_pipeline_name(package_path: &Path) -> Result<String> {
    let contents = tokio::fs::read(package_path).await?;
    let document: serde_yaml::Value = serde_yaml::from_slice(&contents)?;
    document
        .get("pipelineInfo")
        .and_then(|info| info.get("name"))
        .and_then(|name| name.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            OperatorError::Decode("package does not declare pipelineInfo.name".to_string())
        })
}

impl PipelineUpdater {
    pub fn new(uploader: PipelineUploader) -> Self {
        Self {
            uploader,
            response_cache: HashMap::new(),
        }
    }

    /// Trigger an update cycle over all configured sources. Errors on one
    /// source are logged and do not affect the others.
    pub async fn run(&mut self, config: &PipelineConfigMap, downloader: &dyn PipelineFetch) {
        for (source_name, source_config) in config {
            if let Err(err) = self
                .update_source(downloader, source_name, source_config)
                .await
            {
                error!("Error updating pipeline source '{source_name}': {err}");
            }
        }
    }

    /// Update a single configured source, and upload all (new) pipelines
    /// found.
    async fn update_source(
        &mut self,
        downloader: &dyn PipelineFetch,
        name: &str,
        config: &PipelineSourceConfig,
    ) -> Result<()> {
        let (etag, last_modified) = self
            .response_cache
            .get(name)
            .map(|response| (response.etag.as_deref(), response.last_modified.as_deref()))
            .unwrap_or((None, None));

        debug!("Checking on pipeline source updates for '{name}'");
        let (modified, response) = downloader.fetch(name, config, etag, last_modified).await?;
        if !modified {
            return Ok(());
        }
        let Some(response) = response else {
            return Ok(());
        };

        let version = config
            .version
            .as_deref()
            .unwrap_or(crate::constants::DEFAULT_PIPELINE_VERSION);
        debug!("Processing files: {:?}", response.file_paths);
        for file_path in &response.file_paths {
            self.upload_package(file_path, version).await;
        }
        self.response_cache.insert(name.to_string(), response);
        Ok(())
    }

    /// Upload one package, preferring the pipeline name embedded in the
    /// document over the file stem.
    async fn upload_package(&self, package_path: &Path, version: &str) {
        let file_stem = package_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("pipeline")
            .to_string();
        let pipeline_name = match read_pipeline_name(package_path).await {
            Ok(name) => name,
            Err(err) => {
                warn!(
                    "Could not extract pipeline name from '{}': {err}",
                    package_path.display()
                );
                file_stem
            }
        };

        let version_name = format!("{pipeline_name} {version}");
        self.uploader
            .upload(package_path, &version_name, Some(&pipeline_name))
            .await;
    }
}
