//! # Pipeline Uploader
//!
//! Best-effort submission of a pipeline package as a new version of a named
//! pipeline. Failures are logged and absorbed so one bad package never
//! stops a sync cycle.

use crate::services::PipelineService;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

pub struct PipelineUploader {
    service: Arc<dyn PipelineService>,
}

impl PipelineUploader {
    pub fn new(service: Arc<dyn PipelineService>) -> Self {
        Self { service }
    }

    /// Upload a single pipeline package.
    ///
    /// Returns the pipeline id and, when a new version was created for an
    /// existing pipeline, the version id. `None` signals a failed upload.
    pub async fn upload(
        &self,
        package_path: &Path,
        version_name: &str,
        pipeline_name: Option<&str>,
    ) -> Option<(String, Option<String>)> {
        match self
            .service
            .upload_pipeline_version(package_path, version_name, pipeline_name)
            .await
        {
            Ok((pipeline_id, version_id)) => {
                info!("Uploaded pipeline version '{version_name}' (pipeline: {pipeline_id})");
                Some((pipeline_id, version_id))
            }
            Err(err) => {
                error!("Error uploading pipeline '{version_name}': {err}");
                None
            }
        }
    }
}
