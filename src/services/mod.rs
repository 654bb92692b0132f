//! # Downstream Services
//!
//! Clients for services the operator drives but does not own.

pub mod kubeflow;

pub use kubeflow::{KubeflowPipelinesService, PipelineRun, PipelineService};
