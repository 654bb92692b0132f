//! # AI Operator
//!
//! A Kubernetes operator that reconciles `AkamaiAgent` and
//! `AkamaiKnowledgeBase` custom resources into concrete cluster workloads.
//!
//! ## Overview
//!
//! 1. **Agent reconciliation** - Watches AkamaiAgent resources and deploys
//!    each agent's chart, either through Argo CD (GitOps backend) or by
//!    rendering and applying manifests directly (direct backend).
//! 2. **Knowledge bases** - Watches AkamaiKnowledgeBase resources and runs
//!    the configured embedding pipeline through Kubeflow Pipelines.
//! 3. **Pipeline sync** - Continuously pulls remote pipeline packages from
//!    sources configured in the `pipelines` ConfigMap, using conditional
//!    requests and size-limited streaming, and uploads new versions to the
//!    pipeline service.
//!
//! The deployment backend is selected at startup from `PROVIDER`;
//! `WATCH_NAMESPACES` optionally restricts the watched namespaces.

pub mod constants;
pub mod controller;
pub mod crd;
pub mod deploy;
pub mod error;
pub mod k8s;
pub mod model;
pub mod pipelines;
pub mod runtime;
pub mod services;

pub use crd::{
    AgentStatus, AkamaiAgent, AkamaiAgentSpec, AkamaiKnowledgeBase, AkamaiKnowledgeBaseSpec,
    Condition, KnowledgeBaseStatus,
};
pub use error::{OperatorError, Result};
