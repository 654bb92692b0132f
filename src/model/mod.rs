//! # Deployment Input Models
//!
//! Enriched, per-reconcile data passed to the deployment backends.

pub mod agent_config;
pub mod agent_data;
pub mod kb_data;

pub use agent_config::{AgentConfig, FoundationModelConfig};
pub use agent_data::{build_agent_data, AgentData};
pub use kb_data::{build_kb_data, KBData};
