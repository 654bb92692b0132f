//! # Agent Config Payload
//!
//! The agent configuration rendered into chart values and consumed by the
//! deployed agent.

use crate::model::agent_data::AgentData;
use serde::Serialize;
use serde_json::{Map, Value};

/// Foundation-model reference in the rendered config
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FoundationModelConfig {
    pub name: String,
    pub endpoint: String,
}

/// Agent configuration serialized under the chart's `agentConfig` value.
///
/// Tool names are already normalized and knowledge-base configs resolved in
/// [`AgentData`]; this type only shapes the payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentConfig {
    pub namespace: String,
    pub name: String,
    pub foundation_model: FoundationModelConfig,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub routes: Vec<Map<String, Value>>,
    pub tools: Vec<Map<String, Value>>,
}

impl AgentConfig {
    pub fn from_agent_data(agent_data: &AgentData) -> Self {
        Self {
            namespace: agent_data.namespace.clone(),
            name: agent_data.name.clone(),
            foundation_model: FoundationModelConfig {
                name: agent_data.foundation_model.clone(),
                endpoint: agent_data.foundation_model_endpoint.clone(),
            },
            system_prompt: agent_data.system_prompt.clone(),
            max_tokens: agent_data.max_tokens,
            routes: agent_data.routes.clone(),
            tools: agent_data.tools.clone(),
        }
    }
}
