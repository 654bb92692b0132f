//! # Custom Resource Definitions
//!
//! CRD types for the AI operator: `AkamaiAgent` and `AkamaiKnowledgeBase`
//! under `akamai.io/v1alpha1`.
//!
//! Specs use the external camelCase field names on the wire and reject
//! unknown fields, so a decoded spec re-encodes to the original mapping.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod status;

pub use status::{AgentStatus, Condition, KnowledgeBaseStatus};

fn default_max_tokens() -> u32 {
    512
}

/// AkamaiAgent Custom Resource Definition
///
/// Describes an AI agent backed by a discovered foundation-model service,
/// with optional routes and tools. `knowledgeBase`-typed tools reference an
/// `AkamaiKnowledgeBase` resource by name.
///
/// # Example
///
/// ```yaml
/// apiVersion: akamai.io/v1alpha1
/// kind: AkamaiAgent
/// metadata:
///   name: support-agent
///   namespace: team-a
/// spec:
///   foundationModel: llama
///   systemPrompt: You are a helpful assistant.
///   tools:
///     - type: knowledgeBase
///       name: product-docs
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "AkamaiAgent",
    group = "akamai.io",
    version = "v1alpha1",
    plural = "akamaiagents",
    namespaced,
    status = "AgentStatus",
    shortname = "agent",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Model", "type":"string", "jsonPath":".spec.foundationModel"}"#
)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AkamaiAgentSpec {
    /// Foundation model name, resolved against labeled cluster services
    pub foundation_model: String,
    /// System prompt handed to the agent
    /// Older resources use the `agentInstructions` key; both decode here
    #[serde(alias = "agentInstructions")]
    pub system_prompt: String,
    /// Token budget for agent responses
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Routing rules, passed through to the agent chart verbatim
    #[serde(default)]
    pub routes: Vec<Map<String, Value>>,
    /// Tool definitions; each carries at least `type` and `name`
    #[serde(default)]
    pub tools: Vec<Map<String, Value>>,
}

/// AkamaiKnowledgeBase Custom Resource Definition
///
/// Names the embedding pipeline to run for this knowledge base, with its
/// free-form parameters.
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "AkamaiKnowledgeBase",
    group = "akamai.io",
    version = "v1alpha1",
    plural = "akamaiknowledgebases",
    namespaced,
    shortname = "kb"
)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AkamaiKnowledgeBaseSpec {
    /// Name of the pipeline registered with the pipeline service
    pub pipeline_name: String,
    /// Parameters passed to the pipeline run
    pub pipeline_parameters: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_agent_spec() -> Value {
        json!({
            "foundationModel": "llama",
            "systemPrompt": "You are a helpful assistant.",
            "maxTokens": 1024,
            "routes": [{"path": "/chat"}],
            "tools": [{"type": "knowledgeBase", "name": "product-docs"}],
        })
    }

    #[test]
    fn agent_spec_decodes_camel_case_fields() {
        let spec: AkamaiAgentSpec = serde_json::from_value(sample_agent_spec()).unwrap();
        assert_eq!(spec.foundation_model, "llama");
        assert_eq!(spec.system_prompt, "You are a helpful assistant.");
        assert_eq!(spec.max_tokens, 1024);
        assert_eq!(spec.routes.len(), 1);
        assert_eq!(spec.tools[0]["name"], json!("product-docs"));
    }

    #[test]
    fn agent_spec_round_trips() {
        let original = sample_agent_spec();
        let spec: AkamaiAgentSpec = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&spec).unwrap(), original);
    }

    #[test]
    fn agent_spec_accepts_agent_instructions_alias() {
        let spec: AkamaiAgentSpec = serde_json::from_value(json!({
            "foundationModel": "llama",
            "agentInstructions": "hi",
        }))
        .unwrap();
        assert_eq!(spec.system_prompt, "hi");
    }

    #[test]
    fn agent_spec_defaults_max_tokens() {
        let spec: AkamaiAgentSpec = serde_json::from_value(json!({
            "foundationModel": "llama",
            "systemPrompt": "hi",
        }))
        .unwrap();
        assert_eq!(spec.max_tokens, 512);
        assert!(spec.routes.is_empty());
        assert!(spec.tools.is_empty());
    }

    #[test]
    fn agent_spec_rejects_unknown_fields() {
        let result = serde_json::from_value::<AkamaiAgentSpec>(json!({
            "foundationModel": "llama",
            "systemPrompt": "hi",
            "unexpected": true,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn agent_spec_requires_foundation_model() {
        let result = serde_json::from_value::<AkamaiAgentSpec>(json!({
            "systemPrompt": "hi",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn knowledge_base_spec_decodes() {
        let spec: AkamaiKnowledgeBaseSpec = serde_json::from_value(json!({
            "pipelineName": "emb",
            "pipelineParameters": {"url": "https://example.com/kb-data", "x": 1},
        }))
        .unwrap();
        assert_eq!(spec.pipeline_name, "emb");
        assert_eq!(spec.pipeline_parameters["x"], json!(1));
    }

    #[test]
    fn knowledge_base_spec_requires_parameters() {
        let result = serde_json::from_value::<AkamaiKnowledgeBaseSpec>(json!({
            "pipelineName": "emb",
        }));
        assert!(result.is_err());
    }
}
