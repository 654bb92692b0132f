//! # Agent Deployment Data
//!
//! Builds the enriched deployment input for an agent: resolves the
//! foundation-model endpoint through service discovery, normalizes tool
//! names, and folds knowledge-base configuration into knowledgeBase tools.

use crate::crd::AkamaiAgentSpec;
use crate::error::{OperatorError, Result};
use crate::k8s;
use crate::model::kb_data::build_kb_data;
use kube::Client;
use serde_json::{Map, Value};

/// Deployment input for a single agent, rebuilt on every reconcile.
///
/// `foundation_model_endpoint` is resolved for create/update and left empty
/// on the delete path, where no service discovery is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentData {
    pub namespace: String,
    pub name: String,
    pub foundation_model: String,
    pub foundation_model_endpoint: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub routes: Vec<Map<String, Value>>,
    pub tools: Vec<Map<String, Value>>,
}

impl AgentData {
    /// Minimal deployment input for the delete path: no endpoint resolution,
    /// no routes or tools.
    pub fn minimal(namespace: &str, name: &str, spec: &AkamaiAgentSpec) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            foundation_model: spec.foundation_model.clone(),
            foundation_model_endpoint: String::new(),
            system_prompt: spec.system_prompt.clone(),
            max_tokens: spec.max_tokens,
            routes: Vec::new(),
            tools: Vec::new(),
        }
    }
}

/// Normalize a tool name to the underscore form expected by the agent.
fn normalize_tool(tool: &Map<String, Value>) -> Map<String, Value> {
    let mut copy = tool.clone();
    if let Some(Value::String(name)) = copy.get("name") {
        let normalized = name.replace('-', "_");
        copy.insert("name".to_string(), Value::String(normalized));
    }
    copy
}

/// Build [`AgentData`] from an agent spec.
///
/// knowledgeBase tools are looked up by their original (hyphenated) name,
/// which is the knowledge-base resource name; the tool entry that ships to
/// the chart carries the normalized name plus the resolved `config` mapping.
pub async fn build_agent_data(
    client: &Client,
    namespace: &str,
    name: &str,
    spec: &AkamaiAgentSpec,
) -> Result<AgentData> {
    let mut tools = Vec::with_capacity(spec.tools.len());
    for tool in &spec.tools {
        let mut tool_copy = normalize_tool(tool);
        if tool.get("type").and_then(Value::as_str) == Some("knowledgeBase") {
            if let Some(kb_name) = tool.get("name").and_then(Value::as_str) {
                let kb_data = build_kb_data(client, namespace, kb_name).await?;
                tool_copy.insert("config".to_string(), Value::Object(kb_data.to_config()));
            }
        }
        tools.push(tool_copy);
    }

    let foundation_model_endpoint =
        get_foundation_model_endpoint(client, &spec.foundation_model).await?;

    Ok(AgentData {
        namespace: namespace.to_string(),
        name: name.to_string(),
        foundation_model: spec.foundation_model.clone(),
        foundation_model_endpoint,
        system_prompt: spec.system_prompt.clone(),
        max_tokens: spec.max_tokens,
        routes: spec.routes.clone(),
        tools,
    })
}

/// Discover the foundation-model endpoint from services labeled with
/// `modelType` and `modelName`.
pub async fn get_foundation_model_endpoint(client: &Client, model_name: &str) -> Result<String> {
    let label_selector = format!("modelType,modelName={model_name}");
    let services = k8s::list_services(client, &label_selector).await?;

    let Some(service) = services.into_iter().next() else {
        return Err(OperatorError::Domain(format!(
            "Foundation model '{model_name}' not found. \
             No service with labels modelType,modelName={model_name}"
        )));
    };
    let service_name = service.metadata.name.unwrap_or_default();
    let service_namespace = service.metadata.namespace.unwrap_or_default();
    Ok(format!("{service_name}.{service_namespace}.svc.cluster.local"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn normalize_tool_replaces_hyphens() {
        let normalized = normalize_tool(&tool(json!({"type": "web", "name": "my-search-tool"})));
        assert_eq!(normalized["name"], json!("my_search_tool"));
        assert_eq!(normalized["type"], json!("web"));
    }

    #[test]
    fn normalize_tool_without_name_is_unchanged() {
        let original = tool(json!({"type": "web"}));
        assert_eq!(normalize_tool(&original), original);
    }

    #[test]
    fn normalized_names_contain_no_hyphens() {
        for name in ["a-b", "a-b-c", "already_fine", "trailing-"] {
            let normalized = normalize_tool(&tool(json!({"name": name})));
            assert!(!normalized["name"].as_str().unwrap().contains('-'));
        }
    }

    #[test]
    fn minimal_agent_data_skips_enrichment() {
        let spec: crate::crd::AkamaiAgentSpec = serde_json::from_value(json!({
            "foundationModel": "llama",
            "systemPrompt": "hi",
            "tools": [{"type": "knowledgeBase", "name": "my-kb"}],
        }))
        .unwrap();
        let data = AgentData::minimal("team-a", "agent-1", &spec);
        assert_eq!(data.namespace, "team-a");
        assert_eq!(data.foundation_model, "llama");
        assert!(data.foundation_model_endpoint.is_empty());
        assert!(data.tools.is_empty());
        assert!(data.routes.is_empty());
    }
}
