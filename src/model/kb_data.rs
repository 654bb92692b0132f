//! # Knowledge Base Data
//!
//! Resolved knowledge-base configuration embedded into agent tool configs.

use crate::crd::AkamaiKnowledgeBaseSpec;
use crate::error::{OperatorError, Result};
use crate::k8s;
use kube::Client;
use serde_json::{Map, Value};

/// Decoded knowledge-base configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct KBData {
    pub name: String,
    pub pipeline_name: String,
    pub pipeline_parameters: Map<String, Value>,
}

impl KBData {
    /// Flatten into the config mapping expected by agent tools:
    /// `{pipeline_name, **pipeline_parameters}`.
    pub fn to_config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert(
            "pipeline_name".to_string(),
            Value::String(self.pipeline_name.clone()),
        );
        for (key, value) in &self.pipeline_parameters {
            config.insert(key.clone(), value.clone());
        }
        config
    }
}

/// Fetch the named knowledge base from the cluster and decode its spec.
pub async fn build_kb_data(client: &Client, namespace: &str, kb_name: &str) -> Result<KBData> {
    let object = k8s::get_custom_object(client, &k8s::KNOWLEDGE_BASE_RESOURCE, namespace, kb_name)
        .await?
        .ok_or_else(|| {
            OperatorError::knowledge_base(format!(
                "'{kb_name}' not found in namespace '{namespace}'"
            ))
        })?;

    let spec_value = object.data.get("spec").cloned().unwrap_or(Value::Null);
    let spec: AkamaiKnowledgeBaseSpec = serde_json::from_value(spec_value)?;

    Ok(KBData {
        name: kb_name.to_string(),
        pipeline_name: spec.pipeline_name,
        pipeline_parameters: spec.pipeline_parameters,
    })
}
