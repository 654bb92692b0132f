//! # Status Reporting
//!
//! Merge patches to the AkamaiAgent status subresource. Every write stamps
//! `lastUpdated` (RFC 3339, UTC).
//!
//! Writes are skipped when they would not change the recorded status
//! (timestamps aside) to keep self-triggered watch events from looping the
//! reconciler.

use crate::crd::AgentStatus;
use crate::error::Result;
use crate::k8s;
use kube::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info};

pub struct StatusReporter {
    client: Client,
}

/// Build a condition entry with fresh transition/update timestamps.
fn condition(r#type: &str, status: &str, reason: &str, message: String) -> Value {
    let now = chrono::Utc::now().to_rfc3339();
    json!({
        "type": r#type,
        "status": status,
        "reason": reason,
        "message": message,
        "lastTransitionTime": now,
        "lastUpdateTime": now,
    })
}

/// Reduce a conditions value to its timestamp-free fields for comparison.
fn condition_summaries(value: &Value) -> Vec<(String, String, String, String)> {
    let field = |entry: &Value, key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| {
                    (
                        field(entry, "type"),
                        field(entry, "status"),
                        field(entry, "reason"),
                        field(entry, "message"),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn value_matches(current: Option<&Value>, update: &Value) -> bool {
    match (current, update) {
        (None | Some(Value::Null), Value::Null) => true,
        (Some(current), update) => current == update,
        (None, _) => false,
    }
}

/// Whether applying `update` to `current` would change anything observable.
/// Timestamps (`lastUpdated`, condition times) are ignored.
fn status_update_changes(current: Option<&AgentStatus>, update: &Value) -> bool {
    let Some(current) = current else { return true };
    let current = serde_json::to_value(current).unwrap_or(Value::Null);
    let Some(fields) = update.as_object() else {
        return true;
    };
    fields.iter().any(|(key, value)| match key.as_str() {
        "lastUpdated" => false,
        "conditions" => {
            condition_summaries(value)
                != condition_summaries(current.get(key).unwrap_or(&Value::Null))
        }
        _ => !value_matches(current.get(key), value),
    })
}

impl StatusReporter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn current_status(&self, namespace: &str, name: &str) -> Result<Option<AgentStatus>> {
        let agent =
            k8s::get_custom_object(&self.client, &k8s::AGENT_RESOURCE, namespace, name).await?;
        Ok(agent
            .and_then(|agent| agent.data.get("status").cloned())
            .and_then(|status| serde_json::from_value(status).ok()))
    }

    /// Merge-patch the agent's status subresource with `update`, skipping
    /// writes that would not change the recorded status.
    async fn patch_agent_status(
        &self,
        namespace: &str,
        name: &str,
        mut update: Value,
    ) -> Result<()> {
        let current = self.current_status(namespace, name).await?;
        if !status_update_changes(current.as_ref(), &update) {
            debug!("Skipping status update for {name} - no observable change");
            return Ok(());
        }

        update["lastUpdated"] = json!(chrono::Utc::now().to_rfc3339());
        let result = k8s::patch_custom_object_status(
            &self.client,
            &k8s::AGENT_RESOURCE,
            namespace,
            name,
            update,
        )
        .await;

        match result {
            Ok(()) => {
                info!("Updated status for AkamaiAgent {name} in namespace {namespace}");
                Ok(())
            }
            Err(err) => {
                error!("Failed to update status for AkamaiAgent {name}: {err}");
                Err(err)
            }
        }
    }

    pub async fn set_deployed(
        &self,
        namespace: &str,
        name: &str,
        deployment_id: &str,
    ) -> Result<()> {
        info!("Setting agent {name} status to deployed with deployment id: {deployment_id}");
        self.patch_agent_status(
            namespace,
            name,
            json!({
                "phase": "Deployed",
                "deploymentId": deployment_id,
                "message": "Agent successfully deployed",
                "conditions": [condition(
                    "AgentDeployed",
                    "True",
                    "Scheduled",
                    format!("Agent successfully deployed with ID: {deployment_id}"),
                )],
            }),
        )
        .await
    }

    pub async fn set_failed(&self, namespace: &str, name: &str, error: &str) -> Result<()> {
        error!("Setting agent {name} status to failed: {error}");
        self.patch_agent_status(
            namespace,
            name,
            json!({
                "phase": "Failed",
                "message": format!("Agent deployment failed: {error}"),
                "error": error,
                "conditions": [condition(
                    "AgentFailed",
                    "True",
                    "DeploymentError",
                    format!("Agent {name} deployment failed: {error}"),
                )],
            }),
        )
        .await
    }

    /// Clear a recorded failure. Does nothing unless the agent currently
    /// carries a failed phase or an error.
    pub async fn clear_failed(&self, namespace: &str, name: &str) -> Result<()> {
        let current = self.current_status(namespace, name).await?;
        let failed = current.as_ref().is_some_and(|status| {
            status.phase.as_deref() == Some("Failed") || status.error.is_some()
        });
        if !failed {
            return Ok(());
        }

        info!("Clearing failed status for agent {name}");
        self.patch_agent_status(
            namespace,
            name,
            json!({
                "phase": "Deployed",
                "message": "Agent deployment recovered",
                "error": Value::Null,
            }),
        )
        .await
    }

    pub async fn set_kb_linked(&self, namespace: &str, name: &str, kb_name: &str) -> Result<()> {
        info!("Setting knowledge base {kb_name} as linked for agent {name}");
        self.patch_agent_status(
            namespace,
            name,
            json!({
                "knowledgeBase": {"name": kb_name, "status": "Linked"},
            }),
        )
        .await
    }

    pub async fn set_kb_error(&self, namespace: &str, name: &str, error: &str) -> Result<()> {
        error!("Setting knowledge base error for agent {name}: {error}");
        self.patch_agent_status(
            namespace,
            name,
            json!({
                "phase": "Failed",
                "knowledgeBase": {"status": "Error", "error": error},
                "message": format!("Knowledge base error: {error}"),
                "error": error,
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployed_status() -> AgentStatus {
        AgentStatus {
            phase: Some("Deployed".to_string()),
            deployment_id: Some("agent-a".to_string()),
            message: Some("Agent successfully deployed".to_string()),
            conditions: Some(vec![crate::crd::Condition {
                r#type: "AgentDeployed".to_string(),
                status: "True".to_string(),
                reason: "Scheduled".to_string(),
                message: "Agent successfully deployed with ID: agent-a".to_string(),
                last_transition_time: Some("2024-01-01T12:00:00+00:00".to_string()),
                last_update_time: Some("2024-01-01T12:00:00+00:00".to_string()),
            }]),
            ..AgentStatus::default()
        }
    }

    fn deployed_update() -> Value {
        json!({
            "phase": "Deployed",
            "deploymentId": "agent-a",
            "message": "Agent successfully deployed",
            "conditions": [condition(
                "AgentDeployed",
                "True",
                "Scheduled",
                "Agent successfully deployed with ID: agent-a".to_string(),
            )],
        })
    }

    #[test]
    fn missing_status_always_changes() {
        assert!(status_update_changes(None, &deployed_update()));
    }

    #[test]
    fn identical_update_is_a_no_op() {
        // Timestamps differ between current and update; they are ignored.
        assert!(!status_update_changes(
            Some(&deployed_status()),
            &deployed_update()
        ));
    }

    #[test]
    fn phase_change_is_observable() {
        let update = json!({"phase": "Failed"});
        assert!(status_update_changes(Some(&deployed_status()), &update));
    }

    #[test]
    fn deployment_id_change_is_observable() {
        let update = json!({"phase": "Deployed", "deploymentId": "agent-b"});
        assert!(status_update_changes(Some(&deployed_status()), &update));
    }

    #[test]
    fn null_error_matches_absent_error() {
        let update = json!({"error": null});
        assert!(!status_update_changes(Some(&deployed_status()), &update));
    }

    #[test]
    fn null_error_differs_from_recorded_error() {
        let mut current = deployed_status();
        current.error = Some("boom".to_string());
        let update = json!({"error": null});
        assert!(status_update_changes(Some(&current), &update));
    }

    #[test]
    fn condition_message_change_is_observable() {
        let update = json!({
            "conditions": [condition(
                "AgentDeployed",
                "True",
                "Scheduled",
                "Agent successfully deployed with ID: agent-b".to_string(),
            )],
        });
        assert!(status_update_changes(Some(&deployed_status()), &update));
    }
}
