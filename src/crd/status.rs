//! # AkamaiAgent Status
//!
//! Status subresource types written by the reconcile engine through the
//! status reporter.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of the AkamaiAgent resource
///
/// Patched with merge semantics; the reporter stamps `lastUpdated` on every
/// write.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    /// Current phase: `Deployed` or `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Identifier of the backing workload created by the deployment backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    /// Human-readable description of the current state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Last deployment error, cleared on recovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Knowledge-base link status for agents with knowledgeBase tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<KnowledgeBaseStatus>,
    /// Timestamp of the last status write (RFC 3339, UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Conditions represent the latest available observations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

/// Knowledge-base sub-status on an agent
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseStatus {
    /// Name of the linked knowledge base
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `Linked` or `Error`
    pub status: String,
    /// Error detail when status is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Reason for the condition
    pub reason: String,
    /// Message describing the condition
    pub message: String,
    /// Last transition time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    /// Last update time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
}
