//! # Chart Rendering
//!
//! Helm values construction and local chart templating for agent
//! deployments.

use crate::error::{OperatorError, Result};
use crate::model::{AgentConfig, AgentData};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

/// Build the Helm values for an agent chart deployment.
///
/// The agent config is embedded as a pretty-printed JSON string under
/// `agentConfig`; the agent name doubles as the chart's `nameOverride`.
pub fn chart_values(agent_data: &AgentData) -> Result<Value> {
    let agent_config = AgentConfig::from_agent_data(agent_data);
    let rendered = serde_json::to_string_pretty(&agent_config)?;
    Ok(json!({
        "nameOverride": agent_data.name,
        "agentConfig": rendered,
    }))
}

/// Render the agent chart into `<manifest_root>/<agent_name>` and return the
/// output directory.
pub async fn template_agent_chart(
    agent_name: &str,
    namespace: &str,
    values: &Value,
    chart_path: &str,
    manifest_root: &Path,
) -> Result<PathBuf> {
    let release_name = format!("agent-{agent_name}");

    let mut values_file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    serde_yaml::to_writer(values_file.as_file_mut(), values)?;

    let output_dir = manifest_root.join(agent_name);
    tokio::fs::create_dir_all(&output_dir).await?;

    // helm needs a writable HOME for its cache directories
    let output = Command::new("helm")
        .arg("template")
        .arg(&release_name)
        .arg(chart_path)
        .arg("--values")
        .arg(values_file.path())
        .arg("--namespace")
        .arg(namespace)
        .arg("--output-dir")
        .arg(&output_dir)
        .env("HOME", "/tmp")
        .output()
        .await?;

    if !output.status.success() {
        return Err(OperatorError::Subprocess {
            command: format!("helm template {release_name}"),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    info!(
        "Successfully templated chart for agent {agent_name} to {}",
        output_dir.display()
    );
    Ok(output_dir)
}
