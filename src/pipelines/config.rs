//! # Pipeline Source Configuration
//!
//! Loads pipeline source configurations from the `pipelines` ConfigMap and
//! resolves their auth secrets into a process-wide snapshot.
//!
//! The snapshot is written only by the config refresh loop and read by the
//! pipeline sync loop; entries are replaced whole, so a reader never sees a
//! partially resolved value. Entries that fail to parse or resolve keep
//! their previous snapshot value until the ConfigMap key itself disappears.

use crate::constants;
use crate::error::Result;
use crate::k8s;
use k8s_openapi::api::core::v1::Secret;
use kube::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Authentication scheme for a pipeline source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineSourceAuth {
    #[default]
    None,
    Basic,
    Bearer,
}

/// Pipeline source configuration as used within the operator.
///
/// `auth_token` is always present when `auth_type` is not `None`; entries
/// without a resolvable token never enter the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSourceConfig {
    pub url: String,
    pub version: Option<String>,
    pub auth_type: PipelineSourceAuth,
    pub auth_token: Option<String>,
}

/// Pipeline source configuration as stored in the ConfigMap.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StoredPipelineSourceConfig {
    pub url: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub auth_type: PipelineSourceAuth,
    #[serde(default)]
    pub auth_secret_name: Option<String>,
    #[serde(default)]
    pub auth_secret_key: Option<String>,
}

/// The active configuration snapshot, keyed by source name
pub type PipelineConfigMap = BTreeMap<String, PipelineSourceConfig>;

/// Join stored configurations with their secrets.
///
/// Entries that reference a missing secret or secret key are dropped from
/// the result (and logged); the caller preserves any previous snapshot value
/// for them.
fn resolve_entries(
    stored: &BTreeMap<String, StoredPipelineSourceConfig>,
    secrets: &BTreeMap<String, BTreeMap<String, String>>,
) -> PipelineConfigMap {
    let mut resolved = PipelineConfigMap::new();
    for (name, config) in stored {
        if config.auth_type == PipelineSourceAuth::None {
            resolved.insert(
                name.clone(),
                PipelineSourceConfig {
                    url: config.url.clone(),
                    version: config.version.clone(),
                    auth_type: config.auth_type,
                    auth_token: None,
                },
            );
            continue;
        }

        let (Some(secret_name), Some(secret_key)) =
            (&config.auth_secret_name, &config.auth_secret_key)
        else {
            error!(
                "Pipeline configuration '{name}' is configured to use authentication, \
                 but secret was not provided or is not available."
            );
            continue;
        };
        let Some(secret) = secrets.get(secret_name) else {
            error!("Secret '{secret_name}' not available for config '{name}'.");
            continue;
        };
        let Some(secret_value) = secret.get(secret_key) else {
            error!("Secret key '{secret_key}' not found in '{secret_name}' for config '{name}'.");
            continue;
        };
        resolved.insert(
            name.clone(),
            PipelineSourceConfig {
                url: config.url.clone(),
                version: config.version.clone(),
                auth_type: config.auth_type,
                auth_token: Some(secret_value.clone()),
            },
        );
    }
    resolved
}

/// Fold freshly resolved entries into the snapshot and evict names no longer
/// present in the ConfigMap.
fn apply_refresh(
    current: &mut PipelineConfigMap,
    loaded_names: &BTreeSet<String>,
    resolved: PipelineConfigMap,
) {
    for (name, config) in resolved {
        current.insert(name, config);
    }
    current.retain(|name, _| loaded_names.contains(name));
}

/// Extract UTF-8 secret data; values arrive base64-decoded from the API
/// machinery.
fn secret_data(secret: Secret) -> BTreeMap<String, String> {
    secret
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match String::from_utf8(value.0) {
            Ok(decoded) => Some((key, decoded)),
            Err(_) => {
                warn!("Secret key '{key}' does not contain valid UTF-8 data, skipping.");
                None
            }
        })
        .collect()
}

/// Loads pipeline source configurations from a ConfigMap.
pub struct PipelineConfigLoader {
    client: Client,
    namespace: String,
    current: RwLock<PipelineConfigMap>,
    loaded: AtomicBool,
}

impl PipelineConfigLoader {
    pub fn new(client: Client) -> Self {
        let namespace = std::env::var("NAMESPACE")
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| constants::DEFAULT_CONFIG_NAMESPACE.to_string());
        Self {
            client,
            namespace,
            current: RwLock::new(PipelineConfigMap::new()),
            loaded: AtomicBool::new(false),
        }
    }

    /// Refresh the snapshot from the ConfigMap in the cluster.
    pub async fn refresh(&self) -> Result<()> {
        let data = match k8s::get_config_map(&self.client, constants::CONFIG_MAP_NAME, &self.namespace)
            .await?
        {
            Some(config_map) => config_map.data.unwrap_or_default(),
            None => {
                info!("No pipeline configuration set.");
                BTreeMap::new()
            }
        };
        info!(
            "Processing {} pipeline source configurations.",
            data.len()
        );

        let mut stored = BTreeMap::new();
        for (name, raw) in &data {
            match serde_json::from_str::<StoredPipelineSourceConfig>(raw) {
                Ok(config) => {
                    stored.insert(name.clone(), config);
                }
                Err(err) => {
                    error!("Invalid pipeline configuration for '{name}': {err}");
                }
            }
        }

        let secrets = self.load_secrets(&stored).await;
        let resolved = resolve_entries(&stored, &secrets);
        let loaded_names: BTreeSet<String> = data.keys().cloned().collect();

        let mut current = self.current.write().await;
        apply_refresh(&mut current, &loaded_names, resolved);
        drop(current);

        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    /// Read each referenced secret once. Missing or unreadable secrets are
    /// handled during entry resolution.
    async fn load_secrets(
        &self,
        stored: &BTreeMap<String, StoredPipelineSourceConfig>,
    ) -> BTreeMap<String, BTreeMap<String, String>> {
        let secret_names: BTreeSet<&String> = stored
            .values()
            .filter(|config| config.auth_type != PipelineSourceAuth::None)
            .filter_map(|config| config.auth_secret_name.as_ref())
            .collect();

        let mut secrets = BTreeMap::new();
        for secret_name in secret_names {
            match k8s::get_secret(&self.client, secret_name, &self.namespace).await {
                Ok(Some(secret)) => {
                    secrets.insert(secret_name.clone(), secret_data(secret));
                }
                Ok(None) => {}
                Err(err) => {
                    error!("Failed to read secret '{secret_name}': {err}");
                }
            }
        }
        secrets
    }

    /// Clone of the active snapshot.
    pub async fn snapshot(&self) -> PipelineConfigMap {
        self.current.read().await.clone()
    }

    /// Whether a first refresh has completed.
    pub fn has_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }
}
