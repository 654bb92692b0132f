//! # Cluster Gateway
//!
//! Thin typed facade over the cluster API for custom objects, core objects
//! (services, configmaps, secrets), and deployments.
//!
//! Not-found (404) on reads and deletes is reported as absence; all other
//! cluster errors surface as [`OperatorError::External`] carrying the HTTP
//! status. One shared [`Client`] backs every call.

use crate::constants;
use crate::error::Result;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::core::GroupVersionKind;
use kube::Client;
use serde_json::Value;

/// Coordinates of a namespaced custom resource kind
#[derive(Debug, Clone, Copy)]
pub struct CustomResourceKind {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
}

/// The watched agent resource
pub const AGENT_RESOURCE: CustomResourceKind = CustomResourceKind {
    group: constants::API_GROUP,
    version: constants::API_VERSION,
    kind: "AkamaiAgent",
    plural: constants::AGENT_PLURAL,
};

/// The watched knowledge-base resource
pub const KNOWLEDGE_BASE_RESOURCE: CustomResourceKind = CustomResourceKind {
    group: constants::API_GROUP,
    version: constants::API_VERSION,
    kind: "AkamaiKnowledgeBase",
    plural: constants::KNOWLEDGE_BASE_PLURAL,
};

/// Argo CD Application, managed by the GitOps backend
pub const ARGO_APPLICATION_RESOURCE: CustomResourceKind = CustomResourceKind {
    group: constants::ARGOCD_GROUP,
    version: constants::ARGOCD_VERSION,
    kind: constants::ARGOCD_APPLICATION_KIND,
    plural: constants::ARGOCD_APPLICATION_PLURAL,
};

fn dynamic_api(client: &Client, kind: &CustomResourceKind, namespace: &str) -> Api<DynamicObject> {
    let gvk = GroupVersionKind {
        group: kind.group.to_string(),
        version: kind.version.to_string(),
        kind: kind.kind.to_string(),
    };
    let resource = ApiResource::from_gvk_with_plural(&gvk, kind.plural);
    Api::namespaced_with(client.clone(), namespace, &resource)
}

/// Create a namespaced custom object from its JSON representation.
pub async fn create_custom_object(
    client: &Client,
    kind: &CustomResourceKind,
    namespace: &str,
    body: Value,
) -> Result<DynamicObject> {
    let object: DynamicObject = serde_json::from_value(body)?;
    let api = dynamic_api(client, kind, namespace);
    Ok(api.create(&PostParams::default(), &object).await?)
}

/// Get a namespaced custom object; 404 is reported as `None`.
pub async fn get_custom_object(
    client: &Client,
    kind: &CustomResourceKind,
    namespace: &str,
    name: &str,
) -> Result<Option<DynamicObject>> {
    let api = dynamic_api(client, kind, namespace);
    Ok(api.get_opt(name).await?)
}

/// Merge-patch a namespaced custom object.
pub async fn patch_custom_object(
    client: &Client,
    kind: &CustomResourceKind,
    namespace: &str,
    name: &str,
    body: Value,
) -> Result<DynamicObject> {
    let api = dynamic_api(client, kind, namespace);
    let params = PatchParams::apply(constants::FIELD_MANAGER);
    Ok(api.patch(name, &params, &Patch::Merge(&body)).await?)
}

/// Delete a namespaced custom object; a missing object is a no-op.
pub async fn delete_custom_object(
    client: &Client,
    kind: &CustomResourceKind,
    namespace: &str,
    name: &str,
) -> Result<()> {
    let api = dynamic_api(client, kind, namespace);
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(response)) if response.code == 404 => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Merge-patch the status subresource of a namespaced custom object.
pub async fn patch_custom_object_status(
    client: &Client,
    kind: &CustomResourceKind,
    namespace: &str,
    name: &str,
    status: Value,
) -> Result<()> {
    let api = dynamic_api(client, kind, namespace);
    let params = PatchParams::apply(constants::FIELD_MANAGER);
    api.patch_status(name, &params, &Patch::Merge(&serde_json::json!({ "status": status })))
        .await?;
    Ok(())
}

/// List services across all namespaces by label selector.
pub async fn list_services(client: &Client, label_selector: &str) -> Result<Vec<Service>> {
    let api: Api<Service> = Api::all(client.clone());
    let params = ListParams::default().labels(label_selector);
    Ok(api.list(&params).await?.items)
}

/// Read a ConfigMap; 404 is reported as `None`.
pub async fn get_config_map(client: &Client, name: &str, namespace: &str) -> Result<Option<ConfigMap>> {
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    Ok(api.get_opt(name).await?)
}

/// Read a Secret; 404 is reported as `None`.
pub async fn get_secret(client: &Client, name: &str, namespace: &str) -> Result<Option<Secret>> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    Ok(api.get_opt(name).await?)
}

/// Read a Deployment; 404 is reported as `None`.
pub async fn get_deployment(client: &Client, name: &str, namespace: &str) -> Result<Option<Deployment>> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    Ok(api.get_opt(name).await?)
}
