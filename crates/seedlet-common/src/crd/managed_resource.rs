//! ManagedResource CRD
//!
//! A bundle of manifests, stored in secrets, that the seed's resource
//! manager applies and reports health for. This controller only writes the
//! spec; the status belongs to the resource manager.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::Condition;

/// Bundle of rendered manifests delivered to a seed.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "resources.seedlet.dev",
    version = "v1alpha1",
    kind = "ManagedResource",
    namespaced,
    status = "ManagedResourceStatus",
    printcolumn = r#"{"name":"Class","type":"string","jsonPath":".spec.class"}"#,
    printcolumn = r#"{"name":"Applied","type":"string","jsonPath":".status.conditions[?(@.type==\"ResourcesApplied\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResourceSpec {
    /// Secrets holding the manifests, in the same namespace
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_refs: Vec<LocalSecretRef>,

    /// Resource manager class responsible for applying the bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Leave applied objects behind when the bundle is deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_objects: Option<bool>,
}

/// Reference to a secret in the same namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct LocalSecretRef {
    /// Secret name
    pub name: String,
}

/// Health reported by the resource manager
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResourceStatus {
    /// Conditions such as ResourcesApplied and ResourcesHealthy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
