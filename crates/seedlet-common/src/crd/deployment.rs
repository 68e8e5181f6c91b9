//! ControllerDeployment CRD
//!
//! Describes how a registered extension is deployed. The `type` field picks
//! the controller responsible; `providerConfig` is opaque to everyone but
//! that controller.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Deployment type handled by the chart-based installation controller
pub const DEPLOYMENT_TYPE_CHART: &str = "chart";

/// Deployment method for an extension.
///
/// Example:
/// ```yaml
/// apiVersion: core.seedlet.dev/v1beta1
/// kind: ControllerDeployment
/// metadata:
///   name: networking-calico
/// spec:
///   type: chart
///   providerConfig:
///     chart: H4sIAAAA...
///     values:
///       replicas: 2
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.seedlet.dev",
    version = "v1beta1",
    kind = "ControllerDeployment",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ControllerDeploymentSpec {
    /// Deployment type discriminator
    #[serde(rename = "type")]
    pub type_: String,

    /// Type-specific configuration
    #[serde(default)]
    #[schemars(schema_with = "super::types::preserve_unknown_fields")]
    pub provider_config: serde_json::Value,
}

impl ControllerDeployment {
    /// Whether this deployment is of the chart type
    pub fn is_chart(&self) -> bool {
        self.spec.type_ == DEPLOYMENT_TYPE_CHART
    }
}
