//! ControllerRegistration CRD
//!
//! Names an extension and the resource kinds it serves. Read-only for the
//! installation controller.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Registration of an extension controller.
///
/// Example:
/// ```yaml
/// apiVersion: core.seedlet.dev/v1beta1
/// kind: ControllerRegistration
/// metadata:
///   name: networking-calico
/// spec:
///   resources:
///     - kind: Network
///       type: calico
///       primary: true
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.seedlet.dev",
    version = "v1beta1",
    kind = "ControllerRegistration",
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ControllerRegistrationSpec {
    /// Extension resources served by this controller
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ControllerResource>,
}

/// One extension resource kind/type pair
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ControllerResource {
    /// Extension kind (e.g., Network, Infrastructure)
    pub kind: String,

    /// Provider type within the kind
    #[serde(rename = "type")]
    pub type_: String,

    /// Whether this controller is the primary owner of the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_yaml() {
        let yaml = r#"
apiVersion: core.seedlet.dev/v1beta1
kind: ControllerRegistration
metadata:
  name: networking-calico
spec:
  resources:
    - kind: Network
      type: calico
      primary: true
"#;
        let registration: ControllerRegistration = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(registration.spec.resources.len(), 1);
        assert_eq!(registration.spec.resources[0].type_, "calico");
        assert_eq!(registration.spec.resources[0].primary, Some(true));
    }
}
