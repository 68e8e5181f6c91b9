//! ControllerInstallation CRD
//!
//! A ControllerInstallation requests that the extension described by a
//! ControllerRegistration be deployed onto one seed, using the method
//! described by a ControllerDeployment.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, NamedRef};

/// Finalizer held on every ControllerInstallation this controller has seen
pub const CONTROLLER_INSTALLATION_FINALIZER: &str = "core.seedlet.dev/controllerinstallation";

/// Desired placement of an extension on a seed.
///
/// Example:
/// ```yaml
/// apiVersion: core.seedlet.dev/v1beta1
/// kind: ControllerInstallation
/// metadata:
///   name: networking-calico-aws-eu1
/// spec:
///   registrationRef:
///     name: networking-calico
///   seedRef:
///     name: aws-eu1
///   deploymentRef:
///     name: networking-calico
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.seedlet.dev",
    version = "v1beta1",
    kind = "ControllerInstallation",
    status = "ControllerInstallationStatus",
    printcolumn = r#"{"name":"Registration","type":"string","jsonPath":".spec.registrationRef.name"}"#,
    printcolumn = r#"{"name":"Seed","type":"string","jsonPath":".spec.seedRef.name"}"#,
    printcolumn = r#"{"name":"Valid","type":"string","jsonPath":".status.conditions[?(@.type==\"Valid\")].status"}"#,
    printcolumn = r#"{"name":"Installed","type":"string","jsonPath":".status.conditions[?(@.type==\"Installed\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ControllerInstallationSpec {
    /// Registration describing the extension
    pub registration_ref: NamedRef,

    /// Seed the extension is installed onto
    pub seed_ref: NamedRef,

    /// How the extension is deployed; installations without one belong to
    /// other controllers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_ref: Option<NamedRef>,
}

/// Observed state of a ControllerInstallation
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControllerInstallationStatus {
    /// Conditions, at most one per type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ControllerInstallation {
    /// Whether deletion has been requested
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Current conditions, empty if no status has been written yet
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ConditionStatus;

    #[test]
    fn installation_yaml() {
        let yaml = r#"
apiVersion: core.seedlet.dev/v1beta1
kind: ControllerInstallation
metadata:
  name: networking-calico-aws-eu1
spec:
  registrationRef:
    name: networking-calico
    resourceVersion: "42"
  seedRef:
    name: aws-eu1
  deploymentRef:
    name: networking-calico
status:
  conditions:
    - type: Valid
      status: "True"
      reason: RegistrationValid
      message: Chart could be rendered successfully.
      lastTransitionTime: "2024-05-01T10:00:00Z"
"#;
        let installation: ControllerInstallation = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(installation.spec.registration_ref.name, "networking-calico");
        assert_eq!(
            installation.spec.registration_ref.resource_version.as_deref(),
            Some("42")
        );
        assert_eq!(installation.spec.seed_ref.name, "aws-eu1");
        assert_eq!(
            installation.spec.deployment_ref.as_ref().map(|r| r.name.as_str()),
            Some("networking-calico")
        );
        assert!(!installation.is_deleting());
    }

    #[test]
    fn conditions_accessor_handles_missing_status() {
        let mut installation = ControllerInstallation::new("ext", Default::default());
        assert!(installation.conditions().is_empty());

        installation.status = Some(ControllerInstallationStatus {
            conditions: vec![Condition::initialized("Installed")],
        });
        assert_eq!(installation.conditions().len(), 1);
        assert_eq!(installation.conditions()[0].status, ConditionStatus::Unknown);
    }

    #[test]
    fn deletion_timestamp_marks_deleting() {
        let mut installation = ControllerInstallation::new("ext", Default::default());
        installation.metadata.deletion_timestamp = Some(
            k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(chrono::Utc::now()),
        );
        assert!(installation.is_deleting());
    }
}
