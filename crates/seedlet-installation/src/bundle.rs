//! Objects derived from a ControllerInstallation on its seed
//!
//! Everything here is named from the installation alone, so teardown can
//! address the objects without re-rendering anything.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use seedlet_common::crd::{LocalSecretRef, ManagedResource, ManagedResourceSpec};
use seedlet_common::{
    LABEL_REGISTRATION_NAME, LABEL_ROLE, ROLE_EXTENSION, SEEDLET_SYSTEM_NAMESPACE,
    SEED_RESOURCE_CLASS,
};

use crate::chart::RenderedRelease;

const NAMESPACE_PREFIX: &str = "extension-";

/// Namespace hosting the extension controller of an installation
pub fn namespace_name(installation: &str) -> String {
    format!("{NAMESPACE_PREFIX}{installation}")
}

/// Labels reconciled onto the extension namespace
pub fn namespace_labels(registration: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_ROLE.to_string(), ROLE_EXTENSION.to_string()),
        (LABEL_REGISTRATION_NAME.to_string(), registration.to_string()),
    ])
}

/// A rendered release packaged for the seed's resource manager: the secret
/// holding the manifests and the ManagedResource pointing at it
#[derive(Clone, Debug)]
pub struct Bundle {
    /// Secret carrying the rendered manifests
    pub secret: Secret,
    /// Bundle record referencing the secret
    pub managed_resource: ManagedResource,
}

impl Bundle {
    /// Package `release` for the installation named `installation`
    pub fn new(installation: &str, release: &RenderedRelease) -> Self {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(installation.to_string()),
                namespace: Some(SEEDLET_SYSTEM_NAMESPACE.to_string()),
                ..Default::default()
            },
            type_: Some("Opaque".to_string()),
            data: Some(
                release
                    .as_secret_data()
                    .into_iter()
                    .map(|(k, v)| (k, k8s_openapi::ByteString(v)))
                    .collect(),
            ),
            ..Default::default()
        };

        let mut managed_resource = ManagedResource::new(
            installation,
            ManagedResourceSpec {
                secret_refs: vec![LocalSecretRef {
                    name: installation.to_string(),
                }],
                class: Some(SEED_RESOURCE_CLASS.to_string()),
                keep_objects: Some(false),
            },
        );
        managed_resource.metadata.namespace = Some(SEEDLET_SYSTEM_NAMESPACE.to_string());

        Self {
            secret,
            managed_resource,
        }
    }

    /// Name shared by the secret and the ManagedResource
    pub fn name(&self) -> &str {
        self.managed_resource
            .metadata
            .name
            .as_deref()
            .unwrap_or_default()
    }
}
