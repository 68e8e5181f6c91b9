//! Control plane identity discovery
//!
//! Gathered once at startup and injected into every rendered chart.

use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
use kube::{Api, Client};

use seedlet_common::kube_utils::get_optional;
use seedlet_common::{Error, SEEDLET_SYSTEM_NAMESPACE};
use seedlet_installation::PlaneIdentity;

/// Namespace holding the cluster identity ConfigMap
pub const CLUSTER_IDENTITY_NAMESPACE: &str = "kube-system";
/// Name of the cluster identity ConfigMap, also its data key
pub const CLUSTER_IDENTITY: &str = "cluster-identity";

/// Discover the identity of the garden `client` points at.
///
/// An explicit `cluster_identity` wins over the garden's `cluster-identity`
/// ConfigMap.
pub async fn discover(client: &Client, cluster_identity: Option<String>) -> Result<PlaneIdentity, Error> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let system = get_optional(namespaces.get(SEEDLET_SYSTEM_NAMESPACE).await)?
        .ok_or_else(|| Error::not_found("Namespace", SEEDLET_SYSTEM_NAMESPACE))?;
    let garden_identity = system.metadata.uid.unwrap_or_default();

    let garden_cluster_identity = match cluster_identity {
        Some(identity) => identity,
        None => {
            let config_maps: Api<ConfigMap> =
                Api::namespaced(client.clone(), CLUSTER_IDENTITY_NAMESPACE);
            let config_map = get_optional(config_maps.get(CLUSTER_IDENTITY).await)?;
            config_map
                .as_ref()
                .and_then(cluster_identity_from)
                .ok_or_else(|| {
                    Error::precondition(format!(
                        "garden cluster identity not set: pass --garden-cluster-identity or create ConfigMap {CLUSTER_IDENTITY_NAMESPACE}/{CLUSTER_IDENTITY}"
                    ))
                })?
        }
    };

    Ok(PlaneIdentity {
        version: env!("CARGO_PKG_VERSION").to_string(),
        garden_identity,
        garden_cluster_identity,
    })
}

/// Non-empty cluster identity stored in `config_map`
pub fn cluster_identity_from(config_map: &ConfigMap) -> Option<String> {
    config_map
        .data
        .as_ref()?
        .get(CLUSTER_IDENTITY)
        .filter(|identity| !identity.is_empty())
        .cloned()
}
