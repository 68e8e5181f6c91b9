//! Values injected into every extension chart
//!
//! Charts receive the extension author's values plus a reserved `seedlet`
//! block describing the garden and the target seed. The reserved block is
//! merged last so an extension cannot override it.

use kube::ResourceExt;
use serde_json::{json, Value};

use seedlet_common::crd::Seed;
use seedlet_common::Error;

/// Top-level values key reserved for injected values
pub const INJECTED_VALUES_KEY: &str = "seedlet";

/// Identity of the control plane, gathered once at startup
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaneIdentity {
    /// Operator version
    pub version: String,
    /// UID of the garden's system namespace (deprecated, use
    /// `garden_cluster_identity`)
    pub garden_identity: String,
    /// Cluster identity of the garden
    pub garden_cluster_identity: String,
}

/// Build the reserved values block for `seed`.
///
/// Fails if the seed has no cluster identity yet; such a seed has not
/// finished bootstrapping.
pub fn injected_values(seed: &Seed, identity: &PlaneIdentity) -> Result<Value, Error> {
    let seed_name = seed.name_any();
    let cluster_identity = seed.cluster_identity().ok_or_else(|| {
        Error::precondition(format!("cluster-identity of seed '{seed_name}' not set"))
    })?;

    let spec = serde_json::to_value(&seed.spec)
        .map_err(|e| Error::serialization_for_kind("Seed", e.to_string()))?;
    let volume_providers = seed
        .spec
        .volume
        .as_ref()
        .map(|v| v.providers.as_slice())
        .unwrap_or_default();

    Ok(json!({
        INJECTED_VALUES_KEY: {
            "version": identity.version,
            "garden": {
                "identity": identity.garden_identity,
                "clusterIdentity": identity.garden_cluster_identity,
            },
            "seed": {
                "identity": seed_name,
                "clusterIdentity": cluster_identity,
                "annotations": seed.metadata.annotations,
                "labels": seed.metadata.labels,
                "provider": seed.spec.provider.type_,
                "region": seed.spec.provider.region,
                "volumeProvider": seed.default_volume_provider().unwrap_or_default(),
                "volumeProviders": volume_providers,
                "ingressDomain": seed.ingress_domain(),
                "protected": seed.is_protected(),
                "visible": seed.is_visible(),
                "taints": seed.spec.taints,
                "networks": seed.spec.networks,
                "blockCIDRs": seed.spec.networks.block_cidrs,
                "spec": spec,
            },
        }
    }))
}

/// Deep-merge `overlay` into `base`.
///
/// Objects are merged key by key; any other value in `overlay` replaces the
/// one in `base`.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Values handed to the renderer: the author's values with the injected
/// block merged over them
pub fn render_values(supplied: Value, injected: Value) -> Value {
    let mut values = supplied;
    merge_values(&mut values, injected);
    values
}
