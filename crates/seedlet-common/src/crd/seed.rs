//! Seed CRD
//!
//! A Seed describes a member cluster that hosts extension controllers.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::SEED_TAINT_PROTECTED;

/// Target cluster descriptor.
///
/// Example:
/// ```yaml
/// apiVersion: core.seedlet.dev/v1beta1
/// kind: Seed
/// metadata:
///   name: aws-eu1
/// spec:
///   provider:
///     type: aws
///     region: eu-west-1
///   ingress:
///     domain: ingress.aws-eu1.example.com
///   networks:
///     pods: 100.96.0.0/11
///     services: 100.64.0.0/13
/// status:
///   clusterIdentity: aws-eu1-7f3a
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.seedlet.dev",
    version = "v1beta1",
    kind = "Seed",
    status = "SeedStatus",
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.provider.type"}"#,
    printcolumn = r#"{"name":"Region","type":"string","jsonPath":".spec.provider.region"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SeedSpec {
    /// Infrastructure provider of the seed cluster
    pub provider: SeedProvider,

    /// DNS settings
    #[serde(default)]
    pub dns: SeedDns,

    /// Ingress settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<SeedIngress>,

    /// Taints restricting what may be placed on the seed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<SeedTaint>,

    /// Behavioral settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SeedSettings>,

    /// Network ranges of the seed cluster
    pub networks: SeedNetworks,

    /// Volume settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<SeedVolume>,
}

/// Provider type and region
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedProvider {
    /// Provider type (e.g., aws, gcp)
    #[serde(rename = "type")]
    pub type_: String,

    /// Region the seed runs in
    pub region: String,
}

/// DNS settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedDns {
    /// Ingress domain. Deprecated, but takes precedence over
    /// `spec.ingress.domain` while it is still set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_domain: Option<String>,
}

/// Ingress settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedIngress {
    /// Base domain for ingresses on the seed
    pub domain: String,
}

/// A seed taint
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedTaint {
    /// Taint key
    pub key: String,

    /// Optional taint value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Seed settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedSettings {
    /// Scheduling settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<SeedSchedulingSettings>,
}

/// Scheduling settings
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedSchedulingSettings {
    /// Whether the seed is considered by the scheduler
    pub visible: bool,
}

/// Network ranges
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedNetworks {
    /// Node CIDR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,

    /// Pod CIDR
    pub pods: String,

    /// Service CIDR
    pub services: String,

    /// CIDRs that workloads on the seed must not reach
    #[serde(rename = "blockCIDRs", default, skip_serializing_if = "Vec::is_empty")]
    pub block_cidrs: Vec<String>,
}

/// Volume settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedVolume {
    /// Volume providers, the first one being the default
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<SeedVolumeProvider>,
}

/// A volume provider
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedVolumeProvider {
    /// What the provider is used for (e.g., etcd-main)
    pub purpose: String,

    /// Provider name (e.g., a storage class)
    pub name: String,
}

/// Observed state of a Seed
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedStatus {
    /// Unique identity of the seed cluster, populated once the seed is
    /// bootstrapped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_identity: Option<String>,
}

impl Seed {
    /// Cluster identity, if the seed has been bootstrapped
    pub fn cluster_identity(&self) -> Option<&str> {
        self.status.as_ref()?.cluster_identity.as_deref()
    }

    /// Ingress domain. The legacy `spec.dns.ingressDomain` wins while set,
    /// otherwise `spec.ingress.domain` is used.
    pub fn ingress_domain(&self) -> Option<&str> {
        self.spec.dns.ingress_domain.as_deref().or_else(|| {
            self.spec
                .ingress
                .as_ref()
                .map(|i| i.domain.as_str())
        })
    }

    /// Whether the seed carries the protected taint
    pub fn is_protected(&self) -> bool {
        self.spec.taints.iter().any(|t| t.key == SEED_TAINT_PROTECTED)
    }

    /// Whether the seed is visible to scheduling. Seeds without explicit
    /// scheduling settings are visible.
    pub fn is_visible(&self) -> bool {
        self.spec
            .settings
            .as_ref()
            .and_then(|s| s.scheduling.as_ref())
            .is_none_or(|s| s.visible)
    }

    /// Name of the first configured volume provider
    pub fn default_volume_provider(&self) -> Option<&str> {
        self.spec
            .volume
            .as_ref()?
            .providers
            .first()
            .map(|p| p.name.as_str())
    }
}
