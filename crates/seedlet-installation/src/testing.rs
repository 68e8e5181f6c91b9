//! Shared fixtures for reconciler tests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use serde_json::json;

use seedlet_common::crd::{
    Condition, ConditionStatus, ControllerDeployment, ControllerDeploymentSpec,
    ControllerInstallation, ControllerInstallationSpec, ControllerRegistration,
    ControllerRegistrationSpec, ControllerResource, NamedRef, Seed, SeedNetworks, SeedProvider,
    SeedSpec, SeedStatus, CONTROLLER_INSTALLATION_FINALIZER, DEPLOYMENT_TYPE_CHART,
};
use seedlet_common::Error;

use crate::chart::{MockChartRenderer, RenderedRelease};
use crate::client::{MockGardenClient, MockSeedClient};
use crate::conditions::merge_conditions;
use crate::controller::Context;
use crate::values::PlaneIdentity;

pub const INSTALLATION: &str = "calico-aws-eu1";
pub const REGISTRATION: &str = "networking-calico";
pub const DEPLOYMENT: &str = "networking-calico-chart";
pub const SEED: &str = "aws-eu1";
pub const SEED_IDENTITY: &str = "aws-eu1-7f3a";
pub const GARDEN_IDENTITY: &str = "garden-prod";

pub fn context(
    garden: MockGardenClient,
    seed: MockSeedClient,
    renderer: MockChartRenderer,
) -> Arc<Context> {
    Arc::new(Context::for_testing(
        Arc::new(garden),
        Arc::new(seed),
        Arc::new(renderer),
        PlaneIdentity {
            version: "1.4.0".to_string(),
            garden_identity: "3f6c1b2a-uid".to_string(),
            garden_cluster_identity: GARDEN_IDENTITY.to_string(),
        },
    ))
}

pub fn installation() -> ControllerInstallation {
    ControllerInstallation::new(
        INSTALLATION,
        ControllerInstallationSpec {
            registration_ref: NamedRef::new(REGISTRATION),
            seed_ref: NamedRef::new(SEED),
            deployment_ref: Some(NamedRef::new(DEPLOYMENT)),
        },
    )
}

pub fn with_finalizer(mut installation: ControllerInstallation) -> ControllerInstallation {
    installation
        .metadata
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(CONTROLLER_INSTALLATION_FINALIZER.to_string());
    installation
}

pub fn marked_for_deletion(installation: ControllerInstallation) -> ControllerInstallation {
    let mut installation = with_finalizer(installation);
    installation.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
    installation
}

pub fn deployment_of_type(type_: &str) -> ControllerDeployment {
    ControllerDeployment::new(
        DEPLOYMENT,
        ControllerDeploymentSpec {
            type_: type_.to_string(),
            provider_config: json!({}),
        },
    )
}

pub fn chart_deployment() -> ControllerDeployment {
    let mut deployment = deployment_of_type(DEPLOYMENT_TYPE_CHART);
    deployment.spec.provider_config = json!({
        "chart": STANDARD.encode(b"chart-bytes"),
        "values": { "replicas": 1 },
    });
    deployment
}

pub fn registration() -> ControllerRegistration {
    ControllerRegistration::new(
        REGISTRATION,
        ControllerRegistrationSpec {
            resources: vec![ControllerResource {
                kind: "Network".to_string(),
                type_: "calico".to_string(),
                primary: Some(true),
            }],
        },
    )
}

pub fn seed(cluster_identity: Option<&str>) -> Seed {
    let mut seed = Seed::new(
        SEED,
        SeedSpec {
            provider: SeedProvider {
                type_: "aws".to_string(),
                region: "eu-west-1".to_string(),
            },
            networks: SeedNetworks {
                nodes: None,
                pods: "100.96.0.0/11".to_string(),
                services: "100.64.0.0/13".to_string(),
                block_cidrs: Vec::new(),
            },
            ..Default::default()
        },
    );
    seed.status = Some(SeedStatus {
        cluster_identity: cluster_identity.map(str::to_string),
    });
    seed
}

pub fn rendered(release: &str, namespace: &str) -> RenderedRelease {
    RenderedRelease {
        name: release.to_string(),
        namespace: namespace.to_string(),
        manifests: BTreeMap::from([(
            "calico/templates/daemonset.yaml".to_string(),
            "kind: DaemonSet\n".to_string(),
        )]),
    }
}

fn api_error(code: u16, reason: &str, message: &str) -> Error {
    Error::from(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: reason.to_string(),
        code,
    }))
}

pub fn server_error() -> Error {
    api_error(500, "InternalError", "etcdserver: request timed out")
}

pub fn conflict_error() -> Error {
    api_error(
        409,
        "Conflict",
        "Operation cannot be fulfilled on namespaces \"extension-calico-aws-eu1\": The system is ensuring all content is removed from this namespace.",
    )
}

/// Records every condition patch and merges it into the stored status the
/// way the API server would
#[derive(Clone, Default)]
pub struct ConditionRecorder {
    stored: Arc<Mutex<Vec<Condition>>>,
    patches: Arc<Mutex<Vec<Vec<Condition>>>>,
}

impl ConditionRecorder {
    /// A recorder whose server-side status starts out as `conditions`
    pub fn with_stored(conditions: Vec<Condition>) -> Self {
        Self {
            stored: Arc::new(Mutex::new(conditions)),
            ..Default::default()
        }
    }

    pub fn attach(&self, garden: &mut MockGardenClient) {
        let stored = self.stored.clone();
        let patches = self.patches.clone();
        garden
            .expect_patch_conditions()
            .returning(move |_, conditions| {
                patches.lock().unwrap().push(conditions.to_vec());
                let mut stored = stored.lock().unwrap();
                *stored = merge_conditions(&stored, conditions);
                Ok(())
            });
    }

    /// The stored status, asserting at least one patch was sent
    pub fn last(&self) -> Vec<Condition> {
        assert!(
            !self.patches.lock().unwrap().is_empty(),
            "no condition patch recorded"
        );
        self.stored()
    }

    /// The stored status, whether or not anything was patched
    pub fn stored(&self) -> Vec<Condition> {
        self.stored.lock().unwrap().clone()
    }

    /// Every patch body sent, in order
    pub fn patches(&self) -> Vec<Vec<Condition>> {
        self.patches.lock().unwrap().clone()
    }
}

/// A garden where every referenced object exists and is valid
pub fn healthy_garden(recorder: &ConditionRecorder) -> MockGardenClient {
    let mut garden = MockGardenClient::new();
    garden
        .expect_get_deployment()
        .returning(|_| Ok(Some(chart_deployment())));
    garden
        .expect_get_registration()
        .returning(|_| Ok(Some(registration())));
    garden
        .expect_get_seed()
        .returning(|_| Ok(Some(seed(Some(SEED_IDENTITY)))));
    recorder.attach(&mut garden);
    garden
}

pub fn find<'a>(conditions: &'a [Condition], type_: &str) -> &'a Condition {
    conditions
        .iter()
        .find(|c| c.type_ == type_)
        .unwrap_or_else(|| panic!("condition {type_} missing from {conditions:?}"))
}

pub fn assert_condition(
    conditions: &[Condition],
    type_: &str,
    status: ConditionStatus,
    reason: &str,
) {
    let condition = find(conditions, type_);
    assert_eq!(condition.status, status, "{type_} status: {condition:?}");
    assert_eq!(condition.reason, reason, "{type_} reason: {condition:?}");
}

/// Type, status, and reason of each condition, ignoring timestamps
pub fn summarize(conditions: &[Condition]) -> Vec<(String, ConditionStatus, String)> {
    conditions
        .iter()
        .map(|c| (c.type_.clone(), c.status, c.reason.clone()))
        .collect()
}
