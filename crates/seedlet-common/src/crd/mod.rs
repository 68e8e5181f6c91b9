//! Custom Resource Definitions for Seedlet
//!
//! Garden-side resources live in `core.seedlet.dev`; the bundle record
//! applied on seeds lives in `resources.seedlet.dev`.

mod deployment;
mod installation;
mod managed_resource;
mod registration;
mod seed;
mod types;

pub use deployment::{ControllerDeployment, ControllerDeploymentSpec, DEPLOYMENT_TYPE_CHART};
pub use installation::{
    ControllerInstallation, ControllerInstallationSpec, ControllerInstallationStatus,
    CONTROLLER_INSTALLATION_FINALIZER,
};
pub use managed_resource::{
    LocalSecretRef, ManagedResource, ManagedResourceSpec, ManagedResourceStatus,
};
pub use registration::{ControllerRegistration, ControllerRegistrationSpec, ControllerResource};
pub use seed::{
    Seed, SeedDns, SeedIngress, SeedNetworks, SeedProvider, SeedSchedulingSettings, SeedSettings,
    SeedSpec, SeedStatus, SeedTaint, SeedVolume, SeedVolumeProvider,
};
pub use types::{Condition, ConditionStatus, NamedRef, REASON_CONDITION_INITIALIZED};

/// All CRDs served by the garden and seed clusters, for `--crd` output
pub fn all_crds() -> Vec<k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition>
{
    use kube::CustomResourceExt;

    vec![
        ControllerInstallation::crd(),
        ControllerRegistration::crd(),
        ControllerDeployment::crd(),
        Seed::crd(),
        ManagedResource::crd(),
    ]
}
