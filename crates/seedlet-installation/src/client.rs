//! Cluster access for the installation controller
//!
//! The garden cluster holds the installation and everything it references;
//! the seed cluster receives the extension namespace and bundle. Both sides
//! are traits so the reconciler can be tested against mocks.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use seedlet_common::crd::{
    Condition, ControllerDeployment, ControllerInstallation, ControllerRegistration,
    ManagedResource, Seed, CONTROLLER_INSTALLATION_FINALIZER,
};
use seedlet_common::kube_utils::{
    delete_outcome, finalizers_with, finalizers_without, get_optional, DeleteOutcome,
};
use seedlet_common::retry::{retry_with_backoff_if, RetryConfig};
use seedlet_common::{Error, FIELD_MANAGER, SEEDLET_SYSTEM_NAMESPACE};

use crate::bundle::Bundle;
use crate::conditions::merge_conditions;

/// Attempts for writes guarded by a resourceVersion precondition
const OPTIMISTIC_WRITE_ATTEMPTS: u32 = 5;

/// Operations against the garden cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GardenClient: Send + Sync {
    /// Get a ControllerRegistration by name, `None` if it does not exist
    async fn get_registration(&self, name: &str) -> Result<Option<ControllerRegistration>, Error>;

    /// Get a ControllerDeployment by name, `None` if it does not exist
    async fn get_deployment(&self, name: &str) -> Result<Option<ControllerDeployment>, Error>;

    /// Get a Seed by name, `None` if it does not exist
    async fn get_seed(&self, name: &str) -> Result<Option<Seed>, Error>;

    /// Add the controller's finalizer to a ControllerInstallation
    async fn add_finalizer(&self, name: &str) -> Result<(), Error>;

    /// Remove the controller's finalizer from a ControllerInstallation
    async fn remove_finalizer(&self, name: &str) -> Result<(), Error>;

    /// Merge `conditions` by type into the installation's status.
    ///
    /// Conditions of other types are left untouched. Returns a not-found
    /// error if the installation no longer exists.
    async fn patch_conditions(&self, name: &str, conditions: &[Condition]) -> Result<(), Error>;
}

/// Operations against the seed cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SeedClient: Send + Sync {
    /// Create the namespace, or merge `labels` into an existing one
    async fn ensure_namespace(
        &self,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), Error>;

    /// Create or update the bundle's secret and ManagedResource
    async fn apply_bundle(&self, bundle: &Bundle) -> Result<(), Error>;

    /// Request deletion of the ManagedResource in the system namespace
    async fn delete_managed_resource(&self, name: &str) -> Result<DeleteOutcome, Error>;

    /// Request deletion of the bundle secret in the system namespace
    async fn delete_secret(&self, name: &str) -> Result<DeleteOutcome, Error>;

    /// Request deletion of a namespace. A namespace that is already
    /// terminating answers with a conflict error.
    async fn delete_namespace(&self, name: &str) -> Result<DeleteOutcome, Error>;
}

/// Garden client backed by kube-rs
pub struct GardenClientImpl {
    client: Client,
}

impl GardenClientImpl {
    /// Create a new GardenClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn installations(&self) -> Api<ControllerInstallation> {
        Api::all(self.client.clone())
    }

    async fn get_installation(
        api: &Api<ControllerInstallation>,
        name: &str,
    ) -> Result<ControllerInstallation, Error> {
        get_optional(api.get(name).await)?
            .ok_or_else(|| Error::not_found("ControllerInstallation", name))
    }

    /// Patch the finalizer list computed by `update`, guarded by the
    /// resourceVersion it was computed from
    async fn patch_finalizers<F>(&self, name: &str, update: F) -> Result<(), Error>
    where
        F: Fn(&ObjectMeta) -> Option<Vec<String>> + Send + Sync,
    {
        let api = self.installations();
        let api = &api;
        let update = &update;
        retry_with_backoff_if(
            &RetryConfig::with_max_attempts(OPTIMISTIC_WRITE_ATTEMPTS),
            "patch_finalizers",
            Error::is_conflict,
            || async move {
                let installation = Self::get_installation(api, name).await?;
                let Some(finalizers) = update(&installation.metadata) else {
                    return Ok(());
                };
                let patch = serde_json::json!({
                    "metadata": {
                        "resourceVersion": installation.resource_version(),
                        "finalizers": finalizers,
                    }
                });
                api.patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
                    .await?;
                Ok(())
            },
        )
        .await
    }
}

#[async_trait]
impl GardenClient for GardenClientImpl {
    async fn get_registration(&self, name: &str) -> Result<Option<ControllerRegistration>, Error> {
        let api: Api<ControllerRegistration> = Api::all(self.client.clone());
        get_optional(api.get(name).await)
    }

    async fn get_deployment(&self, name: &str) -> Result<Option<ControllerDeployment>, Error> {
        let api: Api<ControllerDeployment> = Api::all(self.client.clone());
        get_optional(api.get(name).await)
    }

    async fn get_seed(&self, name: &str) -> Result<Option<Seed>, Error> {
        let api: Api<Seed> = Api::all(self.client.clone());
        get_optional(api.get(name).await)
    }

    async fn add_finalizer(&self, name: &str) -> Result<(), Error> {
        self.patch_finalizers(name, |meta| {
            finalizers_with(meta, CONTROLLER_INSTALLATION_FINALIZER)
        })
        .await
    }

    async fn remove_finalizer(&self, name: &str) -> Result<(), Error> {
        self.patch_finalizers(name, |meta| {
            finalizers_without(meta, CONTROLLER_INSTALLATION_FINALIZER)
        })
        .await
    }

    async fn patch_conditions(&self, name: &str, conditions: &[Condition]) -> Result<(), Error> {
        let api = self.installations();
        let api = &api;
        retry_with_backoff_if(
            &RetryConfig::with_max_attempts(OPTIMISTIC_WRITE_ATTEMPTS),
            "patch_conditions",
            Error::is_conflict,
            || async move {
                let installation = Self::get_installation(api, name).await?;
                let merged = merge_conditions(installation.conditions(), conditions);
                let patch = serde_json::json!({
                    "metadata": {
                        "resourceVersion": installation.resource_version(),
                    },
                    "status": {
                        "conditions": merged,
                    }
                });
                api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
                    .await?;
                Ok(())
            },
        )
        .await
    }
}

/// Seed client backed by kube-rs
pub struct SeedClientImpl {
    client: Client,
}

impl SeedClientImpl {
    /// Create a new SeedClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SeedClient for SeedClientImpl {
    async fn ensure_namespace(
        &self,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());

        if let Some(existing) = get_optional(api.get(name).await)? {
            let current = existing.labels();
            if labels.iter().all(|(k, v)| current.get(k) == Some(v)) {
                debug!(namespace = %name, "namespace labels up to date");
                return Ok(());
            }
        } else {
            let ns = Namespace {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    labels: Some(labels.clone()),
                    ..Default::default()
                },
                ..Default::default()
            };
            match api.create(&PostParams::default(), &ns).await {
                Ok(_) => {
                    info!(namespace = %name, "created extension namespace");
                    return Ok(());
                }
                // Lost a create race; fall through to the label patch
                Err(kube::Error::Api(ae)) if ae.code == 409 => {}
                Err(e) => return Err(e.into()),
            }
        }

        let patch = serde_json::json!({
            "metadata": {
                "labels": labels,
            }
        });
        api.patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await?;
        info!(namespace = %name, "patched extension namespace labels");
        Ok(())
    }

    async fn apply_bundle(&self, bundle: &Bundle) -> Result<(), Error> {
        let params = PatchParams::apply(FIELD_MANAGER).force();
        let name = bundle.name();

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), SEEDLET_SYSTEM_NAMESPACE);
        secrets
            .patch(name, &params, &Patch::Apply(&bundle.secret))
            .await?;

        let managed_resources: Api<ManagedResource> =
            Api::namespaced(self.client.clone(), SEEDLET_SYSTEM_NAMESPACE);
        managed_resources
            .patch(name, &params, &Patch::Apply(&bundle.managed_resource))
            .await?;

        info!(
            managed_resource = %name,
            namespace = %SEEDLET_SYSTEM_NAMESPACE,
            "applied bundle"
        );
        Ok(())
    }

    async fn delete_managed_resource(&self, name: &str) -> Result<DeleteOutcome, Error> {
        let api: Api<ManagedResource> =
            Api::namespaced(self.client.clone(), SEEDLET_SYSTEM_NAMESPACE);
        delete_outcome(api.delete(name, &DeleteParams::background()).await)
    }

    async fn delete_secret(&self, name: &str) -> Result<DeleteOutcome, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), SEEDLET_SYSTEM_NAMESPACE);
        delete_outcome(api.delete(name, &DeleteParams::background()).await)
    }

    async fn delete_namespace(&self, name: &str) -> Result<DeleteOutcome, Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        delete_outcome(api.delete(name, &DeleteParams::default()).await)
    }
}
