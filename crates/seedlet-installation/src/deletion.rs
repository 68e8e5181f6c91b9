//! Teardown of a ControllerInstallation's seed resources
//!
//! Deletes are asynchronous on the seed: an accepted delete only starts
//! deletion, and absence is confirmed by a later delete answering not-found.
//! The order is fixed:
//!
//! 1. ManagedResource (the resource manager removes the applied objects)
//! 2. bundle secret, best effort
//! 3. extension namespace
//! 4. finalizer, once both 1 and 3 are confirmed gone

use std::time::Duration;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{info, warn};

use seedlet_common::crd::{ConditionStatus, ControllerInstallation, CONTROLLER_INSTALLATION_FINALIZER};
use seedlet_common::kube_utils::{has_finalizer, DeleteOutcome};
use seedlet_common::Error;

use crate::bundle::namespace_name;
use crate::client::SeedClient;
use crate::conditions::{
    ConditionType, InstallationConditions, REASON_DELETION_FAILED, REASON_DELETION_PENDING,
    REASON_DELETION_SUCCESSFUL,
};
use crate::controller::{persist_conditions, Context};
use crate::resolver::resolve_seed;

/// Delay before re-checking an asynchronous delete
pub(crate) const DELETION_RECHECK: Duration = Duration::from_secs(30);

/// Result of a cleanup step whose failure must not block teardown
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Cleanup {
    /// The object is gone or its deletion was accepted
    Done,
    /// Deletion failed; carries a note for the condition message
    Failed(String),
}

impl Cleanup {
    /// Append the failure note, if any, to the `Installed` message
    fn record(&self, conditions: &mut InstallationConditions) {
        if let Cleanup::Failed(note) = self {
            conditions.append_message(ConditionType::Installed, note);
        }
    }
}

/// Tear down the seed resources of `installation`
pub(crate) async fn delete(
    installation: &ControllerInstallation,
    ctx: &Context,
) -> Result<Action, Error> {
    let name = installation.name_any();
    let mut conditions = InstallationConditions::reinitialized(installation.conditions());
    let result = teardown(installation, ctx, &mut conditions).await;
    persist_conditions(ctx, &name, &conditions, true).await;
    result
}

async fn teardown(
    installation: &ControllerInstallation,
    ctx: &Context,
    conditions: &mut InstallationConditions,
) -> Result<Action, Error> {
    let name = installation.name_any();

    resolve_seed(ctx.garden.as_ref(), &installation.spec.seed_ref.name, conditions).await?;

    match ctx.seed.delete_managed_resource(&name).await {
        Ok(DeleteOutcome::Requested) => {
            info!(managed_resource = %name, "deletion of ManagedResource is still pending");
            conditions.set(
                ConditionType::Installed,
                ConditionStatus::False,
                REASON_DELETION_PENDING,
                format!("Deletion of ManagedResource {name:?} is still pending."),
            );
            return Ok(Action::requeue(DELETION_RECHECK));
        }
        Ok(DeleteOutcome::AlreadyAbsent) => {}
        Err(e) => {
            conditions.set(
                ConditionType::Installed,
                ConditionStatus::False,
                REASON_DELETION_FAILED,
                format!("Deletion of ManagedResource {name:?} failed: {e}"),
            );
            return Err(e);
        }
    }

    let cleanup = delete_bundle_secret(ctx.seed.as_ref(), &name).await;

    let namespace = namespace_name(&name);
    let namespace_gone = delete_namespace(ctx.seed.as_ref(), &namespace, conditions).await;
    if let Ok(true) = namespace_gone {
        conditions.set(
            ConditionType::Installed,
            ConditionStatus::False,
            REASON_DELETION_SUCCESSFUL,
            "Deletion of old resources succeeded.",
        );
    }
    cleanup.record(conditions);

    if !namespace_gone? {
        return Ok(Action::requeue(DELETION_RECHECK));
    }

    if has_finalizer(&installation.metadata, CONTROLLER_INSTALLATION_FINALIZER) {
        info!("removing finalizer");
        ctx.garden.remove_finalizer(&name).await?;
    }

    Ok(Action::await_change())
}

async fn delete_bundle_secret(seed: &dyn SeedClient, name: &str) -> Cleanup {
    match seed.delete_secret(name).await {
        Ok(_) => Cleanup::Done,
        Err(e) => {
            warn!(secret = %name, error = %e, "failed to delete ManagedResource secret");
            Cleanup::Failed(format!("Deletion of ManagedResource secret {name:?} failed: {e}"))
        }
    }
}

/// Request namespace deletion. `Ok(true)` once the namespace is confirmed
/// absent; `Ok(false)` while deletion is in progress.
async fn delete_namespace(
    seed: &dyn SeedClient,
    namespace: &str,
    conditions: &mut InstallationConditions,
) -> Result<bool, Error> {
    match seed.delete_namespace(namespace).await {
        Ok(DeleteOutcome::AlreadyAbsent) => Ok(true),
        // A terminating namespace answers with a conflict
        Ok(DeleteOutcome::Requested) => {
            namespace_pending(namespace, conditions);
            Ok(false)
        }
        Err(e) if e.is_conflict() => {
            namespace_pending(namespace, conditions);
            Ok(false)
        }
        Err(e) => {
            conditions.set(
                ConditionType::Installed,
                ConditionStatus::False,
                REASON_DELETION_FAILED,
                format!("Deletion of Namespace {namespace:?} failed: {e}"),
            );
            Err(e)
        }
    }
}

fn namespace_pending(namespace: &str, conditions: &mut InstallationConditions) {
    info!(namespace = %namespace, "deletion of Namespace is still pending");
    conditions.set(
        ConditionType::Installed,
        ConditionStatus::False,
        REASON_DELETION_PENDING,
        format!("Deletion of Namespace {namespace:?} is still pending."),
    );
}
