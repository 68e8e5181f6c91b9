//! ControllerInstallation controller implementation
//!
//! Installs an extension's chart onto its seed. The flow for one pass:
//!
//! 1. Skip installations this controller is not responsible for (no
//!    ControllerDeployment, or one that is not of type `chart`).
//! 2. Branch on the deletion timestamp: teardown lives in [`crate::deletion`].
//! 3. Install: add the finalizer, resolve the registration and seed, decode
//!    the chart, ensure the extension namespace, render, and hand the result
//!    to the seed's resource manager as a ManagedResource.
//!
//! Every exit of the install and teardown paths persists the `Valid` and
//! `Installed` conditions, so a stuck installation can be diagnosed from its
//! status alone.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, instrument};

use seedlet_common::crd::{
    ConditionStatus, ControllerDeployment, ControllerInstallation,
    CONTROLLER_INSTALLATION_FINALIZER,
};
use seedlet_common::kube_utils::has_finalizer;
use seedlet_common::Error;

use crate::bundle::{namespace_labels, namespace_name, Bundle};
use crate::chart::{ArchiveRenderer, ChartRenderer, PackageDescriptor};
use crate::client::{GardenClient, GardenClientImpl, SeedClient, SeedClientImpl};
use crate::conditions::{
    ConditionType, InstallationConditions, REASON_CHART_CANNOT_BE_RENDERED,
    REASON_CHART_INFORMATION_INVALID, REASON_INSTALLATION_FAILED, REASON_INSTALLATION_PENDING,
    REASON_REGISTRATION_VALID,
};
use crate::deletion;
use crate::resolver::{resolve_registration, resolve_seed};
use crate::values::{injected_values, render_values, PlaneIdentity};

/// Requeue delay after a failed reconcile
const ERROR_REQUEUE: Duration = Duration::from_secs(5);

/// Controller context for ControllerInstallation reconciliation
///
/// Use [`ContextBuilder`] to construct instances:
///
/// ```text
/// let ctx = Context::builder(garden_client, seed_client)
///     .identity(identity)
///     .seed_name("aws-eu1")
///     .build();
/// ```
pub struct Context {
    /// Garden cluster access (trait object for testability)
    pub garden: Arc<dyn GardenClient>,
    /// Seed cluster access (trait object for testability)
    pub seed: Arc<dyn SeedClient>,
    /// Chart renderer
    pub renderer: Arc<dyn ChartRenderer>,
    /// Control plane identity injected into every chart
    pub identity: PlaneIdentity,
    /// When set, only installations targeting this seed are reconciled
    pub seed_name: Option<String>,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(garden: Client, seed: Client) -> ContextBuilder {
        ContextBuilder::new(garden, seed)
    }

    /// Create a context for testing with mock clients
    #[cfg(test)]
    pub fn for_testing(
        garden: Arc<dyn GardenClient>,
        seed: Arc<dyn SeedClient>,
        renderer: Arc<dyn ChartRenderer>,
        identity: PlaneIdentity,
    ) -> Self {
        Self {
            garden,
            seed,
            renderer,
            identity,
            seed_name: None,
        }
    }
}

/// Builder for constructing [`Context`] instances
pub struct ContextBuilder {
    garden: Client,
    seed: Client,
    renderer: Option<Arc<dyn ChartRenderer>>,
    identity: PlaneIdentity,
    seed_name: Option<String>,
}

impl ContextBuilder {
    fn new(garden: Client, seed: Client) -> Self {
        Self {
            garden,
            seed,
            renderer: None,
            identity: PlaneIdentity::default(),
            seed_name: None,
        }
    }

    /// Set the control plane identity injected into charts
    pub fn identity(mut self, identity: PlaneIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Only reconcile installations targeting `name`
    pub fn seed_name(mut self, name: impl Into<String>) -> Self {
        self.seed_name = Some(name.into());
        self
    }

    /// Override the chart renderer
    pub fn renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        Context {
            garden: Arc::new(GardenClientImpl::new(self.garden)),
            seed: Arc::new(SeedClientImpl::new(self.seed)),
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(ArchiveRenderer::new())),
            identity: self.identity,
            seed_name: self.seed_name,
        }
    }
}

/// Reconcile a ControllerInstallation
#[instrument(
    skip(installation, ctx),
    fields(installation = %installation.name_any())
)]
pub async fn reconcile(
    installation: Arc<ControllerInstallation>,
    ctx: Arc<Context>,
) -> Result<Action, Error> {
    if let Some(seed_name) = &ctx.seed_name {
        if installation.spec.seed_ref.name != *seed_name {
            debug!(seed = %installation.spec.seed_ref.name, "installation targets another seed");
            return Ok(Action::await_change());
        }
    }

    let Some(deployment) = responsible_deployment(ctx.garden.as_ref(), &installation).await? else {
        debug!("not a chart installation, skipping");
        return Ok(Action::await_change());
    };

    if installation.is_deleting() {
        deletion::delete(&installation, &ctx).await
    } else {
        install(&installation, &deployment, &ctx).await
    }
}

/// The ControllerDeployment of `installation` if it is of type `chart`.
///
/// `None` means another controller owns the installation. A deployment that
/// cannot be read, including one that does not exist, is an error.
pub async fn responsible_deployment(
    garden: &dyn GardenClient,
    installation: &ControllerInstallation,
) -> Result<Option<ControllerDeployment>, Error> {
    let Some(reference) = &installation.spec.deployment_ref else {
        return Ok(None);
    };
    let deployment = garden
        .get_deployment(&reference.name)
        .await?
        .ok_or_else(|| Error::not_found("ControllerDeployment", &reference.name))?;
    Ok(deployment.is_chart().then_some(deployment))
}

async fn install(
    installation: &ControllerInstallation,
    deployment: &ControllerDeployment,
    ctx: &Context,
) -> Result<Action, Error> {
    let name = installation.name_any();

    if !has_finalizer(&installation.metadata, CONTROLLER_INSTALLATION_FINALIZER) {
        info!("adding finalizer");
        ctx.garden.add_finalizer(&name).await?;
    }

    let mut conditions = InstallationConditions::from_existing(installation.conditions());
    let result = install_chart(installation, deployment, ctx, &mut conditions).await;
    persist_conditions(ctx, &name, &conditions, false).await;
    result
}

async fn install_chart(
    installation: &ControllerInstallation,
    deployment: &ControllerDeployment,
    ctx: &Context,
    conditions: &mut InstallationConditions,
) -> Result<Action, Error> {
    let name = installation.name_any();
    let spec = &installation.spec;

    let registration =
        resolve_registration(ctx.garden.as_ref(), &spec.registration_ref.name, conditions).await?;
    let seed = resolve_seed(ctx.garden.as_ref(), &spec.seed_ref.name, conditions).await?;

    let descriptor = match PackageDescriptor::from_provider_config(&deployment.spec.provider_config)
    {
        Ok(descriptor) => descriptor,
        Err(e) => {
            conditions.set(
                ConditionType::Valid,
                ConditionStatus::False,
                REASON_CHART_INFORMATION_INVALID,
                format!("Chart information cannot be decoded: {e}"),
            );
            return Err(e);
        }
    };

    let registration_name = registration.name_any();
    let namespace = namespace_name(&name);
    ctx.seed
        .ensure_namespace(&namespace, &namespace_labels(&registration_name))
        .await?;

    let values = render_values(descriptor.values(), injected_values(&seed, &ctx.identity)?);

    let release = match ctx.renderer.render_archive(
        &descriptor.chart,
        &registration_name,
        &namespace,
        &values,
    ) {
        Ok(release) => release,
        Err(e) => {
            conditions.set(
                ConditionType::Valid,
                ConditionStatus::False,
                REASON_CHART_CANNOT_BE_RENDERED,
                format!("Chart rendering process failed: {e}"),
            );
            return Err(e);
        }
    };
    conditions.set(
        ConditionType::Valid,
        ConditionStatus::True,
        REASON_REGISTRATION_VALID,
        "Chart could be rendered successfully.",
    );

    let bundle = Bundle::new(&name, &release);
    if let Err(e) = ctx.seed.apply_bundle(&bundle).await {
        conditions.set(
            ConditionType::Installed,
            ConditionStatus::False,
            REASON_INSTALLATION_FAILED,
            format!("Creation of ManagedResource {name:?} failed: {e}"),
        );
        return Err(e);
    }

    // The care controller takes over from here, propagating the bundle's
    // health into Installed
    if conditions.status(ConditionType::Installed) == ConditionStatus::Unknown {
        conditions.set(
            ConditionType::Installed,
            ConditionStatus::False,
            REASON_INSTALLATION_PENDING,
            format!("Installation of ManagedResource {name:?} is still pending."),
        );
    }

    info!(
        seed = %seed.name_any(),
        namespace = %namespace,
        manifests = release.manifests.len(),
        "extension chart applied"
    );
    Ok(Action::await_change())
}

/// Persist the conditions this pass changed, logging failures.
///
/// Conditions equal to the ones the pass started from are left out of the
/// patch, and nothing is written when none changed. With `ignore_not_found`,
/// an installation that has already been erased is not an error.
pub(crate) async fn persist_conditions(
    ctx: &Context,
    name: &str,
    conditions: &InstallationConditions,
    ignore_not_found: bool,
) {
    let changed = conditions.changed();
    if changed.is_empty() {
        debug!(installation = %name, "conditions unchanged, skipping status patch");
        return;
    }
    match ctx.garden.patch_conditions(name, &changed).await {
        Ok(()) => {}
        Err(e) if ignore_not_found && e.is_not_found() => {
            debug!(installation = %name, "installation gone, conditions not persisted");
        }
        Err(e) => {
            error!(installation = %name, error = %e, "failed to patch conditions");
        }
    }
}

/// Error policy for the controller
pub fn error_policy(
    installation: Arc<ControllerInstallation>,
    error: &Error,
    _ctx: Arc<Context>,
) -> Action {
    error!(
        ?error,
        installation = %installation.name_any(),
        "reconciliation failed"
    );
    Action::requeue(ERROR_REQUEUE)
}
