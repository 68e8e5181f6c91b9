//! Controller runner - builds the ControllerInstallation controller future

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::{reflector, watcher, Controller, WatchStreamExt};
use kube::{Api, Client};

use seedlet_common::crd::ControllerInstallation;
use seedlet_installation::{error_policy, reconcile, trigger_key, Context, PlaneIdentity};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Build the ControllerInstallation controller future.
///
/// Watch events are filtered through [`trigger_key`], so status-only
/// updates do not start a pass.
pub fn build_installation_controller(
    garden: Client,
    seed: Client,
    identity: PlaneIdentity,
    seed_name: Option<String>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let mut ctx_builder = Context::builder(garden.clone(), seed).identity(identity);
    if let Some(name) = seed_name {
        tracing::info!(seed = %name, "Reconciling installations for a single seed");
        ctx_builder = ctx_builder.seed_name(name);
    }
    let ctx = Arc::new(ctx_builder.build());
    let installations: Api<ControllerInstallation> = Api::all(garden);

    tracing::info!("- ControllerInstallation controller");

    let (reader, writer) = reflector::store();
    let triggers = watcher(
        installations,
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    )
    .default_backoff()
    .reflect(writer)
    .applied_objects()
    .predicate_filter(trigger_key);

    Box::pin(
        Controller::for_stream(triggers, reader)
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_reconcile_result("ControllerInstallation")),
    )
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
