//! ControllerInstallation controller for Seedlet
//!
//! Installs extension controllers onto seeds:
//! - Resolves the installation's ControllerRegistration, ControllerDeployment and Seed
//! - Renders the deployment's chart with garden and seed values injected
//! - Hands the manifests to the seed's resource manager as a ManagedResource
//! - Tears the bundle and extension namespace down before releasing the finalizer
//!
//! Progress is reported through the `Valid` and `Installed` conditions on the
//! installation's status.

#![deny(missing_docs)]

pub mod bundle;
pub mod chart;
pub mod client;
pub mod conditions;
mod controller;
mod deletion;
pub mod resolver;
pub mod trigger;
pub mod values;

#[cfg(test)]
mod testing;

pub use chart::{ArchiveRenderer, ChartRenderer, PackageDescriptor, RenderedRelease};
pub use client::{GardenClient, GardenClientImpl, SeedClient, SeedClientImpl};
pub use controller::{error_policy, reconcile, responsible_deployment, Context, ContextBuilder};
pub use trigger::trigger_key;
pub use values::PlaneIdentity;
