//! Common types for Seedlet: CRDs, errors, and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;
pub mod retry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace for Seedlet system resources, on both garden and seed clusters
pub const SEEDLET_SYSTEM_NAMESPACE: &str = "seedlet-system";

/// Field manager used for all writes made by the controller
pub const FIELD_MANAGER: &str = "seedlet-controller";

/// Label key carrying the role of a namespace on the seed
pub const LABEL_ROLE: &str = "seedlet.dev/role";

/// Role value for namespaces hosting extension controllers
pub const ROLE_EXTENSION: &str = "extension";

/// Label key naming the ControllerRegistration an extension namespace belongs to
pub const LABEL_REGISTRATION_NAME: &str = "registration.core.seedlet.dev/name";

/// Seed taint marking a seed as protected
pub const SEED_TAINT_PROTECTED: &str = "seed.seedlet.dev/protected";

/// ManagedResource class handled by the seed's resource manager
pub const SEED_RESOURCE_CLASS: &str = "seed";
