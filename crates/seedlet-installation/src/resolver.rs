//! Resolution of objects referenced by a ControllerInstallation
//!
//! Every read is classified onto the `Valid` condition: a missing object
//! sets it `False`, an object that cannot be read sets it `Unknown`. Either
//! way the error is returned so the dispatcher retries.

use seedlet_common::crd::{ConditionStatus, ControllerRegistration, Seed};
use seedlet_common::Error;

use crate::client::GardenClient;
use crate::conditions::{
    ConditionType, InstallationConditions, REASON_REGISTRATION_NOT_FOUND,
    REASON_REGISTRATION_READ_ERROR, REASON_SEED_NOT_FOUND, REASON_SEED_READ_ERROR,
};

/// An object an installation depends on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dependency {
    /// The ControllerRegistration in `spec.registrationRef`
    Registration,
    /// The Seed in `spec.seedRef`
    Seed,
}

impl Dependency {
    /// Kind of the referenced object
    pub fn kind(&self) -> &'static str {
        match self {
            Dependency::Registration => "ControllerRegistration",
            Dependency::Seed => "Seed",
        }
    }

    fn not_found_reason(&self) -> &'static str {
        match self {
            Dependency::Registration => REASON_REGISTRATION_NOT_FOUND,
            Dependency::Seed => REASON_SEED_NOT_FOUND,
        }
    }

    fn read_error_reason(&self) -> &'static str {
        match self {
            Dependency::Registration => REASON_REGISTRATION_READ_ERROR,
            Dependency::Seed => REASON_SEED_READ_ERROR,
        }
    }
}

/// Classify the outcome of reading `dependency` named `name`.
///
/// On failure the `Valid` condition records why and the error is returned.
pub fn classify<T>(
    dependency: Dependency,
    name: &str,
    read: Result<Option<T>, Error>,
    conditions: &mut InstallationConditions,
) -> Result<T, Error> {
    let err = match read {
        Ok(Some(obj)) => return Ok(obj),
        Ok(None) => Error::not_found(dependency.kind(), name),
        Err(e) => e,
    };

    if err.is_not_found() {
        conditions.set(
            ConditionType::Valid,
            ConditionStatus::False,
            dependency.not_found_reason(),
            format!("Referenced {} does not exist: {}", dependency.kind(), err),
        );
    } else {
        conditions.set(
            ConditionType::Valid,
            ConditionStatus::Unknown,
            dependency.read_error_reason(),
            format!("Referenced {} cannot be read: {}", dependency.kind(), err),
        );
    }
    Err(err)
}

/// Read and classify the ControllerRegistration `name`
pub async fn resolve_registration(
    garden: &dyn GardenClient,
    name: &str,
    conditions: &mut InstallationConditions,
) -> Result<ControllerRegistration, Error> {
    let read = garden.get_registration(name).await;
    classify(Dependency::Registration, name, read, conditions)
}

/// Read and classify the Seed `name`
pub async fn resolve_seed(
    garden: &dyn GardenClient,
    name: &str,
    conditions: &mut InstallationConditions,
) -> Result<Seed, Error> {
    let read = garden.get_seed(name).await;
    classify(Dependency::Seed, name, read, conditions)
}
