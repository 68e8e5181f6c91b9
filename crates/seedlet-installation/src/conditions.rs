//! Condition bookkeeping for ControllerInstallations
//!
//! The controller owns two condition types. Only the conditions a pass
//! actually changed are written back, merged into the stored list by type,
//! so a condition written by another party (e.g. the care controller
//! propagating bundle health into `Installed`) is never overwritten with the
//! stale copy this pass started from.

use std::collections::BTreeMap;
use std::fmt;

use seedlet_common::crd::{Condition, ConditionStatus};

/// Registration was resolved and the chart rendered
pub const REASON_REGISTRATION_VALID: &str = "RegistrationValid";
/// Referenced ControllerRegistration does not exist
pub const REASON_REGISTRATION_NOT_FOUND: &str = "RegistrationNotFound";
/// Referenced ControllerRegistration could not be read
pub const REASON_REGISTRATION_READ_ERROR: &str = "RegistrationReadError";
/// Referenced Seed does not exist
pub const REASON_SEED_NOT_FOUND: &str = "SeedNotFound";
/// Referenced Seed could not be read
pub const REASON_SEED_READ_ERROR: &str = "SeedReadError";
/// Provider config of the ControllerDeployment does not decode
pub const REASON_CHART_INFORMATION_INVALID: &str = "ChartInformationInvalid";
/// Chart failed to render
pub const REASON_CHART_CANNOT_BE_RENDERED: &str = "ChartCannotBeRendered";
/// ManagedResource could not be written
pub const REASON_INSTALLATION_FAILED: &str = "InstallationFailed";
/// ManagedResource written, waiting for the resource manager
pub const REASON_INSTALLATION_PENDING: &str = "InstallationPending";
/// Teardown is waiting on an asynchronous delete
pub const REASON_DELETION_PENDING: &str = "DeletionPending";
/// A teardown delete call failed
pub const REASON_DELETION_FAILED: &str = "DeletionFailed";
/// Bundle and namespace are gone
pub const REASON_DELETION_SUCCESSFUL: &str = "DeletionSuccessful";

/// Condition types managed by this controller, in serialization order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConditionType {
    /// The installation's references resolve and its chart renders
    Valid,
    /// The rendered bundle is installed on the seed
    Installed,
}

impl ConditionType {
    /// All managed condition types, in serialization order
    pub const ALL: [ConditionType; 2] = [ConditionType::Valid, ConditionType::Installed];

    /// Wire name of the condition type
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Valid => "Valid",
            ConditionType::Installed => "Installed",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pending condition set of one reconcile pass
#[derive(Clone, Debug, PartialEq)]
pub struct InstallationConditions {
    conditions: BTreeMap<ConditionType, Condition>,
    /// Stored conditions the pass started from
    snapshot: BTreeMap<ConditionType, Condition>,
}

impl InstallationConditions {
    /// Take the stored conditions, initializing any managed type that is missing
    pub fn from_existing(existing: &[Condition]) -> Self {
        let snapshot: BTreeMap<_, _> = ConditionType::ALL
            .into_iter()
            .filter_map(|type_| {
                existing
                    .iter()
                    .find(|c| c.type_ == type_.as_str())
                    .map(|c| (type_, c.clone()))
            })
            .collect();
        let conditions = ConditionType::ALL
            .into_iter()
            .map(|type_| {
                let condition = snapshot
                    .get(&type_)
                    .cloned()
                    .unwrap_or_else(|| Condition::initialized(type_.as_str()));
                (type_, condition)
            })
            .collect();
        Self {
            conditions,
            snapshot,
        }
    }

    /// Reset every managed condition to the initialized state, keeping the
    /// transition time of conditions that were already Unknown
    pub fn reinitialized(existing: &[Condition]) -> Self {
        let mut conditions = Self::from_existing(existing);
        for condition in conditions.conditions.values_mut() {
            let init = Condition::initialized(condition.type_.clone());
            condition.update(init.status, init.reason, init.message);
        }
        conditions
    }

    /// Current condition of the given type
    pub fn get(&self, type_: ConditionType) -> &Condition {
        // Every managed type is inserted on construction
        &self.conditions[&type_]
    }

    /// Current status of the given type
    pub fn status(&self, type_: ConditionType) -> ConditionStatus {
        self.get(type_).status
    }

    /// Record a new assessment for the given type
    pub fn set(
        &mut self,
        type_: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
    ) {
        self.entry(type_).update(status, reason, message);
    }

    /// Append a note to the message of the given type without changing its
    /// status or reason
    pub fn append_message(&mut self, type_: ConditionType, note: &str) {
        let condition = self.entry(type_);
        if condition.message.is_empty() {
            condition.message = note.to_string();
        } else {
            condition.message = format!("{} {}", condition.message, note);
        }
    }

    /// Conditions in serialization order
    pub fn to_vec(&self) -> Vec<Condition> {
        self.conditions.values().cloned().collect()
    }

    /// Conditions that differ from the stored snapshot, in serialization
    /// order. Types missing from the snapshot always count as changed.
    pub fn changed(&self) -> Vec<Condition> {
        self.conditions
            .iter()
            .filter(|&(type_, condition)| self.snapshot.get(type_) != Some(condition))
            .map(|(_, condition)| condition.clone())
            .collect()
    }

    fn entry(&mut self, type_: ConditionType) -> &mut Condition {
        self.conditions
            .entry(type_)
            .or_insert_with(|| Condition::initialized(type_.as_str()))
    }
}

/// Merge `updates` into `existing` by condition type.
///
/// Conditions with a type present in `updates` are replaced in place; new
/// types are appended in the order given; all other conditions are kept.
pub fn merge_conditions(existing: &[Condition], updates: &[Condition]) -> Vec<Condition> {
    let mut merged = existing.to_vec();
    for update in updates {
        match merged.iter_mut().find(|c| c.type_ == update.type_) {
            Some(slot) => *slot = update.clone(),
            None => merged.push(update.clone()),
        }
    }
    merged
}
