//! Supporting types shared by Seedlet CRDs

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition status following Kubernetes conventions
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., Valid, Installed)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Last time the condition's status changed
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

/// Reason carried by a condition that has not been evaluated yet
pub const REASON_CONDITION_INITIALIZED: &str = "ConditionInitialized";

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// Create an `Unknown` condition that has not been evaluated yet
    pub fn initialized(type_: impl Into<String>) -> Self {
        Self::new(
            type_,
            ConditionStatus::Unknown,
            REASON_CONDITION_INITIALIZED,
            "The condition has been initialized but its semantic check has not been performed yet.",
        )
    }

    /// Record a new assessment. The transition time only moves when the
    /// status actually changes.
    pub fn update(
        &mut self,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        if self.status != status {
            self.last_transition_time = Utc::now();
        }
        self.status = status;
        self.reason = reason.into();
        self.message = message.into();
    }
}

/// Reference to another object by name
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NamedRef {
    /// Name of the referenced object
    pub name: String,

    /// resourceVersion of the referenced object when the reference was last
    /// written; changes here re-trigger reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl NamedRef {
    /// Reference an object by name only
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_version: None,
        }
    }
}

/// Schema for opaque JSON blobs embedded in CRDs
pub(crate) fn preserve_unknown_fields(
    _: &mut schemars::gen::SchemaGenerator,
) -> schemars::schema::Schema {
    use schemars::schema::{InstanceType, Schema, SchemaObject};

    Schema::Object(SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        extensions: [(
            "x-kubernetes-preserve-unknown-fields".to_string(),
            serde_json::Value::Bool(true),
        )]
        .into_iter()
        .collect(),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: Conditions start out Unknown before the controller has looked
    #[test]
    fn story_initialized_condition_is_unknown() {
        let condition = Condition::initialized("Valid");
        assert_eq!(condition.type_, "Valid");
        assert_eq!(condition.status, ConditionStatus::Unknown);
        assert_eq!(condition.reason, REASON_CONDITION_INITIALIZED);
        assert_eq!(ConditionStatus::default(), ConditionStatus::Unknown);
    }

    /// Story: Re-asserting the same status keeps the original transition time
    #[test]
    fn story_transition_time_moves_only_on_status_change() {
        let mut condition = Condition::initialized("Installed");
        let initial = condition.last_transition_time;

        condition.update(ConditionStatus::Unknown, "StillUnknown", "nothing changed");
        assert_eq!(condition.last_transition_time, initial);
        assert_eq!(condition.reason, "StillUnknown");

        condition.last_transition_time = initial - chrono::Duration::seconds(60);
        let backdated = condition.last_transition_time;
        condition.update(ConditionStatus::False, "InstallationPending", "pending");
        assert!(condition.last_transition_time > backdated);
        assert_eq!(condition.status, ConditionStatus::False);
    }

    #[test]
    fn condition_serializes_with_kubernetes_field_names() {
        let condition = Condition::new("Valid", ConditionStatus::True, "RegistrationValid", "ok");
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["type"], "Valid");
        assert_eq!(json["status"], "True");
        assert!(json.get("lastTransitionTime").is_some());

        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, condition);
    }

    #[test]
    fn named_ref_omits_empty_resource_version() {
        let json = serde_json::to_value(NamedRef::new("calico")).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "calico" }));
    }
}
