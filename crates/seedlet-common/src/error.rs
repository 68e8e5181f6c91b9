//! Error types for the Seedlet operator
//!
//! Errors are structured with fields to aid debugging in production.
//! Variants carry the resource kind and name involved so that condition
//! messages and logs can be read without cross-referencing.

use thiserror::Error;

/// Main error type for Seedlet operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A referenced object does not exist
    #[error("{kind} {name:?} not found")]
    NotFound {
        /// Kind of the missing object (e.g., "Seed")
        kind: String,
        /// Name of the missing object
        name: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Chart rendering failed
    #[error("render error for release {release}: {message}")]
    Render {
        /// Release name the chart was rendered for
        release: String,
        /// Description of what failed
        message: String,
    },

    /// A precondition outside of this controller's control is not met
    #[error("precondition failed: {message}")]
    Precondition {
        /// Description of the unmet precondition
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "reconciler", "create_client")
        context: String,
    },
}

impl Error {
    /// Create a not-found error for the given kind and name
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a render error for a release
    pub fn render(release: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Render {
            release: release.into(),
            message: msg.into(),
        }
    }

    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Whether this error means the addressed object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube { source } => is_api_status(source, 404),
            _ => false,
        }
    }

    /// Whether this error is an API conflict (409), e.g. a namespace that is
    /// already terminating or a stale resourceVersion
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Kube { source } => is_api_status(source, 409),
            _ => false,
        }
    }
}

fn is_api_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16, reason: &str) -> Error {
        Error::from(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{reason} for test"),
            reason: reason.to_string(),
            code,
        }))
    }

    /// Story: A missing dependency reads as "not found" whether it was
    /// detected by us or reported by the API server
    #[test]
    fn story_not_found_is_detected_from_both_sources() {
        let ours = Error::not_found("Seed", "aws-eu1");
        assert!(ours.is_not_found());
        assert_eq!(ours.to_string(), "Seed \"aws-eu1\" not found");

        let api = api_error(404, "NotFound");
        assert!(api.is_not_found());
        assert!(!api.is_conflict());
    }

    /// Story: A terminating namespace answers deletes with 409 Conflict,
    /// which teardown treats as "still pending"
    #[test]
    fn story_conflict_is_distinguishable() {
        let err = api_error(409, "Conflict");
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn other_failures_are_neither_missing_nor_conflicting() {
        for err in [
            api_error(403, "Forbidden"),
            api_error(500, "InternalError"),
            Error::render("ext", "unknown filter"),
            Error::precondition("cluster identity unset"),
        ] {
            assert!(!err.is_not_found(), "{err}");
            assert!(!err.is_conflict(), "{err}");
        }
    }

    #[test]
    fn error_messages_carry_context() {
        let err = Error::render("networking-calico", "template not found");
        assert!(err.to_string().contains("networking-calico"));

        let err = Error::internal_with_context("create_client", "failed to infer config");
        assert_eq!(
            err.to_string(),
            "internal error [create_client]: failed to infer config"
        );

        let err = Error::serialization_for_kind("ControllerDeployment", "missing field `chart`");
        match err {
            Error::Serialization { kind, .. } => {
                assert_eq!(kind.as_deref(), Some("ControllerDeployment"))
            }
            other => panic!("expected Serialization, got {other:?}"),
        }
    }
}
