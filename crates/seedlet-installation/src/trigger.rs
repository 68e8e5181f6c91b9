//! Watch event filtering for ControllerInstallations
//!
//! Status writes (our own condition patches and the care controller's
//! health reports) bump the resourceVersion of an installation without
//! changing anything a pass depends on. The watch stream is filtered on a
//! hash of the inputs that do matter, so those writes do not trigger a new
//! pass.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use kube::ResourceExt;

use seedlet_common::crd::{ControllerInstallation, NamedRef};

/// Hash of the fields whose change should trigger a reconcile.
///
/// Covers the whole deployment reference and the resourceVersions pinned on
/// the registration and seed references. An installation being deleted
/// hashes its own resourceVersion as well, so every update during teardown
/// passes the filter.
pub fn trigger_key(installation: &ControllerInstallation) -> Option<u64> {
    let spec = &installation.spec;
    let mut hasher = DefaultHasher::new();

    spec.deployment_ref.as_ref().map(reference_parts).hash(&mut hasher);
    spec.registration_ref.resource_version.hash(&mut hasher);
    spec.seed_ref.resource_version.hash(&mut hasher);

    if installation.is_deleting() {
        true.hash(&mut hasher);
        installation.resource_version().hash(&mut hasher);
    }

    Some(hasher.finish())
}

fn reference_parts(reference: &NamedRef) -> (&str, Option<&str>) {
    (reference.name.as_str(), reference.resource_version.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{installation, marked_for_deletion};
    use seedlet_common::crd::{Condition, ConditionStatus, ControllerInstallationStatus};

    fn with_resource_version(
        mut installation: ControllerInstallation,
        rv: &str,
    ) -> ControllerInstallation {
        installation.metadata.resource_version = Some(rv.to_string());
        installation
    }

    /// Story: A status patch alone does not start another pass
    #[test]
    fn story_status_writes_are_filtered() {
        let before = with_resource_version(installation(), "100");
        let mut after = with_resource_version(installation(), "101");
        after.status = Some(ControllerInstallationStatus {
            conditions: vec![Condition::new(
                "Installed",
                ConditionStatus::True,
                "InstallationSuccessful",
                "bundle applied",
            )],
        });
        after.metadata.labels = Some([("team".to_string(), "net".to_string())].into());

        assert_eq!(trigger_key(&before), trigger_key(&after));
    }

    /// Story: Pointing the installation at another deployment triggers a
    /// pass, as does a new revision of the one it already uses
    #[test]
    fn story_deployment_ref_changes_pass() {
        let base = installation();
        let original = trigger_key(&base);

        let mut renamed = base.clone();
        if let Some(reference) = renamed.spec.deployment_ref.as_mut() {
            reference.name = "networking-calico-oci".to_string();
        }
        assert_ne!(trigger_key(&renamed), original);

        let mut revised = base.clone();
        if let Some(reference) = revised.spec.deployment_ref.as_mut() {
            reference.resource_version = Some("7".to_string());
        }
        assert_ne!(trigger_key(&revised), original);

        let mut removed = base;
        removed.spec.deployment_ref = None;
        assert_ne!(trigger_key(&removed), original);
    }

    #[test]
    fn pinned_reference_versions_pass() {
        let base = installation();

        let mut registration = base.clone();
        registration.spec.registration_ref.resource_version = Some("42".to_string());
        assert_ne!(trigger_key(&registration), trigger_key(&base));

        let mut seed = base.clone();
        seed.spec.seed_ref.resource_version = Some("43".to_string());
        assert_ne!(trigger_key(&seed), trigger_key(&base));
    }

    /// Story: Once deletion starts, every update of the installation is
    /// delivered until the finalizer is gone
    #[test]
    fn story_deleting_installations_always_pass() {
        let live = with_resource_version(installation(), "100");
        let deleting = with_resource_version(marked_for_deletion(installation()), "101");
        assert_ne!(trigger_key(&live), trigger_key(&deleting));

        let mut status_only = with_resource_version(marked_for_deletion(installation()), "102");
        status_only.status = Some(ControllerInstallationStatus::default());
        assert_ne!(trigger_key(&deleting), trigger_key(&status_only));
    }
}
