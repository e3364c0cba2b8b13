//! Reconciliation of upstream check results against local descriptors and
//! the AUR index
//!
//! Pure decision logic: given the set of packages nvchecker flagged, the
//! parsed local descriptors, and what the AUR currently publishes, produce
//! the ordered list of update tasks. This function never fails; packages it
//! cannot act on are logged and dropped.

use crate::domain::descriptor::{AurPackageInfo, PackageDescriptor};
use crate::domain::task::UpdateTask;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Builds update tasks from the three inputs.
///
/// `updates` is iterated in input order so the task list is deterministic
/// for a deterministic input. A package is skipped when:
/// - no local descriptor exists for it (warned: the checker config names a
///   package this workspace does not build), or
/// - the published AUR pkgver already equals the target *and* the local
///   descriptor agrees; a diverged local descriptor still yields a task so
///   local edits get published even without an upstream bump.
///
/// A package with a descriptor but no AUR entry is new to the AUR; the
/// task is still created and the processor publishes it into a fresh
/// repository.
pub fn reconcile(
    updates: &[(String, String)],
    descriptors: &HashMap<String, PackageDescriptor>,
    aur_index: &HashMap<String, AurPackageInfo>,
) -> Vec<UpdateTask> {
    let mut tasks = Vec::new();

    for (name, target) in updates {
        let Some(descriptor) = descriptors.get(name) else {
            warn!(package = %name, "upstream update for a package not in this workspace; skipping");
            continue;
        };

        let aur_info = aur_index.get(name).cloned();
        match aur_info {
            Some(ref info) => {
                if &info.version.pkgver == target && &descriptor.pkgver == target {
                    debug!(package = %name, target = %target, "already up to date; skipping");
                    continue;
                }
                debug!(
                    package = %name,
                    aur = %info.version,
                    local = %descriptor.version(),
                    target = %target,
                    "creating update task"
                );
            }
            None => {
                info!(package = %name, "not yet published on the AUR; creating initial publish task");
            }
        }

        tasks.push(UpdateTask {
            descriptor: descriptor.clone(),
            aur_info,
            target_pkgver: Some(target.clone()),
        });
    }

    info!(tasks = tasks.len(), candidates = updates.len(), "reconciliation complete");
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::DescriptorBuilder;
    use crate::domain::version::PkgVersion;

    fn descriptor(name: &str, pkgver: &str) -> PackageDescriptor {
        DescriptorBuilder::new(format!("/ws/pkgs/{}/PKGBUILD", name))
            .pkgbase(name)
            .pkgname(name)
            .pkgver(pkgver)
            .pkgrel("1")
            .build()
            .unwrap()
    }

    fn aur(name: &str, version: &str) -> AurPackageInfo {
        AurPackageInfo {
            pkgbase: name.to_string(),
            name: name.to_string(),
            version: PkgVersion::parse(version),
            maintainer: Some("someone".to_string()),
            id: None,
            votes: None,
            popularity: None,
            last_modified: None,
        }
    }

    fn maps(
        descriptors: Vec<PackageDescriptor>,
        infos: Vec<AurPackageInfo>,
    ) -> (
        HashMap<String, PackageDescriptor>,
        HashMap<String, AurPackageInfo>,
    ) {
        (
            descriptors
                .into_iter()
                .map(|d| (d.name().to_string(), d))
                .collect(),
            infos.into_iter().map(|i| (i.name.clone(), i)).collect(),
        )
    }

    #[test]
    fn test_stale_package_gets_task() {
        let (d, a) = maps(vec![descriptor("foo", "1.0")], vec![aur("foo", "1.0-1")]);
        let tasks = reconcile(&[("foo".to_string(), "1.1".to_string())], &d, &a);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name(), "foo");
        assert_eq!(tasks[0].target_pkgver.as_deref(), Some("1.1"));
        assert!(tasks[0].aur_info.is_some());
    }

    #[test]
    fn test_unknown_package_dropped() {
        let (d, a) = maps(vec![], vec![]);
        let tasks = reconcile(&[("ghost".to_string(), "9.9".to_string())], &d, &a);
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_new_package_absent_from_aur_still_produces_task() {
        let (d, a) = maps(vec![descriptor("newpkg", "1.0")], vec![]);
        let tasks = reconcile(&[("newpkg".to_string(), "1.0".to_string())], &d, &a);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name(), "newpkg");
        assert!(tasks[0].aur_info.is_none());
    }

    #[test]
    fn test_up_to_date_everywhere_skipped() {
        let (d, a) = maps(vec![descriptor("foo", "1.1")], vec![aur("foo", "1.1-1")]);
        let tasks = reconcile(&[("foo".to_string(), "1.1".to_string())], &d, &a);
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_diverged_local_descriptor_still_yields_task() {
        // AUR already at target but the workspace PKGBUILD is behind: the
        // local edit pipeline still needs to run
        let (d, a) = maps(vec![descriptor("foo", "1.0")], vec![aur("foo", "1.1-1")]);
        let tasks = reconcile(&[("foo".to_string(), "1.1".to_string())], &d, &a);
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_input_order_preserved() {
        let (d, a) = maps(
            vec![descriptor("b", "1.0"), descriptor("a", "1.0")],
            vec![aur("b", "1.0-1"), aur("a", "1.0-1")],
        );
        let updates = vec![
            ("b".to_string(), "2.0".to_string()),
            ("a".to_string(), "2.0".to_string()),
        ];
        let tasks = reconcile(&updates, &d, &a);
        let names: Vec<_> = tasks.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
