//! Symlink Consistency Checker
//!
//! Validates every device link against two independent sources of truth:
//! the filesystem (the link and the node it resolves to must exist) and the
//! naming daemon (the resolved node must be the device that owns the link).
//!
//! The checker takes a snapshot and never holds anything across calls, so it
//! can run while the topology is being mutated. Violations are collected
//! exhaustively rather than stopping at the first one.

use crate::walk::collect_links;
use linkguard_core::{Result, SymlinkEntry, SymlinkViolation, ViolationReport};
use linkguard_probe::{NameResolver, SettleBarrier};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Checks device links under a namespace root.
#[derive(Clone)]
pub struct SymlinkChecker {
    resolver: Arc<dyn NameResolver>,
    dev_root: PathBuf,
}

impl SymlinkChecker {
    /// Checker resolving canonical names with `resolver` against `dev_root`.
    pub fn new(resolver: Arc<dyn NameResolver>, dev_root: impl Into<PathBuf>) -> Self {
        SymlinkChecker {
            resolver,
            dev_root: dev_root.into(),
        }
    }

    /// Root canonical device names are resolved against.
    pub fn dev_root(&self) -> &Path {
        &self.dev_root
    }

    /// Validate every symlink below `namespace_root`.
    ///
    /// Returns the complete list of violations, in link path order. Two
    /// calls with no mutation in between return identical reports.
    pub fn check_all(&self, namespace_root: &Path) -> std::result::Result<(), ViolationReport> {
        let (links, mut violations) = collect_links(namespace_root);
        let dev_root = self.canonical_dev_root();
        for link in &links {
            if let Err(v) = self.inspect(link, &dev_root) {
                violations.push(v);
            }
        }
        violations.sort();
        info!(
            target: "linkguard::checker",
            root = %namespace_root.display(),
            links = links.len(),
            violations = violations.len(),
            "Checked device links"
        );
        for v in &violations {
            warn!(target: "linkguard::checker", violation = %v, "Device link violation");
        }
        ViolationReport::new(violations).into_result()
    }

    /// Validate an explicit list of links.
    ///
    /// A listed link that does not exist at all is a `DanglingLink`.
    pub fn check_links(&self, links: &[PathBuf]) -> std::result::Result<(), ViolationReport> {
        let dev_root = self.canonical_dev_root();
        let violations: Vec<SymlinkViolation> = links
            .iter()
            .filter_map(|link| self.inspect(link, &dev_root).err())
            .collect();
        debug!(
            target: "linkguard::checker",
            links = links.len(),
            violations = violations.len(),
            "Checked listed links"
        );
        ViolationReport::new(violations).into_result()
    }

    /// Point-in-time view of every link below `namespace_root`.
    pub fn snapshot(&self, namespace_root: &Path) -> Vec<SymlinkEntry> {
        let (links, _) = collect_links(namespace_root);
        links
            .into_iter()
            .map(|path| SymlinkEntry {
                target: fs::canonicalize(&path).ok(),
                canonical_name: self.resolver.canonical_name(&path).ok(),
                path,
            })
            .collect()
    }

    /// Settle, then wait until every link in `links` exists.
    pub fn wait_for_links(
        &self,
        barrier: &dyn SettleBarrier,
        links: &[PathBuf],
        timeout: Duration,
    ) -> Result<()> {
        barrier.wait_for(links, timeout)
    }

    fn canonical_dev_root(&self) -> PathBuf {
        fs::canonicalize(&self.dev_root).unwrap_or_else(|_| self.dev_root.clone())
    }

    fn inspect(&self, link: &Path, dev_root: &Path) -> std::result::Result<(), SymlinkViolation> {
        if fs::symlink_metadata(link).is_err() {
            return Err(SymlinkViolation::DanglingLink {
                path: link.to_path_buf(),
                target: None,
            });
        }
        let resolved = fs::canonicalize(link).map_err(|_| SymlinkViolation::DanglingLink {
            path: link.to_path_buf(),
            target: fs::read_link(link).ok(),
        })?;
        let name = self
            .resolver
            .canonical_name(link)
            .map_err(|e| SymlinkViolation::Unresolvable {
                path: link.to_path_buf(),
                reason: e.to_string(),
            })?;
        let expected = dev_root.join(&name);
        if resolved != expected {
            return Err(SymlinkViolation::NameMismatch {
                path: link.to_path_buf(),
                resolved,
                expected,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for SymlinkChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymlinkChecker")
            .field("dev_root", &self.dev_root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_core::NamingScheme;
    use linkguard_probe::testing::SimulatedUdev;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<SimulatedUdev>, SymlinkChecker) {
        let dir = TempDir::new().unwrap();
        let udev = Arc::new(SimulatedUdev::new(dir.path()).unwrap());
        let checker = SymlinkChecker::new(udev.clone(), udev.dev_root().to_path_buf());
        (dir, udev, checker)
    }

    #[test]
    fn test_healthy_namespace_passes() {
        let (_dir, udev, checker) = setup();
        udev.add_node("sda").unwrap();
        udev.add_node("sda1").unwrap();
        udev.add_link(NamingScheme::ById, "wwn-0xdeadbeef", "sda").unwrap();
        udev.add_link(NamingScheme::ByLabel, "root", "sda1").unwrap();
        udev.add_link(NamingScheme::ByUuid, "1234-abcd", "sda1").unwrap();

        checker.check_all(udev.namespace_root()).unwrap();
    }

    #[test]
    fn test_empty_namespace_passes() {
        let (_dir, udev, checker) = setup();
        checker.check_all(udev.namespace_root()).unwrap();
    }

    #[test]
    fn test_dangling_target_is_reported() {
        let (_dir, udev, checker) = setup();
        udev.add_node("sdb1").unwrap();
        udev.add_link(NamingScheme::ByPartlabel, "data", "sdb1").unwrap();
        udev.remove_node("sdb1").unwrap();

        let report = checker.check_all(udev.namespace_root()).unwrap_err();
        assert_eq!(report.len(), 1);
        match &report.violations()[0] {
            SymlinkViolation::DanglingLink { target, .. } => {
                assert_eq!(target.as_deref(), Some(Path::new("../../sdb1")));
            }
            other => panic!("unexpected violation: {other}"),
        }
    }

    #[test]
    fn test_name_mismatch_is_reported() {
        let (_dir, udev, checker) = setup();
        udev.add_node("sdc").unwrap();
        udev.add_node("sdd").unwrap();
        let link = udev.add_link(NamingScheme::ById, "scsi-x", "sdc").unwrap();
        udev.override_name(&link, "sdd");

        let report = checker.check_all(udev.namespace_root()).unwrap_err();
        match &report.violations()[0] {
            SymlinkViolation::NameMismatch { resolved, expected, .. } => {
                assert!(resolved.ends_with("sdc"));
                assert!(expected.ends_with("sdd"));
            }
            other => panic!("unexpected violation: {other}"),
        }
    }

    #[test]
    fn test_unresolvable_link_is_reported() {
        let (_dir, udev, checker) = setup();
        udev.add_node("sde").unwrap();
        let link = udev.add_link(NamingScheme::ById, "scsi-y", "sde").unwrap();
        udev.make_unresolvable(&link);

        let report = checker.check_all(udev.namespace_root()).unwrap_err();
        assert!(matches!(
            report.violations()[0],
            SymlinkViolation::Unresolvable { .. }
        ));
    }

    #[test]
    fn test_all_violations_are_collected() {
        let (_dir, udev, checker) = setup();
        udev.add_node("sda").unwrap();
        udev.add_node("sdb").unwrap();
        udev.add_link(NamingScheme::ById, "ok", "sda").unwrap();
        udev.add_link(NamingScheme::ById, "gone-1", "sdx").unwrap();
        udev.add_link(NamingScheme::ByLabel, "gone-2", "sdy").unwrap();
        let wrong = udev.add_link(NamingScheme::ByUuid, "wrong", "sda").unwrap();
        udev.override_name(&wrong, "sdb");

        let report = checker.check_all(udev.namespace_root()).unwrap_err();
        assert_eq!(report.len(), 3);
        assert_eq!(report.violations().iter().filter(|v| v.is_dangling()).count(), 2);
    }

    #[test]
    fn test_check_all_is_idempotent() {
        let (_dir, udev, checker) = setup();
        udev.add_node("sda").unwrap();
        udev.add_link(NamingScheme::ById, "ok", "sda").unwrap();
        udev.add_link(NamingScheme::ById, "gone", "sdq").unwrap();
        udev.add_link(NamingScheme::ByLabel, "gone", "sdr").unwrap();

        let first = checker.check_all(udev.namespace_root()).unwrap_err();
        let second = checker.check_all(udev.namespace_root()).unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_namespace_root_is_reported() {
        let (dir, _udev, checker) = setup();
        let report = checker.check_all(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(
            report.violations()[0],
            SymlinkViolation::EnumerationFailed { .. }
        ));
    }

    #[test]
    fn test_check_links_reports_missing_link() {
        let (_dir, udev, checker) = setup();
        udev.add_node("dm-1").unwrap();
        let present = udev.add_link(NamingScheme::ByLabel, "failover_vol", "dm-1").unwrap();
        let absent = NamingScheme::ByUuid.link_path(udev.namespace_root(), "not-there");

        checker.check_links(&[present.clone()]).unwrap();
        let report = checker.check_links(&[present, absent.clone()]).unwrap_err();
        assert_eq!(
            report.violations(),
            &[SymlinkViolation::DanglingLink {
                path: absent,
                target: None
            }]
        );
    }

    #[test]
    fn test_snapshot_entries() {
        let (_dir, udev, checker) = setup();
        udev.add_node("sda1").unwrap();
        udev.add_link(NamingScheme::ByLabel, "root", "sda1").unwrap();
        udev.add_link(NamingScheme::ByLabel, "stale", "sdz9").unwrap();

        let entries = checker.snapshot(udev.namespace_root());
        assert_eq!(entries.len(), 2);
        let dev_root = fs::canonicalize(udev.dev_root()).unwrap();
        let root = entries.iter().find(|e| e.path.ends_with("root")).unwrap();
        assert!(root.is_consistent(&dev_root));
        let stale = entries.iter().find(|e| e.path.ends_with("stale")).unwrap();
        assert!(stale.target.is_none());
    }

    #[test]
    fn test_wait_for_links_times_out() {
        let (_dir, udev, checker) = setup();
        let missing = NamingScheme::ByLabel.link_path(udev.namespace_root(), "later");
        let err = checker
            .wait_for_links(&*udev, &[missing], Duration::from_millis(200))
            .unwrap_err();
        assert!(err.is_barrier_timeout());
    }
}
