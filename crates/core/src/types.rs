//! Data model shared by every harness component
//!
//! This module defines the observed state of the storage naming stack:
//! - NamingScheme: the `by-*` namespaces published by the naming daemon
//! - SymlinkEntry: a point-in-time view of one published link
//! - Hctl / Device / DeviceState: one SCSI access path and its state
//! - MultipathGroup: a set of paths to the same logical device
//! - PartitionSpec / ChurnIteration: partition table layouts used by churn
//! - ScenarioResult: the terminal output of a scenario run

use crate::error::{FailoverViolation, HarnessError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default root of device nodes.
pub const DEFAULT_DEV_ROOT: &str = "/dev";

/// Default root of the device-link namespace.
pub const DEFAULT_NAMESPACE_ROOT: &str = "/dev/disk";

/// Sector size used to validate partition sizes.
pub const SECTOR_SIZE: u64 = 512;

// ============================================================================
// Naming schemes
// ============================================================================

/// A naming scheme under which the naming daemon publishes device links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingScheme {
    /// `by-id`: transport/serial based identifiers (wwn, scsi, dm-uuid, ...)
    ById,
    /// `by-uuid`: filesystem UUID
    ByUuid,
    /// `by-label`: filesystem label
    ByLabel,
    /// `by-partlabel`: GPT partition name
    ByPartlabel,
    /// `by-partuuid`: GPT partition UUID
    ByPartuuid,
}

impl NamingScheme {
    /// All schemes in namespace directory order.
    pub const ALL: [NamingScheme; 5] = [
        NamingScheme::ById,
        NamingScheme::ByUuid,
        NamingScheme::ByLabel,
        NamingScheme::ByPartlabel,
        NamingScheme::ByPartuuid,
    ];

    /// Directory name of this scheme below the namespace root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            NamingScheme::ById => "by-id",
            NamingScheme::ByUuid => "by-uuid",
            NamingScheme::ByLabel => "by-label",
            NamingScheme::ByPartlabel => "by-partlabel",
            NamingScheme::ByPartuuid => "by-partuuid",
        }
    }

    /// Path of a link named `name` in this scheme.
    pub fn link_path(&self, namespace_root: &Path, name: &str) -> PathBuf {
        namespace_root.join(self.dir_name()).join(name)
    }
}

impl fmt::Display for NamingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

// ============================================================================
// Symlink entries
// ============================================================================

/// Point-in-time view of one device link.
///
/// `target` is the fully resolved absolute path (absent when the link
/// dangles) and `canonical_name` is what the name resolver reported for the
/// link (absent when the resolver failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymlinkEntry {
    /// Path of the link itself
    pub path: PathBuf,
    /// Resolved absolute target
    pub target: Option<PathBuf>,
    /// Canonical device name owning the link, e.g. `sda1`
    pub canonical_name: Option<String>,
}

impl SymlinkEntry {
    /// Expected device node for this entry under `dev_root`.
    pub fn expected_target(&self, dev_root: &Path) -> Option<PathBuf> {
        self.canonical_name.as_ref().map(|name| dev_root.join(name))
    }

    /// True when the target exists and agrees with the canonical name.
    pub fn is_consistent(&self, dev_root: &Path) -> bool {
        match (&self.target, self.expected_target(dev_root)) {
            (Some(target), Some(expected)) => *target == expected,
            _ => false,
        }
    }
}

// ============================================================================
// SCSI paths
// ============================================================================

/// SCSI address of one access path (`Host:Channel:Target:Lun`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hctl {
    /// Host adapter number
    pub host: u32,
    /// Channel on the adapter
    pub channel: u32,
    /// Target id
    pub target: u32,
    /// Logical unit number
    pub lun: u64,
}

impl Hctl {
    /// Create an address from its four components.
    pub fn new(host: u32, channel: u32, target: u32, lun: u64) -> Self {
        Hctl {
            host,
            channel,
            target,
            lun,
        }
    }
}

impl fmt::Display for Hctl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.host, self.channel, self.target, self.lun)
    }
}

impl FromStr for Hctl {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 {
            return Err(HarnessError::parse(format!("invalid H:C:T:L address '{}'", s)));
        }
        let field = |i: usize| -> Result<u64> {
            parts[i]
                .parse::<u64>()
                .map_err(|_| HarnessError::parse(format!("invalid H:C:T:L address '{}'", s)))
        };
        let narrow = |v: u64| -> Result<u32> {
            u32::try_from(v)
                .map_err(|_| HarnessError::parse(format!("H:C:T:L component out of range in '{}'", s)))
        };
        Ok(Hctl {
            host: narrow(field(0)?)?,
            channel: narrow(field(1)?)?,
            target: narrow(field(2)?)?,
            lun: field(3)?,
        })
    }
}

/// State of one access path as seen by the SCSI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    /// Path is usable
    Running,
    /// Path was taken offline
    Offline,
}

impl DeviceState {
    /// Value written to / read from the sysfs `state` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Running => "running",
            DeviceState::Offline => "offline",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceState {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "running" => Ok(DeviceState::Running),
            "offline" => Ok(DeviceState::Offline),
            other => Err(HarnessError::parse(format!("unknown device state '{}'", other))),
        }
    }
}

/// One access path of a multipath group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// SCSI address
    pub address: Hctl,
    /// Current state
    pub state: DeviceState,
}

impl Device {
    /// A running path at `address`.
    pub fn running(address: Hctl) -> Self {
        Device {
            address,
            state: DeviceState::Running,
        }
    }

    /// Whether the path is currently running.
    pub fn is_running(&self) -> bool {
        self.state == DeviceState::Running
    }
}

// ============================================================================
// Multipath groups
// ============================================================================

/// A multipath group and the local model of its paths' states.
///
/// The model only ever moves a path from Running to Offline, and refuses
/// to take the last running path offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipathGroup {
    /// World Wide Identifier of the logical device
    pub wwid: String,
    /// Member paths
    pub members: Vec<Device>,
    /// Link through which the group's data partition is used
    pub active_path_symlink: PathBuf,
}

impl MultipathGroup {
    /// Build a group model.
    pub fn new(wwid: impl Into<String>, members: Vec<Device>, active_path_symlink: PathBuf) -> Self {
        MultipathGroup {
            wwid: wwid.into(),
            members,
            active_path_symlink,
        }
    }

    /// Number of running members.
    pub fn running_count(&self) -> usize {
        self.members.iter().filter(|d| d.is_running()).count()
    }

    /// Number of offline members.
    pub fn offline_count(&self) -> usize {
        self.members.len() - self.running_count()
    }

    /// Derived group state `(running, offline)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.running_count(), self.offline_count())
    }

    /// Record that `address` was taken offline.
    ///
    /// # Errors
    ///
    /// - `IllegalTransition` if the path is unknown or already offline
    /// - `LastPathLost` if this would leave no running path
    pub fn deactivate(&mut self, address: &Hctl) -> std::result::Result<(), FailoverViolation> {
        let running = self.running_count();
        let wwid = self.wwid.clone();
        let device = self
            .members
            .iter_mut()
            .find(|d| d.address == *address)
            .ok_or_else(|| FailoverViolation::IllegalTransition {
                wwid: wwid.clone(),
                address: *address,
                reason: "path is not a member of the group".to_string(),
            })?;
        if device.state != DeviceState::Running {
            return Err(FailoverViolation::IllegalTransition {
                wwid,
                address: *address,
                reason: "path is already offline".to_string(),
            });
        }
        if running <= 1 {
            return Err(FailoverViolation::LastPathLost { wwid });
        }
        device.state = DeviceState::Offline;
        Ok(())
    }
}

// ============================================================================
// Partition layouts
// ============================================================================

/// One named partition with a requested size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionEntry {
    /// GPT partition name (published under `by-partlabel`)
    pub name: String,
    /// Requested size in bytes
    pub size_bytes: u64,
}

/// Ordered partition layout applied as a full-table replace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartitionSpec {
    entries: Vec<PartitionEntry>,
}

impl PartitionSpec {
    /// Build a layout from explicit entries.
    pub fn new(entries: Vec<PartitionEntry>) -> Self {
        PartitionSpec { entries }
    }

    /// `count` partitions named `<prefix>1..=<prefix>count`, all of `size_bytes`.
    pub fn uniform(prefix: &str, count: usize, size_bytes: u64) -> Self {
        let entries = (1..=count)
            .map(|i| PartitionEntry {
                name: format!("{}{}", prefix, i),
                size_bytes,
            })
            .collect();
        PartitionSpec { entries }
    }

    /// Entries in table order.
    pub fn entries(&self) -> &[PartitionEntry] {
        &self.entries
    }

    /// Number of partitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the layout has no partitions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Partition names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Check that the layout can be written.
    ///
    /// Names must be non-empty and free of quotes; sizes must be non-zero
    /// multiples of the sector size.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(HarnessError::invalid_input("partition spec is empty"));
        }
        for entry in &self.entries {
            if entry.name.is_empty() || entry.name.contains('"') {
                return Err(HarnessError::invalid_input(format!(
                    "invalid partition name '{}'",
                    entry.name
                )));
            }
            if entry.size_bytes == 0 || entry.size_bytes % SECTOR_SIZE != 0 {
                return Err(HarnessError::invalid_input(format!(
                    "partition '{}' size {} is not a non-zero multiple of {} bytes",
                    entry.name, entry.size_bytes, SECTOR_SIZE
                )));
            }
        }
        Ok(())
    }
}

/// One delete/recreate cycle of the churn driver. Never persisted.
#[derive(Debug, Clone, Copy)]
pub struct ChurnIteration<'a> {
    /// 1-based iteration index
    pub index: usize,
    /// Layout recreated in this iteration
    pub spec: &'a PartitionSpec,
}

impl<'a> ChurnIteration<'a> {
    /// Whether this iteration ends with a settle barrier and a check.
    pub fn is_barrier(&self, check_every: usize) -> bool {
        check_every > 0 && self.index % check_every == 0
    }
}

// ============================================================================
// Scenario results
// ============================================================================

/// Terminal outcome of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioOutcome {
    /// Every assertion held
    Pass,
    /// At least one assertion failed, or the run never completed
    Fail,
}

/// Detail recorded while a scenario has been dispatched but not finalized.
pub const IN_PROGRESS_DETAIL: &str = "scenario did not complete";

/// Result of one scenario run.
///
/// Created at dispatch in the failed/in-progress state and finalized once
/// the scenario and its checks are done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Registered scenario name
    pub name: String,
    /// Pass or Fail
    pub outcome: ScenarioOutcome,
    /// Human readable failure detail (absent on Pass)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,
    /// Seed used for every randomized choice of the run
    pub seed: u64,
    /// Dispatch time
    pub started_at: DateTime<Utc>,
    /// Finalization time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScenarioResult {
    /// A freshly dispatched, not yet finalized result.
    pub fn dispatched(name: impl Into<String>, seed: u64) -> Self {
        ScenarioResult {
            name: name.into(),
            outcome: ScenarioOutcome::Fail,
            failure_detail: Some(IN_PROGRESS_DETAIL.to_string()),
            seed,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Finalize with the collected failures; no failures means Pass.
    pub fn finalize(mut self, failures: Vec<String>) -> Self {
        if failures.is_empty() {
            self.outcome = ScenarioOutcome::Pass;
            self.failure_detail = None;
        } else {
            self.outcome = ScenarioOutcome::Fail;
            self.failure_detail = Some(failures.join("; "));
        }
        self.finished_at = Some(Utc::now());
        self
    }

    /// True when the scenario passed.
    pub fn is_pass(&self) -> bool {
        self.outcome == ScenarioOutcome::Pass
    }

    /// True once `finalize` has run.
    pub fn is_finalized(&self) -> bool {
        self.finished_at.is_some()
    }

    /// JSON form used by result markers.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| HarnessError::Serialization(e.to_string()))
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.outcome, &self.failure_detail) {
            (ScenarioOutcome::Pass, _) => write!(f, "{}: PASS (seed {})", self.name, self.seed),
            (ScenarioOutcome::Fail, Some(detail)) => {
                write!(f, "{}: FAIL (seed {}): {}", self.name, self.seed, detail)
            }
            (ScenarioOutcome::Fail, None) => write!(f, "{}: FAIL (seed {})", self.name, self.seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(n: u32) -> MultipathGroup {
        let members = (0..n).map(|i| Device::running(Hctl::new(i, 0, 0, 0))).collect();
        MultipathGroup::new("deaddeadbeef0000", members, PathBuf::from("/dev/disk/by-label/x"))
    }

    #[test]
    fn test_hctl_parse_and_display() {
        let hctl: Hctl = "7:0:1:12".parse().unwrap();
        assert_eq!(hctl, Hctl::new(7, 0, 1, 12));
        assert_eq!(hctl.to_string(), "7:0:1:12");
    }

    #[test]
    fn test_hctl_rejects_garbage() {
        assert!("7:0:1".parse::<Hctl>().is_err());
        assert!("a:b:c:d".parse::<Hctl>().is_err());
        assert!("1:2:3:4:5".parse::<Hctl>().is_err());
        assert!("99999999999:0:0:0".parse::<Hctl>().is_err());
    }

    #[test]
    fn test_device_state_parse() {
        assert_eq!("running\n".parse::<DeviceState>().unwrap(), DeviceState::Running);
        assert_eq!("offline".parse::<DeviceState>().unwrap(), DeviceState::Offline);
        assert!("blocked".parse::<DeviceState>().is_err());
    }

    #[test]
    fn test_scheme_link_path() {
        let path = NamingScheme::ByPartlabel.link_path(Path::new("/dev/disk"), "test1");
        assert_eq!(path, PathBuf::from("/dev/disk/by-partlabel/test1"));
    }

    #[test]
    fn test_symlink_entry_consistency() {
        let entry = SymlinkEntry {
            path: PathBuf::from("/dev/disk/by-label/root"),
            target: Some(PathBuf::from("/dev/sda1")),
            canonical_name: Some("sda1".to_string()),
        };
        assert!(entry.is_consistent(Path::new("/dev")));

        let mismatched = SymlinkEntry {
            canonical_name: Some("sdb1".to_string()),
            ..entry.clone()
        };
        assert!(!mismatched.is_consistent(Path::new("/dev")));

        let dangling = SymlinkEntry {
            target: None,
            ..entry
        };
        assert!(!dangling.is_consistent(Path::new("/dev")));
    }

    #[test]
    fn test_group_deactivate_keeps_last_path() {
        let mut g = group(4);
        for i in 0..3 {
            g.deactivate(&Hctl::new(i, 0, 0, 0)).unwrap();
        }
        assert_eq!(g.counts(), (1, 3));

        let err = g.deactivate(&Hctl::new(3, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, FailoverViolation::LastPathLost { .. }));
        assert_eq!(g.counts(), (1, 3));
    }

    #[test]
    fn test_group_deactivate_is_one_directional() {
        let mut g = group(2);
        g.deactivate(&Hctl::new(0, 0, 0, 0)).unwrap();
        let err = g.deactivate(&Hctl::new(0, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, FailoverViolation::IllegalTransition { .. }));
    }

    #[test]
    fn test_group_deactivate_unknown_path() {
        let mut g = group(2);
        let err = g.deactivate(&Hctl::new(9, 9, 9, 9)).unwrap_err();
        assert!(matches!(err, FailoverViolation::IllegalTransition { .. }));
    }

    #[test]
    fn test_uniform_partition_spec() {
        let spec = PartitionSpec::uniform("test", 50, 2 * 1024 * 1024);
        assert_eq!(spec.len(), 50);
        assert_eq!(spec.entries()[0].name, "test1");
        assert_eq!(spec.entries()[49].name, "test50");
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_partition_spec_validation() {
        assert!(PartitionSpec::default().validate().is_err());
        assert!(PartitionSpec::uniform("p", 1, 1000).validate().is_err());
        assert!(PartitionSpec::uniform("p", 1, 0).validate().is_err());
        let quoted = PartitionSpec::new(vec![PartitionEntry {
            name: "bad\"name".to_string(),
            size_bytes: 4096,
        }]);
        assert!(quoted.validate().is_err());
    }

    #[test]
    fn test_churn_iteration_barrier() {
        let spec = PartitionSpec::uniform("p", 1, 4096);
        let barriers: Vec<usize> = (1..=100)
            .map(|index| ChurnIteration { index, spec: &spec })
            .filter(|it| it.is_barrier(10))
            .map(|it| it.index)
            .collect();
        assert_eq!(barriers, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        assert!(!ChurnIteration { index: 5, spec: &spec }.is_barrier(0));
    }

    #[test]
    fn test_scenario_result_lifecycle() {
        let result = ScenarioResult::dispatched("churn", 42);
        assert!(!result.is_pass());
        assert!(!result.is_finalized());
        assert_eq!(result.failure_detail.as_deref(), Some(IN_PROGRESS_DETAIL));

        let passed = result.clone().finalize(vec![]);
        assert!(passed.is_pass());
        assert!(passed.failure_detail.is_none());
        assert!(passed.is_finalized());

        let failed = result.finalize(vec!["a".to_string(), "b".to_string()]);
        assert!(!failed.is_pass());
        assert_eq!(failed.failure_detail.as_deref(), Some("a; b"));
    }

    #[test]
    fn test_scenario_result_json() {
        let result = ScenarioResult::dispatched("device_count", 7).finalize(vec![]);
        let json = result.to_json().unwrap();
        assert!(json.contains("\"outcome\": \"pass\""));
        assert!(!json.contains("failure_detail"));
        let parsed: ScenarioResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
