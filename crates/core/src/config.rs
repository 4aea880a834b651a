//! Harness configuration via `linkguard.toml`
//!
//! Every field has a default matching the reference storage topology, so an
//! empty file (or no file at all) is a valid configuration. Command line
//! flags override individual values after loading.

use crate::error::{HarnessError, Result};
use crate::types::{NamingScheme, PartitionSpec, DEFAULT_DEV_ROOT, DEFAULT_NAMESPACE_ROOT, SECTOR_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "linkguard.toml";

/// Placeholder substituted with the failover WWID in alias paths.
pub const WWID_PLACEHOLDER: &str = "{wwid}";

// ============================================================================
// Top level
// ============================================================================

/// Harness configuration loaded from `linkguard.toml`.
///
/// # Example
///
/// ```toml
/// namespace_root = "/dev/disk"
/// settle_timeout_secs = 30
/// # seed = 1234
///
/// [churn]
/// device = "/dev/sdb"
/// iterations = 100
/// check_every = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Root of the device-link namespace (contains `by-id`, `by-uuid`, ...)
    #[serde(default = "default_namespace_root")]
    pub namespace_root: PathBuf,
    /// Directory holding device nodes; canonical names are resolved against it
    #[serde(default = "default_dev_root")]
    pub dev_root: PathBuf,
    /// sysfs mount point used for path state control
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
    /// Upper bound for every settle barrier
    #[serde(default = "default_settle_timeout_secs")]
    pub settle_timeout_secs: u64,
    /// Seed for randomized choices; a fresh one is drawn (and logged) when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Directory receiving the result markers; no markers are written when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_dir: Option<PathBuf>,
    /// Partition churn scenario
    #[serde(default)]
    pub churn: ChurnConfig,
    /// Multipath failover scenario
    #[serde(default)]
    pub failover: FailoverConfig,
    /// Multipath topology scenario
    #[serde(default)]
    pub multipath_topology: TopologyConfig,
    /// Device count scenario
    #[serde(default)]
    pub device_count: DeviceCountConfig,
    /// Duplicate label scenario
    #[serde(default)]
    pub duplicate_labels: LabelConfig,
}

fn default_namespace_root() -> PathBuf {
    PathBuf::from(DEFAULT_NAMESPACE_ROOT)
}

fn default_dev_root() -> PathBuf {
    PathBuf::from(DEFAULT_DEV_ROOT)
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys")
}

fn default_settle_timeout_secs() -> u64 {
    30
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            namespace_root: default_namespace_root(),
            dev_root: default_dev_root(),
            sysfs_root: default_sysfs_root(),
            settle_timeout_secs: default_settle_timeout_secs(),
            seed: None,
            marker_dir: None,
            churn: ChurnConfig::default(),
            failover: FailoverConfig::default(),
            multipath_topology: TopologyConfig::default(),
            device_count: DeviceCountConfig::default(),
            duplicate_labels: LabelConfig::default(),
        }
    }
}

// ============================================================================
// Scenario sections
// ============================================================================

/// `[churn]`: partition table delete/recreate stress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnConfig {
    /// Block device whose partition table is rewritten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<PathBuf>,
    /// Number of partitions in the layout
    #[serde(default = "default_churn_partitions")]
    pub partitions: usize,
    /// Size of every partition in bytes
    #[serde(default = "default_churn_partition_size")]
    pub partition_size: u64,
    /// Partition names are `<label_prefix><n>`
    #[serde(default = "default_churn_label_prefix")]
    pub label_prefix: String,
    /// Delete/recreate cycles
    #[serde(default = "default_churn_iterations")]
    pub iterations: usize,
    /// Settle and check every N cycles
    #[serde(default = "default_churn_check_every")]
    pub check_every: usize,
}

fn default_churn_partitions() -> usize {
    50
}

fn default_churn_partition_size() -> u64 {
    2 * 1024 * 1024
}

fn default_churn_label_prefix() -> String {
    "test".to_string()
}

fn default_churn_iterations() -> usize {
    100
}

fn default_churn_check_every() -> usize {
    10
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            device: None,
            partitions: default_churn_partitions(),
            partition_size: default_churn_partition_size(),
            label_prefix: default_churn_label_prefix(),
            iterations: default_churn_iterations(),
            check_every: default_churn_check_every(),
        }
    }
}

impl ChurnConfig {
    /// Layout recreated on every iteration.
    pub fn partition_spec(&self) -> PartitionSpec {
        PartitionSpec::uniform(&self.label_prefix, self.partitions, self.partition_size)
    }
}

/// `[failover]`: multipath path failure with a mounted data partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverConfig {
    /// WWID of the group under test
    #[serde(default = "default_failover_wwid")]
    pub wwid: String,
    /// Number of paths the group must have
    #[serde(default = "default_failover_expected_paths")]
    pub expected_paths: usize,
    /// Paths never taken offline
    #[serde(default = "default_failover_reserved_paths")]
    pub reserved_paths: usize,
    /// Aliases of the data partition, relative to the namespace root;
    /// `{wwid}` is replaced by the group WWID
    #[serde(default = "default_failover_aliases")]
    pub aliases: Vec<String>,
    /// Directory under which the private mount point is created
    #[serde(default = "default_failover_mount_root")]
    pub mount_root: PathBuf,
    /// Counter file name inside the mount point
    #[serde(default = "default_failover_counter_file")]
    pub counter_file: String,
    /// First counter value written
    #[serde(default)]
    pub initial_counter: u64,
    /// Bound for waiting on the aliases before starting
    #[serde(default = "default_failover_link_timeout_secs")]
    pub link_timeout_secs: u64,
    /// Write `running` back to every offlined path on exit
    #[serde(default = "default_true")]
    pub restore_paths: bool,
}

fn default_failover_wwid() -> String {
    "deaddeadbeef0000".to_string()
}

fn default_failover_expected_paths() -> usize {
    4
}

fn default_failover_reserved_paths() -> usize {
    1
}

fn default_failover_aliases() -> Vec<String> {
    vec![
        "by-id/dm-uuid-part1-mpath-{wwid}".to_string(),
        "by-partlabel/failover_part".to_string(),
        "by-partuuid/deadbeef-dead-dead-beef-000000000000".to_string(),
        "by-label/failover_vol".to_string(),
        "by-uuid/deadbeef-dead-dead-beef-111111111111".to_string(),
    ]
}

fn default_failover_mount_root() -> PathBuf {
    PathBuf::from("/mnt")
}

fn default_failover_counter_file() -> String {
    "test".to_string()
}

fn default_failover_link_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            wwid: default_failover_wwid(),
            expected_paths: default_failover_expected_paths(),
            reserved_paths: default_failover_reserved_paths(),
            aliases: default_failover_aliases(),
            mount_root: default_failover_mount_root(),
            counter_file: default_failover_counter_file(),
            initial_counter: 0,
            link_timeout_secs: default_failover_link_timeout_secs(),
            restore_paths: true,
        }
    }
}

impl FailoverConfig {
    /// Absolute alias paths below `namespace_root`.
    pub fn alias_paths(&self, namespace_root: &Path) -> Vec<PathBuf> {
        self.aliases
            .iter()
            .map(|alias| namespace_root.join(alias.replace(WWID_PLACEHOLDER, &self.wwid)))
            .collect()
    }

    /// Bound for the initial alias wait.
    pub fn link_timeout(&self) -> Duration {
        Duration::from_secs(self.link_timeout_secs)
    }
}

/// `[multipath_topology]`: group count and cardinality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Number of `wwn-0x*` groups expected under `by-id`
    #[serde(default = "default_topology_groups")]
    pub expected_groups: usize,
    /// Paths every group must have
    #[serde(default = "default_failover_expected_paths")]
    pub paths_per_group: usize,
}

fn default_topology_groups() -> usize {
    64
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            expected_groups: default_topology_groups(),
            paths_per_group: default_failover_expected_paths(),
        }
    }
}

/// Minimum number of devices of one transport class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportMinimum {
    /// `scsi` (any device with an H:C:T:L address) or an lsblk `TRAN` value
    pub transport: String,
    /// Lower bound
    pub minimum: usize,
}

/// `[device_count]`: device enumeration lower bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCountConfig {
    /// One entry per transport class
    #[serde(default = "default_device_minimums")]
    pub minimums: Vec<TransportMinimum>,
}

fn default_device_minimums() -> Vec<TransportMinimum> {
    vec![
        TransportMinimum {
            transport: "scsi".to_string(),
            minimum: 128,
        },
        TransportMinimum {
            transport: "nvme".to_string(),
            minimum: 28,
        },
    ]
}

impl Default for DeviceCountConfig {
    fn default() -> Self {
        Self {
            minimums: default_device_minimums(),
        }
    }
}

/// `[duplicate_labels]`: identically named partitions across disks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Label shared by every partition
    #[serde(default = "default_duplicate_label")]
    pub label: String,
    /// Which label to match: `by-partlabel` or `by-label`
    #[serde(default = "default_label_scheme")]
    pub scheme: NamingScheme,
    /// Exact number of matching entries
    #[serde(default = "default_duplicate_expected")]
    pub expected: usize,
}

fn default_duplicate_label() -> String {
    "Hello world".to_string()
}

fn default_label_scheme() -> NamingScheme {
    NamingScheme::ByPartlabel
}

fn default_duplicate_expected() -> usize {
    128
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            label: default_duplicate_label(),
            scheme: default_label_scheme(),
            expected: default_duplicate_expected(),
        }
    }
}

// ============================================================================
// Loading and validation
// ============================================================================

impl HarnessConfig {
    /// Bound for every settle barrier.
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_secs)
    }

    /// Check values that cannot be expressed by the types alone.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.settle_timeout_secs == 0 {
            return Err(HarnessError::config("settle_timeout_secs must be at least 1"));
        }
        let churn = &self.churn;
        if churn.iterations == 0 {
            return Err(HarnessError::config("churn.iterations must be at least 1"));
        }
        if churn.check_every == 0 {
            return Err(HarnessError::config("churn.check_every must be at least 1"));
        }
        if churn.partitions == 0 {
            return Err(HarnessError::config("churn.partitions must be at least 1"));
        }
        if churn.partition_size == 0 || churn.partition_size % SECTOR_SIZE != 0 {
            return Err(HarnessError::config(format!(
                "churn.partition_size must be a non-zero multiple of {}",
                SECTOR_SIZE
            )));
        }
        let failover = &self.failover;
        if failover.reserved_paths == 0 || failover.reserved_paths >= failover.expected_paths {
            return Err(HarnessError::config(format!(
                "failover.reserved_paths must be in 1..{}",
                failover.expected_paths
            )));
        }
        if failover.aliases.is_empty() {
            return Err(HarnessError::config("failover.aliases must not be empty"));
        }
        if failover.counter_file.is_empty() || failover.counter_file.contains('/') {
            return Err(HarnessError::config("failover.counter_file must be a plain file name"));
        }
        if !matches!(
            self.duplicate_labels.scheme,
            NamingScheme::ByPartlabel | NamingScheme::ByLabel
        ) {
            return Err(HarnessError::config(
                "duplicate_labels.scheme must be by-partlabel or by-label",
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# linkguard configuration
#
# Device-link namespace and device node roots
namespace_root = "/dev/disk"
dev_root = "/dev"
sysfs_root = "/sys"

# Upper bound for every settle barrier, in seconds
settle_timeout_secs = 30

# Seed for randomized path ordering and alias selection.
# Leave unset to draw a fresh seed; the seed is logged and recorded in the result.
# seed = 1234

# Directory receiving the "testok" / "failed" result markers
# marker_dir = "/"

[churn]
# device = "/dev/disk/by-id/scsi-0systemd_foobar_deadbeeftest"
partitions = 50
partition_size = 2097152
label_prefix = "test"
iterations = 100
check_every = 10

[failover]
wwid = "deaddeadbeef0000"
expected_paths = 4
reserved_paths = 1
aliases = [
    "by-id/dm-uuid-part1-mpath-{wwid}",
    "by-partlabel/failover_part",
    "by-partuuid/deadbeef-dead-dead-beef-000000000000",
    "by-label/failover_vol",
    "by-uuid/deadbeef-dead-dead-beef-111111111111",
]
mount_root = "/mnt"
counter_file = "test"
initial_counter = 0
link_timeout_secs = 30
restore_paths = true

[multipath_topology]
expected_groups = 64
paths_per_group = 4

[device_count]
minimums = [
    { transport = "scsi", minimum = 128 },
    { transport = "nvme", minimum = 28 },
]

[duplicate_labels]
label = "Hello world"
scheme = "by-partlabel"
expected = 128
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            HarnessError::Config(msg) => {
                HarnessError::config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: HarnessConfig = toml::from_str(content)
            .map_err(|e| HarnessError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                HarnessError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}
