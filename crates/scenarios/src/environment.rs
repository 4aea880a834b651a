//! Scenario environment
//!
//! Bundles the checker and every external adapter a scenario may drive.
//! `Environment::system` wires the real tools; tests swap individual
//! adapters through [`EnvironmentBuilder`].

use linkguard_checker::SymlinkChecker;
use linkguard_core::{HarnessConfig, HarnessError, Result};
use linkguard_probe::{
    BlockInventory, LsblkInventory, MultipathCli, MultipathStatus, Mounter, NameResolver,
    PartitionTable, PathControl, SettleBarrier, Sfdisk, SysfsPathControl, SystemMounter,
    UdevadmResolver, UdevadmSettle,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Everything a scenario may observe or mutate.
#[derive(Clone)]
pub struct Environment {
    config: HarnessConfig,
    checker: SymlinkChecker,
    barrier: Arc<dyn SettleBarrier>,
    partitions: Arc<dyn PartitionTable>,
    paths: Arc<dyn PathControl>,
    multipath: Arc<dyn MultipathStatus>,
    mounter: Arc<dyn Mounter>,
    inventory: Arc<dyn BlockInventory>,
}

impl Environment {
    /// Environment driving the real system tools.
    pub fn system(config: HarnessConfig) -> Self {
        Self::builder(config).build()
    }

    /// Builder defaulting every adapter to its system implementation.
    pub fn builder(config: HarnessConfig) -> EnvironmentBuilder {
        EnvironmentBuilder::new(config)
    }

    /// Configuration the environment was built from.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Root of the device-link namespace.
    pub fn namespace_root(&self) -> &Path {
        &self.config.namespace_root
    }

    /// Bound for every settle barrier.
    pub fn settle_timeout(&self) -> Duration {
        self.config.settle_timeout()
    }

    /// Link checker bound to the configured roots.
    pub fn checker(&self) -> &SymlinkChecker {
        &self.checker
    }

    /// Settle barrier.
    pub fn barrier(&self) -> &dyn SettleBarrier {
        self.barrier.as_ref()
    }

    /// Partition table control.
    pub fn partitions(&self) -> &dyn PartitionTable {
        self.partitions.as_ref()
    }

    /// SCSI path state control.
    pub fn paths(&self) -> &dyn PathControl {
        self.paths.as_ref()
    }

    /// Multipath group status.
    pub fn multipath(&self) -> &dyn MultipathStatus {
        self.multipath.as_ref()
    }

    /// Filesystem mounting.
    pub fn mounter(&self) -> &dyn Mounter {
        self.mounter.as_ref()
    }

    /// Block device inventory.
    pub fn inventory(&self) -> &dyn BlockInventory {
        self.inventory.as_ref()
    }

    /// Wait for the naming subsystem to become quiescent.
    pub fn settle(&self) -> Result<()> {
        self.barrier.settle(self.settle_timeout())
    }

    /// Settle barrier followed by a full namespace check.
    ///
    /// # Errors
    ///
    /// `BarrierTimeout` if the barrier fails, `Violations` with the complete
    /// report if the check finds anything.
    pub fn settle_and_check(&self) -> Result<()> {
        self.settle()?;
        self.checker
            .check_all(self.namespace_root())
            .map_err(HarnessError::Violations)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("namespace_root", &self.config.namespace_root)
            .field("checker", &self.checker)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Environment`].
pub struct EnvironmentBuilder {
    config: HarnessConfig,
    resolver: Option<Arc<dyn NameResolver>>,
    barrier: Option<Arc<dyn SettleBarrier>>,
    partitions: Option<Arc<dyn PartitionTable>>,
    paths: Option<Arc<dyn PathControl>>,
    multipath: Option<Arc<dyn MultipathStatus>>,
    mounter: Option<Arc<dyn Mounter>>,
    inventory: Option<Arc<dyn BlockInventory>>,
}

impl EnvironmentBuilder {
    fn new(config: HarnessConfig) -> Self {
        EnvironmentBuilder {
            config,
            resolver: None,
            barrier: None,
            partitions: None,
            paths: None,
            multipath: None,
            mounter: None,
            inventory: None,
        }
    }

    /// Override the namespace and device roots (both from the config by default).
    pub fn roots(mut self, namespace_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>) -> Self {
        self.config.namespace_root = namespace_root.into();
        self.config.dev_root = dev_root.into();
        self
    }

    /// Override the name resolver.
    pub fn resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Override the settle barrier.
    pub fn barrier(mut self, barrier: Arc<dyn SettleBarrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Override the partition table adapter.
    pub fn partitions(mut self, partitions: Arc<dyn PartitionTable>) -> Self {
        self.partitions = Some(partitions);
        self
    }

    /// Override path state control.
    pub fn paths(mut self, paths: Arc<dyn PathControl>) -> Self {
        self.paths = Some(paths);
        self
    }

    /// Override multipath status queries.
    pub fn multipath(mut self, multipath: Arc<dyn MultipathStatus>) -> Self {
        self.multipath = Some(multipath);
        self
    }

    /// Override the mounter.
    pub fn mounter(mut self, mounter: Arc<dyn Mounter>) -> Self {
        self.mounter = Some(mounter);
        self
    }

    /// Override the block inventory.
    pub fn inventory(mut self, inventory: Arc<dyn BlockInventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    /// Finish, filling every adapter not set with its system implementation.
    pub fn build(self) -> Environment {
        let config = self.config;
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(UdevadmResolver::new()));
        let checker = SymlinkChecker::new(resolver, config.dev_root.clone());
        let paths = self
            .paths
            .unwrap_or_else(|| Arc::new(SysfsPathControl::new(config.sysfs_root.clone())));
        debug!(
            target: "linkguard::environment",
            namespace_root = %config.namespace_root.display(),
            dev_root = %config.dev_root.display(),
            "Built scenario environment"
        );
        Environment {
            checker,
            barrier: self.barrier.unwrap_or_else(|| Arc::new(UdevadmSettle::new())),
            partitions: self.partitions.unwrap_or_else(|| Arc::new(Sfdisk::new())),
            paths,
            multipath: self.multipath.unwrap_or_else(|| Arc::new(MultipathCli::new())),
            mounter: self.mounter.unwrap_or_else(|| Arc::new(SystemMounter::new())),
            inventory: self.inventory.unwrap_or_else(|| Arc::new(LsblkInventory::new())),
            config,
        }
    }
}
