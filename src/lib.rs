//! linkguard - verification harness for block device link naming
//!
//! Checks that every link in the device namespace (`/dev/disk/by-*`) exists
//! and points at the device the naming daemon says owns it, including while
//! partition tables are being rewritten and while multipath paths fail.
//!
//! # Quick Start
//!
//! ```ignore
//! use linkguard::{Environment, HarnessConfig, Orchestrator, ScenarioRegistry};
//!
//! let config = HarnessConfig::load_or_default("linkguard.toml".as_ref())?;
//! let registry = ScenarioRegistry::standard(&config);
//! let orchestrator = Orchestrator::new(Environment::system(config), registry);
//! let result = orchestrator.run("symlink_check")?;
//! assert!(result.is_pass(), "{}", result);
//! ```
//!
//! # Architecture
//!
//! - `linkguard-core`: types, errors, configuration, seeded randomness
//! - `linkguard-probe`: adapters to udev, sfdisk, sysfs, multipath, mount, lsblk
//! - `linkguard-checker`: the symlink consistency checker
//! - `linkguard-scenarios`: churn, failover, static scenarios and the orchestrator

pub use linkguard_checker::{collect_links, SymlinkChecker};
pub use linkguard_core::*;
pub use linkguard_probe::{
    testing, BlockDevice, BlockInventory, Mounter, MultipathStatus, NameResolver,
    PartitionTable, PathControl, SettleBarrier,
};
pub use linkguard_scenarios::{
    ChurnDriver, Environment, EnvironmentBuilder, FailoverReport, FailoverValidator,
    Orchestrator, ResultMarker, Scenario, ScenarioRegistry,
};
