//! Testing utilities for the harness
//!
//! In-process stand-ins for every external collaborator, so scenarios can be
//! exercised without root, real disks or a running naming daemon:
//!
//! - **SimulatedUdev**: naming daemon publishing nodes and links in a scratch
//!   directory; also a settle barrier and a partitioner
//! - **SimulatedMultipath**: multipath groups with controllable path states
//! - **RecordingMounter**: mounter that records calls
//! - **StaticInventory**: fixed block device list
//!
//! # Example
//!
//! ```ignore
//! use linkguard_probe::testing::SimulatedUdev;
//!
//! let dir = tempfile::TempDir::new()?;
//! let udev = SimulatedUdev::new(dir.path())?;
//! udev.add_node("sda1")?;
//! udev.add_link(NamingScheme::ByLabel, "root", "sda1")?;
//! ```

mod inventory;
mod mount;
mod multipath;
mod udev;

pub use inventory::StaticInventory;
pub use mount::{MountEvent, RecordingMounter};
pub use multipath::SimulatedMultipath;
pub use udev::SimulatedUdev;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MultipathStatus, NameResolver, PartitionTable, PathControl, SettleBarrier};
    use linkguard_core::{DeviceState, NamingScheme, PartitionSpec};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_udev_publishes_relative_links() {
        let dir = TempDir::new().unwrap();
        let udev = SimulatedUdev::new(dir.path()).unwrap();
        udev.add_node("sda1").unwrap();
        let link = udev.add_link(NamingScheme::ByLabel, "root", "sda1").unwrap();

        assert_eq!(
            std::fs::read_link(&link).unwrap(),
            std::path::PathBuf::from("../../sda1")
        );
        assert!(link.exists());
        assert_eq!(udev.canonical_name(&link).unwrap(), "sda1");
    }

    #[test]
    fn test_udev_partition_churn_replaces_links() {
        let dir = TempDir::new().unwrap();
        let udev = SimulatedUdev::new(dir.path()).unwrap();
        let disk = udev.add_node("sdb").unwrap();
        let spec = PartitionSpec::uniform("test", 3, 1024 * 1024);

        udev.write_table(&disk, &spec).unwrap();
        let label = NamingScheme::ByPartlabel.link_path(udev.namespace_root(), "test2");
        assert_eq!(udev.canonical_name(&label).unwrap(), "sdb2");

        udev.delete_table(&disk).unwrap();
        assert!(std::fs::symlink_metadata(&label).is_err());
        assert!(udev.canonical_name(&label).is_err());
        assert_eq!(udev.delete_count(), 1);
        assert_eq!(udev.write_count(), 1);
    }

    #[test]
    fn test_udev_settle_failures() {
        let dir = TempDir::new().unwrap();
        let udev = SimulatedUdev::new(dir.path()).unwrap();
        udev.fail_next_settles(1);
        assert!(udev.settle(Duration::from_secs(1)).unwrap_err().is_barrier_timeout());
        udev.settle(Duration::from_secs(1)).unwrap();
        assert_eq!(udev.settle_calls(), 2);
    }

    #[test]
    fn test_multipath_transitions_and_hooks() {
        let sim = Arc::new(SimulatedMultipath::with_groups(2, 4));
        let wwid = &sim.wwids()[0];
        let paths = sim.paths(wwid).unwrap();
        assert_eq!(paths.len(), 4);

        let seen = Arc::new(parking_lot::Mutex::new(0));
        let counter = Arc::clone(&seen);
        sim.on_transition(move |_, _| *counter.lock() += 1);

        sim.set_state(&paths[0].address, DeviceState::Offline).unwrap();
        assert_eq!(sim.counts(wwid).unwrap(), (3, 1));
        assert_eq!(*seen.lock(), 1);

        sim.ignore_writes_to(paths[1].address);
        sim.set_state(&paths[1].address, DeviceState::Offline).unwrap();
        assert_eq!(sim.counts(wwid).unwrap(), (3, 1));
        assert_eq!(sim.transitions().len(), 2);
    }

    #[test]
    fn test_multipath_unknown_group() {
        let sim = SimulatedMultipath::new();
        assert!(sim.paths("nope").is_err());
    }
}
