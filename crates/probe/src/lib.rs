//! Adapters to the external collaborators of the harness
//!
//! Every external interface the harness observes or drives is a trait here,
//! with a system implementation shelling out to the usual tools:
//!
//! | Trait | System implementation |
//! |---|---|
//! | [`NameResolver`] | `udevadm info --query=name` |
//! | [`SettleBarrier`] | `udevadm settle --timeout=N` |
//! | [`PartitionTable`] | `sfdisk` |
//! | [`PathControl`] | `/sys/class/scsi_device/<hctl>/device/state` |
//! | [`MultipathStatus`] | `multipath -l` |
//! | [`Mounter`] | `mount` / `umount` |
//! | [`BlockInventory`] | `lsblk --json` |
//!
//! In-process stand-ins for tests live in [`testing`].

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
pub mod inventory;
pub mod mount;
pub mod multipath;
pub mod partition;
pub mod paths;
pub mod resolver;
pub mod settle;
pub mod testing;

pub use inventory::{BlockDevice, BlockInventory, LsblkInventory, SCSI_TRANSPORT};
pub use mount::{Mounter, SystemMounter};
pub use multipath::{MultipathCli, MultipathStatus};
pub use partition::{PartitionTable, Sfdisk};
pub use paths::{PathControl, SysfsPathControl};
pub use resolver::{NameResolver, UdevadmResolver};
pub use settle::{SettleBarrier, UdevadmSettle};
