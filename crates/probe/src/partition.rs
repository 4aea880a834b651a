//! Partition table mutation.
//!
//! A layout is always applied as a full-table replace: the existing table is
//! deleted first, then the whole layout is written in one operation.

use crate::command;
use linkguard_core::{PartitionSpec, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const MIB: u64 = 1024 * 1024;

/// Destroys and recreates partition tables on a block device.
pub trait PartitionTable: Send + Sync {
    /// Delete every partition on `device`.
    fn delete_table(&self, device: &Path) -> Result<()>;

    /// Write a fresh GPT table with the partitions of `spec`, in order.
    fn write_table(&self, device: &Path, spec: &PartitionSpec) -> Result<()>;
}

/// `sfdisk` backed partitioner.
#[derive(Debug, Clone)]
pub struct Sfdisk {
    program: PathBuf,
}

impl Sfdisk {
    /// Use `sfdisk` from `PATH`.
    pub fn new() -> Self {
        Sfdisk {
            program: PathBuf::from("sfdisk"),
        }
    }
}

impl Default for Sfdisk {
    fn default() -> Self {
        Self::new()
    }
}

impl PartitionTable for Sfdisk {
    fn delete_table(&self, device: &Path) -> Result<()> {
        command::run(
            Command::new(&self.program)
                .args(["-q", "--delete"])
                .arg(device),
        )?;
        Ok(())
    }

    fn write_table(&self, device: &Path, spec: &PartitionSpec) -> Result<()> {
        spec.validate()?;
        let script = render_script(spec);
        debug!(target: "linkguard::partition", device = %device.display(), partitions = spec.len(), "Writing partition table");
        command::run_with_stdin(
            Command::new(&self.program)
                .args(["-q", "-X", "gpt"])
                .arg(device),
            &script,
        )?;
        Ok(())
    }
}

/// sfdisk input script for `spec`.
///
/// Sizes that are whole MiB are written with a suffix, everything else in
/// 512-byte sectors (sfdisk's default unit).
pub fn render_script(spec: &PartitionSpec) -> String {
    let mut script = String::from("label: gpt\n");
    for entry in spec.entries() {
        let size = if entry.size_bytes % MIB == 0 {
            format!("{}MiB", entry.size_bytes / MIB)
        } else {
            format!("{}", entry.size_bytes / linkguard_core::types::SECTOR_SIZE)
        };
        script.push_str(&format!("name=\"{}\", size={}\n", entry.name, size));
    }
    script
}
