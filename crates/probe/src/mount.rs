//! Filesystem mount and unmount.

use crate::command;
use linkguard_core::{HarnessError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Mounts block devices at private mount points.
pub trait Mounter: Send + Sync {
    /// Mount `source` (a device or device link) at `target`.
    fn mount(&self, source: &Path, target: &Path) -> Result<()>;

    /// Unmount `target`. Unmounting something that is not mounted succeeds.
    fn unmount(&self, target: &Path) -> Result<()>;
}

/// `mount` / `umount` backed mounter.
#[derive(Debug, Clone)]
pub struct SystemMounter {
    mounts_file: PathBuf,
}

impl SystemMounter {
    /// Mounter checking `/proc/mounts`.
    pub fn new() -> Self {
        SystemMounter {
            mounts_file: PathBuf::from("/proc/mounts"),
        }
    }

    /// Whether `target` appears as a mount point.
    pub fn is_mounted(&self, target: &Path) -> Result<bool> {
        let mounts = fs::read_to_string(&self.mounts_file)?;
        Ok(is_listed(&mounts, target))
    }
}

impl Default for SystemMounter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_listed(mounts: &str, target: &Path) -> bool {
    let target = target.to_string_lossy();
    mounts
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(target.as_ref()))
}

impl Mounter for SystemMounter {
    fn mount(&self, source: &Path, target: &Path) -> Result<()> {
        info!(target: "linkguard::mount", source = %source.display(), mount_point = %target.display(), "Mounting");
        fs::create_dir_all(target)?;
        command::run(Command::new("mount").arg(source).arg(target))?;
        if !self.is_mounted(target)? {
            return Err(HarnessError::expectation(format!(
                "{} is not listed as mounted after mount",
                target.display()
            )));
        }
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        if !self.is_mounted(target)? {
            debug!(target: "linkguard::mount", mount_point = %target.display(), "Not mounted, skipping unmount");
            return Ok(());
        }
        info!(target: "linkguard::mount", mount_point = %target.display(), "Unmounting");
        match command::run(Command::new("umount").arg(target)) {
            Ok(_) => Ok(()),
            Err(HarnessError::Command { stderr, .. })
                if stderr.contains("not mounted") || stderr.contains("no mount point") =>
            {
                warn!(target: "linkguard::mount", mount_point = %target.display(), "Path was not mounted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MOUNTS: &str = "\
/dev/sda1 / ext4 rw,relatime 0 0
/dev/mapper/mpatha-part1 /mnt/mpathXYZ ext4 rw,relatime 0 0
";

    #[test]
    fn test_is_listed() {
        assert!(is_listed(MOUNTS, Path::new("/mnt/mpathXYZ")));
        assert!(!is_listed(MOUNTS, Path::new("/mnt")));
    }

    #[test]
    fn test_unmount_of_unmounted_path_is_ok() {
        let dir = TempDir::new().unwrap();
        let mounts = dir.path().join("mounts");
        fs::write(&mounts, MOUNTS).unwrap();
        let mounter = SystemMounter {
            mounts_file: mounts,
        };
        mounter.unmount(&dir.path().join("not-a-mount")).unwrap();
    }
}
