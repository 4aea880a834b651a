//! Mounter that only records what it was asked to do.

use crate::mount::Mounter;
use linkguard_core::{HarnessError, Result};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};

/// A recorded mount call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountEvent {
    /// `mount source target`
    Mount {
        /// Device or link
        source: PathBuf,
        /// Mount point
        target: PathBuf,
    },
    /// `umount target`
    Unmount {
        /// Mount point
        target: PathBuf,
    },
}

/// Mounter whose "filesystem" is simply the mount point directory.
#[derive(Debug, Default)]
pub struct RecordingMounter {
    events: Mutex<Vec<MountEvent>>,
    mounted: Mutex<Vec<PathBuf>>,
    fail_unmount: Mutex<bool>,
}

impl RecordingMounter {
    /// A mounter with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every unmount fail.
    pub fn fail_unmounts(&self) {
        *self.fail_unmount.lock() = true;
    }

    /// Calls in order.
    pub fn events(&self) -> Vec<MountEvent> {
        self.events.lock().clone()
    }

    /// Mount points currently mounted.
    pub fn mounted(&self) -> Vec<PathBuf> {
        self.mounted.lock().clone()
    }
}

impl Mounter for RecordingMounter {
    fn mount(&self, source: &Path, target: &Path) -> Result<()> {
        if !source.exists() {
            return Err(HarnessError::Command {
                command: format!("mount {} {}", source.display(), target.display()),
                status: "exit status: 32".to_string(),
                stderr: "special device does not exist".to_string(),
            });
        }
        fs::create_dir_all(target)?;
        self.events.lock().push(MountEvent::Mount {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
        });
        self.mounted.lock().push(target.to_path_buf());
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        self.events.lock().push(MountEvent::Unmount {
            target: target.to_path_buf(),
        });
        if *self.fail_unmount.lock() {
            return Err(HarnessError::Command {
                command: format!("umount {}", target.display()),
                status: "exit status: 32".to_string(),
                stderr: "target is busy".to_string(),
            });
        }
        self.mounted.lock().retain(|m| m != target);
        Ok(())
    }
}
