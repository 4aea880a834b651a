//! SCSI path state control through sysfs.

use linkguard_core::{DeviceState, Hctl, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes the state of one access path.
pub trait PathControl: Send + Sync {
    /// Transition the path at `address` to `state`.
    fn set_state(&self, address: &Hctl, state: DeviceState) -> Result<()>;

    /// Current state of the path at `address`.
    fn state(&self, address: &Hctl) -> Result<DeviceState>;
}

/// Path control via `/sys/class/scsi_device/<hctl>/device/state`.
#[derive(Debug, Clone)]
pub struct SysfsPathControl {
    sysfs_root: PathBuf,
}

impl SysfsPathControl {
    /// Control files below `sysfs_root` (normally `/sys`).
    pub fn new(sysfs_root: impl Into<PathBuf>) -> Self {
        SysfsPathControl {
            sysfs_root: sysfs_root.into(),
        }
    }

    /// Control file of `address`.
    pub fn state_file(&self, address: &Hctl) -> PathBuf {
        state_file(&self.sysfs_root, address)
    }
}

pub(crate) fn state_file(sysfs_root: &Path, address: &Hctl) -> PathBuf {
    sysfs_root
        .join("class/scsi_device")
        .join(address.to_string())
        .join("device/state")
}

impl PathControl for SysfsPathControl {
    fn set_state(&self, address: &Hctl, state: DeviceState) -> Result<()> {
        info!(target: "linkguard::paths", address = %address, state = %state, "Setting path state");
        fs::write(self.state_file(address), state.as_str())?;
        Ok(())
    }

    fn state(&self, address: &Hctl) -> Result<DeviceState> {
        fs::read_to_string(self.state_file(address))?.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_state_file_layout() {
        let control = SysfsPathControl::new("/sys");
        assert_eq!(
            control.state_file(&Hctl::new(7, 0, 0, 3)),
            PathBuf::from("/sys/class/scsi_device/7:0:0:3/device/state")
        );
    }

    #[test]
    fn test_set_and_read_state() {
        let dir = TempDir::new().unwrap();
        let address = Hctl::new(1, 0, 0, 0);
        let file = state_file(dir.path(), &address);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "running\n").unwrap();

        let control = SysfsPathControl::new(dir.path());
        assert_eq!(control.state(&address).unwrap(), DeviceState::Running);
        control.set_state(&address, DeviceState::Offline).unwrap();
        assert_eq!(control.state(&address).unwrap(), DeviceState::Offline);
    }

    #[test]
    fn test_missing_control_file() {
        let dir = TempDir::new().unwrap();
        let control = SysfsPathControl::new(dir.path());
        assert!(control
            .set_state(&Hctl::new(0, 0, 0, 0), DeviceState::Offline)
            .is_err());
    }
}
