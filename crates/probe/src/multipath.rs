//! Multipath group status queries.

use crate::command;
use linkguard_core::{Device, DeviceState, Hctl, HarnessError, Result};
use std::path::PathBuf;
use std::process::Command;

/// Live view of multipath groups.
pub trait MultipathStatus: Send + Sync {
    /// Member paths of the group identified by `wwid`, with their live state.
    fn paths(&self, wwid: &str) -> Result<Vec<Device>>;

    /// Live `(running, offline)` counts of the group.
    fn counts(&self, wwid: &str) -> Result<(usize, usize)> {
        let paths = self.paths(wwid)?;
        let running = paths.iter().filter(|d| d.is_running()).count();
        Ok((running, paths.len() - running))
    }
}

/// Status from `multipath -l <wwid>`.
#[derive(Debug, Clone)]
pub struct MultipathCli {
    program: PathBuf,
}

impl MultipathCli {
    /// Use `multipath` from `PATH`.
    pub fn new() -> Self {
        MultipathCli {
            program: PathBuf::from("multipath"),
        }
    }
}

impl Default for MultipathCli {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipathStatus for MultipathCli {
    fn paths(&self, wwid: &str) -> Result<Vec<Device>> {
        let output = command::run(Command::new(&self.program).arg("-l").arg(wwid))?;
        parse_paths(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract the path lines of `multipath -l` output.
///
/// A path line carries an H:C:T:L token and ends with the SCSI device
/// state, e.g. `` | `- 7:0:0:0 sdb 8:16 active undef running``.
pub fn parse_paths(output: &str) -> Result<Vec<Device>> {
    let mut devices = Vec::new();
    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(address) = tokens.iter().find_map(|t| hctl_token(t)) else {
            continue;
        };
        let state = tokens
            .last()
            .ok_or_else(|| HarnessError::parse(format!("empty path line: {:?}", line)))?
            .parse::<DeviceState>()
            .map_err(|_| HarnessError::parse(format!("no path state in line: {:?}", line)))?;
        devices.push(Device { address, state });
    }
    Ok(devices)
}

fn hctl_token(token: &str) -> Option<Hctl> {
    if token.split(':').count() != 4 {
        return None;
    }
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAILED_OVER: &str = "\
deaddeadbeef0000 dm-0 QEMU,QEMU HARDDISK
size=16M features='0' hwhandler='0' wp=rw
|-+- policy='service-time 0' prio=0 status=active
| `- 2:0:0:0 sda 8:0   active undef running
|-+- policy='service-time 0' prio=0 status=enabled
| `- 3:0:0:0 sdb 8:16  failed undef offline
|-+- policy='service-time 0' prio=0 status=enabled
| `- 4:0:0:0 sdc 8:32  failed undef offline
`-+- policy='service-time 0' prio=0 status=enabled
  `- 5:0:0:0 sdd 8:48  failed undef offline
";

    #[test]
    fn test_parse_failed_over_group() {
        let devices = parse_paths(FAILED_OVER).unwrap();
        assert_eq!(devices.len(), 4);
        assert_eq!(devices[0].address, Hctl::new(2, 0, 0, 0));
        assert_eq!(devices[0].state, DeviceState::Running);
        assert!(devices[1..].iter().all(|d| d.state == DeviceState::Offline));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_paths("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_unknown_state() {
        let err = parse_paths("`- 2:0:0:0 sda 8:0 active undef blocked\n").unwrap_err();
        assert!(matches!(err, HarnessError::Parse(_)));
    }

    struct Fixed(&'static str);

    impl MultipathStatus for Fixed {
        fn paths(&self, _wwid: &str) -> Result<Vec<Device>> {
            parse_paths(self.0)
        }
    }

    #[test]
    fn test_default_counts() {
        assert_eq!(Fixed(FAILED_OVER).counts("deaddeadbeef0000").unwrap(), (1, 3));
    }
}
