//! Name Resolver Adapter
//!
//! Asks the naming daemon which device node owns a link. The answer is the
//! ground truth the checker compares the filesystem's view against.

use crate::command;
use linkguard_core::{HarnessError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Queries the external naming subsystem for the canonical owner of a link.
pub trait NameResolver: Send + Sync {
    /// Canonical device name (relative to the device root, e.g. `sda1`)
    /// owning `link`.
    fn canonical_name(&self, link: &Path) -> Result<String>;
}

/// Resolver backed by `udevadm info --query=name`.
#[derive(Debug, Clone)]
pub struct UdevadmResolver {
    program: PathBuf,
}

impl UdevadmResolver {
    /// Use `udevadm` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("udevadm")
    }

    /// Use a specific `udevadm` binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        UdevadmResolver {
            program: program.into(),
        }
    }
}

impl Default for UdevadmResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl NameResolver for UdevadmResolver {
    fn canonical_name(&self, link: &Path) -> Result<String> {
        let output = command::run(
            Command::new(&self.program)
                .args(["info", "--query=name"])
                .arg(link),
        )?;
        parse_name(&command::stdout_string(&output), link)
    }
}

/// Validate the name printed by the resolver.
pub(crate) fn parse_name(raw: &str, link: &Path) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(HarnessError::parse(format!(
            "empty device name for {}",
            link.display()
        )));
    }
    Ok(name.trim_start_matches("/dev/").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name() {
        let link = Path::new("/dev/disk/by-label/root");
        assert_eq!(parse_name("sda1\n", link).unwrap(), "sda1");
        assert_eq!(parse_name("mapper/mpatha-part1", link).unwrap(), "mapper/mpatha-part1");
        assert_eq!(parse_name("/dev/dm-3", link).unwrap(), "dm-3");
        assert!(parse_name("  \n", link).is_err());
    }
}
