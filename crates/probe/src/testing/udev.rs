//! In-process stand-in for the device naming daemon.
//!
//! Publishes device nodes as regular files and links as relative symlinks
//! (`../../sda1`, the way the naming daemon lays them out) inside a scratch
//! directory. It keeps its own owner table, so name resolution stays
//! independent of what the filesystem currently shows.

use crate::partition::PartitionTable;
use crate::resolver::NameResolver;
use crate::settle::SettleBarrier;
use linkguard_core::{HarnessError, NamingScheme, PartitionSpec, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Partition published for one device by the last `write_table`.
#[derive(Debug, Clone)]
struct Published {
    node: String,
    links: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct UdevState {
    /// link path -> canonical device name
    owners: HashMap<PathBuf, String>,
    overrides: HashMap<PathBuf, String>,
    unresolvable: HashSet<PathBuf>,
    partitions: HashMap<PathBuf, Vec<Published>>,
    settle_failures: usize,
    settle_calls: usize,
    resolve_calls: usize,
    writes: usize,
    deletes: usize,
    stale_on_write: Option<usize>,
}

/// Simulated naming daemon rooted in a scratch directory.
///
/// Implements [`NameResolver`], [`SettleBarrier`] and [`PartitionTable`].
#[derive(Debug)]
pub struct SimulatedUdev {
    dev_root: PathBuf,
    namespace_root: PathBuf,
    state: Mutex<UdevState>,
}

impl SimulatedUdev {
    /// Create `root/dev` and `root/dev/disk/by-*`.
    pub fn new(root: &Path) -> Result<Self> {
        let dev_root = root.join("dev");
        let namespace_root = dev_root.join("disk");
        for scheme in NamingScheme::ALL {
            fs::create_dir_all(namespace_root.join(scheme.dir_name()))?;
        }
        Ok(SimulatedUdev {
            dev_root,
            namespace_root,
            state: Mutex::new(UdevState::default()),
        })
    }

    /// Directory holding the simulated device nodes.
    pub fn dev_root(&self) -> &Path {
        &self.dev_root
    }

    /// Root of the simulated link namespace.
    pub fn namespace_root(&self) -> &Path {
        &self.namespace_root
    }

    /// Create a device node named `name` (may contain `/`, e.g. `mapper/x`).
    pub fn add_node(&self, name: &str) -> Result<PathBuf> {
        let node = self.dev_root.join(name);
        if let Some(parent) = node.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&node, b"")?;
        Ok(node)
    }

    /// Remove a device node, leaving its links behind.
    pub fn remove_node(&self, name: &str) -> Result<()> {
        fs::remove_file(self.dev_root.join(name))?;
        Ok(())
    }

    /// Publish `scheme/link_name` pointing at node `node`.
    pub fn add_link(&self, scheme: NamingScheme, link_name: &str, node: &str) -> Result<PathBuf> {
        let link = scheme.link_path(&self.namespace_root, link_name);
        self.publish(&link, node)?;
        Ok(link)
    }

    /// Retract a published link.
    pub fn remove_link(&self, scheme: NamingScheme, link_name: &str) -> Result<()> {
        let link = scheme.link_path(&self.namespace_root, link_name);
        fs::remove_file(&link)?;
        self.state.lock().owners.remove(&link);
        Ok(())
    }

    /// Make the resolver report `name` for `link`, whatever it points at.
    pub fn override_name(&self, link: &Path, name: &str) {
        self.state
            .lock()
            .overrides
            .insert(link.to_path_buf(), name.to_string());
    }

    /// Make the resolver fail for `link`.
    pub fn make_unresolvable(&self, link: &Path) {
        self.state.lock().unresolvable.insert(link.to_path_buf());
    }

    /// The next `count` settle calls time out.
    pub fn fail_next_settles(&self, count: usize) {
        self.state.lock().settle_failures = count;
    }

    /// Leave a dangling `by-partlabel` link behind on the `write`-th table write.
    pub fn leave_stale_link_on_write(&self, write: usize) {
        self.state.lock().stale_on_write = Some(write);
    }

    /// Number of settle calls so far.
    pub fn settle_calls(&self) -> usize {
        self.state.lock().settle_calls
    }

    /// Number of resolver queries so far.
    pub fn resolve_calls(&self) -> usize {
        self.state.lock().resolve_calls
    }

    /// Number of table writes so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// Number of table deletions so far.
    pub fn delete_count(&self) -> usize {
        self.state.lock().deletes
    }

    fn publish(&self, link: &Path, node: &str) -> Result<()> {
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent)?;
        }
        if fs::symlink_metadata(link).is_ok() {
            fs::remove_file(link)?;
        }
        symlink(Path::new("../..").join(node), link)?;
        self.state
            .lock()
            .owners
            .insert(link.to_path_buf(), node.to_string());
        Ok(())
    }

    fn retract(&self, link: &Path) -> Result<()> {
        match fs::remove_file(link) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.state.lock().owners.remove(link);
        Ok(())
    }

    fn base_name(device: &Path) -> Result<String> {
        if !device.exists() {
            return Err(HarnessError::invalid_input(format!(
                "no such device {}",
                device.display()
            )));
        }
        device
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| HarnessError::invalid_input(format!("bad device {}", device.display())))
    }
}

impl NameResolver for SimulatedUdev {
    fn canonical_name(&self, link: &Path) -> Result<String> {
        let mut state = self.state.lock();
        state.resolve_calls += 1;
        if state.unresolvable.contains(link) {
            return Err(HarnessError::Command {
                command: format!("udevadm info --query=name {}", link.display()),
                status: "exit status: 4".to_string(),
                stderr: "Unknown device".to_string(),
            });
        }
        if let Some(name) = state.overrides.get(link) {
            return Ok(name.clone());
        }
        state.owners.get(link).cloned().ok_or_else(|| HarnessError::Command {
            command: format!("udevadm info --query=name {}", link.display()),
            status: "exit status: 4".to_string(),
            stderr: "Unknown device".to_string(),
        })
    }
}

impl SettleBarrier for SimulatedUdev {
    fn settle(&self, timeout: Duration) -> Result<()> {
        let mut state = self.state.lock();
        state.settle_calls += 1;
        if state.settle_failures > 0 {
            state.settle_failures -= 1;
            return Err(HarnessError::barrier_timeout(
                timeout,
                Some("simulated event queue never drained".to_string()),
            ));
        }
        Ok(())
    }
}

impl PartitionTable for SimulatedUdev {
    fn delete_table(&self, device: &Path) -> Result<()> {
        Self::base_name(device)?;
        let published = {
            let mut state = self.state.lock();
            state.deletes += 1;
            state.partitions.remove(device).unwrap_or_default()
        };
        for part in published {
            for link in &part.links {
                self.retract(link)?;
            }
            match fs::remove_file(self.dev_root.join(&part.node)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn write_table(&self, device: &Path, spec: &PartitionSpec) -> Result<()> {
        spec.validate()?;
        let base = Self::base_name(device)?;
        let (write, stale_on_write) = {
            let mut state = self.state.lock();
            state.writes += 1;
            (state.writes, state.stale_on_write)
        };

        let mut published = Vec::with_capacity(spec.len());
        for (i, entry) in spec.entries().iter().enumerate() {
            let node = format!("{}{}", base, i + 1);
            self.add_node(&node)?;
            let partlabel = NamingScheme::ByPartlabel.link_path(&self.namespace_root, &entry.name);
            let partuuid = NamingScheme::ByPartuuid
                .link_path(&self.namespace_root, &Uuid::new_v4().to_string());
            self.publish(&partlabel, &node)?;
            self.publish(&partuuid, &node)?;
            published.push(Published {
                node,
                links: vec![partlabel, partuuid],
            });
        }

        if stale_on_write == Some(write) {
            let stale = NamingScheme::ByPartlabel
                .link_path(&self.namespace_root, &format!("stale-{}", write));
            self.publish(&stale, &format!("{}-gone", base))?;
        }

        self.state
            .lock()
            .partitions
            .insert(device.to_path_buf(), published);
        Ok(())
    }
}
