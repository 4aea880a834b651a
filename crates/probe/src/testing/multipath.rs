//! In-process multipath groups with controllable path states.

use crate::multipath::MultipathStatus;
use crate::paths::PathControl;
use linkguard_core::{Device, DeviceState, Hctl, HarnessError, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::io;

type TransitionHook = Box<dyn Fn(&Hctl, DeviceState) + Send + Sync>;

/// Simulated multipath daemon plus sysfs path control.
///
/// Every group's paths live on distinct hosts, so addresses are unique
/// across the whole simulation.
#[derive(Default)]
pub struct SimulatedMultipath {
    groups: Mutex<BTreeMap<String, Vec<Device>>>,
    ignored: Mutex<HashSet<Hctl>>,
    hooks: Mutex<Vec<TransitionHook>>,
    transitions: Mutex<Vec<(Hctl, DeviceState)>>,
    next_host: Mutex<u32>,
}

impl SimulatedMultipath {
    /// An empty simulation.
    pub fn new() -> Self {
        Self::default()
    }

    /// `groups` groups of `paths` running paths each, with WWIDs
    /// `deaddeadbeef0000`, `deaddeadbeef0001`, ...
    pub fn with_groups(groups: usize, paths: usize) -> Self {
        let sim = Self::new();
        for i in 0..groups {
            sim.add_group(&format!("deaddeadbeef{:04x}", i), paths);
        }
        sim
    }

    /// Add a group of `paths` running paths and return their addresses.
    pub fn add_group(&self, wwid: &str, paths: usize) -> Vec<Hctl> {
        let mut next_host = self.next_host.lock();
        let devices: Vec<Device> = (0..paths)
            .map(|_| {
                let address = Hctl::new(*next_host, 0, 0, 0);
                *next_host += 1;
                Device::running(address)
            })
            .collect();
        let addresses = devices.iter().map(|d| d.address).collect();
        self.groups.lock().insert(wwid.to_string(), devices);
        addresses
    }

    /// Writes to `address` are accepted but have no effect.
    pub fn ignore_writes_to(&self, address: Hctl) {
        self.ignored.lock().insert(address);
    }

    /// Run `hook` after every applied transition.
    pub fn on_transition<F>(&self, hook: F)
    where
        F: Fn(&Hctl, DeviceState) + Send + Sync + 'static,
    {
        self.hooks.lock().push(Box::new(hook));
    }

    /// Every transition requested so far, in order.
    pub fn transitions(&self) -> Vec<(Hctl, DeviceState)> {
        self.transitions.lock().clone()
    }

    /// WWIDs of all groups.
    pub fn wwids(&self) -> Vec<String> {
        self.groups.lock().keys().cloned().collect()
    }
}

impl PathControl for SimulatedMultipath {
    fn set_state(&self, address: &Hctl, state: DeviceState) -> Result<()> {
        self.transitions.lock().push((*address, state));
        if !self.ignored.lock().contains(address) {
            let mut groups = self.groups.lock();
            let device = groups
                .values_mut()
                .flat_map(|members| members.iter_mut())
                .find(|d| d.address == *address)
                .ok_or_else(|| {
                    HarnessError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no scsi device {}", address),
                    ))
                })?;
            device.state = state;
        }
        for hook in self.hooks.lock().iter() {
            hook(address, state);
        }
        Ok(())
    }

    fn state(&self, address: &Hctl) -> Result<DeviceState> {
        self.groups
            .lock()
            .values()
            .flatten()
            .find(|d| d.address == *address)
            .map(|d| d.state)
            .ok_or_else(|| {
                HarnessError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no scsi device {}", address),
                ))
            })
    }
}

impl MultipathStatus for SimulatedMultipath {
    fn paths(&self, wwid: &str) -> Result<Vec<Device>> {
        self.groups
            .lock()
            .get(wwid)
            .cloned()
            .ok_or_else(|| HarnessError::Command {
                command: format!("multipath -l {}", wwid),
                status: "exit status: 1".to_string(),
                stderr: format!("{}: no such multipath map", wwid),
            })
    }
}
