//! Failover Validator
//!
//! Takes the paths of one multipath group offline one at a time while a
//! filesystem on the group's data partition stays mounted, asserting after
//! every step that:
//!
//! - the counter file written through the mount still reads back
//! - every alias of the data partition still resolves to the right node
//! - the group keeps at least one running path
//!
//! and at the end that exactly the reserved paths are still running.
//!
//! The mount point and every path taken offline are owned by a
//! [`FailoverSession`] whose `Drop` releases them, whatever the outcome.

use crate::environment::Environment;
use crate::scenario::Scenario;
use linkguard_core::{
    DeviceState, FailoverConfig, FailoverViolation, HarnessError, Hctl, MultipathGroup, Result,
    ScenarioRng,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a completed failover run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverReport {
    /// Group under test
    pub wwid: String,
    /// Alias the data partition was mounted through
    pub active_alias: PathBuf,
    /// Paths taken offline, in order
    pub deactivated: Vec<Hctl>,
    /// Paths held back
    pub reserved: Vec<Hctl>,
    /// Last counter value written and read back
    pub final_counter: u64,
}

/// Runs the failover protocol for one group.
#[derive(Debug)]
pub struct FailoverValidator<'a> {
    env: &'a Environment,
    config: &'a FailoverConfig,
}

impl<'a> FailoverValidator<'a> {
    /// Validator for the group described by `config`.
    pub fn new(env: &'a Environment, config: &'a FailoverConfig) -> Self {
        FailoverValidator { env, config }
    }

    /// Run the protocol, taking every randomized choice from `rng`.
    ///
    /// # Errors
    ///
    /// - `BarrierTimeout` if the aliases never appear
    /// - `Failover` for any broken failover invariant
    /// - adapter errors from mount, path control or status queries
    pub fn run(&self, rng: &mut ScenarioRng) -> Result<FailoverReport> {
        let config = self.config;
        let wwid = config.wwid.as_str();
        let aliases = config.alias_paths(self.env.namespace_root());
        if aliases.is_empty() {
            return Err(HarnessError::config("failover.aliases must not be empty"));
        }

        self.env
            .checker()
            .wait_for_links(self.env.barrier(), &aliases, config.link_timeout())?;

        let members = self.env.multipath().paths(wwid)?;
        if members.len() != config.expected_paths {
            return Err(FailoverViolation::PathCount {
                wwid: wwid.to_string(),
                expected: config.expected_paths,
                found: members.len(),
            }
            .into());
        }
        if config.reserved_paths == 0 || config.reserved_paths >= members.len() {
            return Err(FailoverViolation::InvalidReservation {
                wwid: wwid.to_string(),
                reserved: config.reserved_paths,
                total: members.len(),
            }
            .into());
        }

        let active_alias = rng
            .pick(&aliases)
            .cloned()
            .ok_or_else(|| HarnessError::config("failover.aliases must not be empty"))?;
        let mut group = MultipathGroup::new(wwid, members, active_alias.clone());

        let mut order: Vec<Hctl> = group.members.iter().map(|d| d.address).collect();
        rng.shuffle(&mut order);
        let (selected, reserved) = order.split_at(order.len() - config.reserved_paths);

        info!(
            target: "linkguard::failover",
            wwid,
            alias = %active_alias.display(),
            deactivate = ?selected,
            reserve = ?reserved,
            "Starting failover"
        );

        let mut session = FailoverSession::new(self.env, config.restore_paths);
        let mountpoint = session.mount(&active_alias, &config.mount_root)?;
        let counter = mountpoint.join(&config.counter_file);

        let mut value = config.initial_counter;
        write_counter(&counter, value)?;
        verify_counter(&counter, value)?;

        for address in selected {
            group.deactivate(address)?;
            session.take_offline(address)?;

            verify_counter(&counter, value)?;
            value += 1;
            write_counter(&counter, value)?;
            verify_counter(&counter, value)?;

            self.env
                .checker()
                .check_links(&aliases)
                .map_err(|report| FailoverViolation::StaleAlias {
                    wwid: wwid.to_string(),
                    address: *address,
                    report,
                })?;

            let (running, offline) = self.env.multipath().counts(wwid)?;
            debug!(
                target: "linkguard::failover",
                wwid,
                path = %address,
                running,
                offline,
                counter = value,
                "Path taken offline"
            );
            if running == 0 {
                return Err(FailoverViolation::LastPathLost {
                    wwid: wwid.to_string(),
                }
                .into());
            }
        }

        let (running, offline) = self.env.multipath().counts(wwid)?;
        if (running, offline) != (reserved.len(), selected.len()) {
            return Err(FailoverViolation::FinalCounts {
                wwid: wwid.to_string(),
                expected_running: reserved.len(),
                expected_offline: selected.len(),
                running,
                offline,
            }
            .into());
        }

        info!(
            target: "linkguard::failover",
            wwid,
            running,
            offline,
            counter = value,
            "Failover completed"
        );
        Ok(FailoverReport {
            wwid: wwid.to_string(),
            active_alias,
            deactivated: selected.to_vec(),
            reserved: reserved.to_vec(),
            final_counter: value,
        })
    }
}

fn write_counter(path: &Path, value: u64) -> Result<()> {
    let written = fs::File::create(path).and_then(|mut file| {
        file.write_all(value.to_string().as_bytes())?;
        file.sync_all()
    });
    written.map_err(|e| {
        FailoverViolation::Continuity {
            path: path.to_path_buf(),
            expected: value.to_string(),
            actual: format!("<write failed: {}>", e),
        }
        .into()
    })
}

fn verify_counter(path: &Path, value: u64) -> Result<()> {
    let expected = value.to_string();
    let actual = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => format!("<read failed: {}>", e),
    };
    if actual != expected {
        return Err(FailoverViolation::Continuity {
            path: path.to_path_buf(),
            expected,
            actual,
        }
        .into());
    }
    Ok(())
}

// ============================================================================
// Cleanup guard
// ============================================================================

/// Resources acquired by one failover run.
///
/// Dropping the session unmounts and removes the mount point, then (when
/// enabled) writes `running` back to every path this run took offline.
/// Cleanup failures are logged, never propagated.
pub struct FailoverSession<'a> {
    env: &'a Environment,
    mountpoint: Option<PathBuf>,
    mounted: bool,
    offlined: Vec<Hctl>,
    restore_paths: bool,
}

impl<'a> FailoverSession<'a> {
    /// An empty session; `restore_paths` brings offlined paths back on drop.
    pub fn new(env: &'a Environment, restore_paths: bool) -> Self {
        FailoverSession {
            env,
            mountpoint: None,
            mounted: false,
            offlined: Vec::new(),
            restore_paths,
        }
    }

    /// Create a private mount point under `mount_root` and mount `source` there.
    pub fn mount(&mut self, source: &Path, mount_root: &Path) -> Result<PathBuf> {
        fs::create_dir_all(mount_root)?;
        let id = Uuid::new_v4().simple().to_string();
        let mountpoint = mount_root.join(format!("mpath.{}", &id[..8]));
        fs::create_dir(&mountpoint)?;
        self.mountpoint = Some(mountpoint.clone());

        self.env.mounter().mount(source, &mountpoint)?;
        self.mounted = true;
        debug!(
            target: "linkguard::failover",
            source = %source.display(),
            mountpoint = %mountpoint.display(),
            "Mounted data partition"
        );
        Ok(mountpoint)
    }

    /// Write `offline` to `address`, remembering it for restoration.
    pub fn take_offline(&mut self, address: &Hctl) -> Result<()> {
        self.env.paths().set_state(address, DeviceState::Offline)?;
        self.offlined.push(*address);
        Ok(())
    }

    /// Paths taken offline so far.
    pub fn offlined(&self) -> &[Hctl] {
        &self.offlined
    }

    fn release(&mut self) {
        if let Some(mountpoint) = self.mountpoint.take() {
            let unmounted = if self.mounted {
                match self.env.mounter().unmount(&mountpoint) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(
                            target: "linkguard::failover",
                            mountpoint = %mountpoint.display(),
                            error = %e,
                            "Unmount failed, leaving mount point in place"
                        );
                        false
                    }
                }
            } else {
                true
            };
            if unmounted {
                if let Err(e) = fs::remove_dir_all(&mountpoint) {
                    warn!(
                        target: "linkguard::failover",
                        mountpoint = %mountpoint.display(),
                        error = %e,
                        "Failed to remove mount point"
                    );
                }
            }
        }

        if self.restore_paths {
            for address in self.offlined.drain(..).rev() {
                if let Err(e) = self.env.paths().set_state(&address, DeviceState::Running) {
                    warn!(
                        target: "linkguard::failover",
                        path = %address,
                        error = %e,
                        "Failed to restore path"
                    );
                }
            }
        }
    }
}

impl Drop for FailoverSession<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// `multipath_failover`: path failover under a mounted filesystem.
#[derive(Debug, Clone)]
pub struct FailoverScenario {
    config: FailoverConfig,
}

impl FailoverScenario {
    /// Failover scenario configured from `[failover]`.
    pub fn new(config: FailoverConfig) -> Self {
        FailoverScenario { config }
    }
}

impl Scenario for FailoverScenario {
    fn name(&self) -> &str {
        "multipath_failover"
    }

    fn description(&self) -> &str {
        "take multipath paths offline under a mounted filesystem, checking aliases and data"
    }

    fn run(&self, env: &Environment, rng: &mut ScenarioRng) -> Result<()> {
        FailoverValidator::new(env, &self.config).run(rng).map(|_| ())
    }
}
