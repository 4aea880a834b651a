//! Settle barrier
//!
//! The only point where the harness suspends: it blocks until the naming
//! daemon has drained its event queue, bounded by a timeout.

use crate::command;
use linkguard_core::{HarnessError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Poll interval used while waiting for links to appear.
pub const LINK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Blocking wait for external quiescence.
pub trait SettleBarrier: Send + Sync {
    /// Return once no naming events are pending.
    ///
    /// # Errors
    ///
    /// `HarnessError::BarrierTimeout` if quiescence is not reached within
    /// `timeout`.
    fn settle(&self, timeout: Duration) -> Result<()>;

    /// Settle, then wait until every path in `paths` exists.
    ///
    /// The whole wait, settle included, is bounded by `timeout`.
    fn wait_for(&self, paths: &[PathBuf], timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        self.settle(timeout)?;
        loop {
            let missing: Vec<&PathBuf> = paths.iter().filter(|p| !p.exists()).collect();
            if missing.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                let detail = missing
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(HarnessError::barrier_timeout(
                    timeout,
                    Some(format!("missing: {}", detail)),
                ));
            }
            thread::sleep(LINK_POLL_INTERVAL);
        }
    }
}

/// Barrier backed by `udevadm settle --timeout=N`.
#[derive(Debug, Clone)]
pub struct UdevadmSettle {
    program: PathBuf,
}

impl UdevadmSettle {
    /// Use `udevadm` from `PATH`.
    pub fn new() -> Self {
        UdevadmSettle {
            program: PathBuf::from("udevadm"),
        }
    }

    /// Use a specific `udevadm` binary.
    pub fn with_program(program: impl AsRef<Path>) -> Self {
        UdevadmSettle {
            program: program.as_ref().to_path_buf(),
        }
    }
}

impl Default for UdevadmSettle {
    fn default() -> Self {
        Self::new()
    }
}

impl SettleBarrier for UdevadmSettle {
    fn settle(&self, timeout: Duration) -> Result<()> {
        // udevadm only takes whole seconds; never pass 0, which means "don't wait".
        let secs = timeout.as_secs().max(1);
        let started = Instant::now();
        match command::run(
            Command::new(&self.program)
                .arg("settle")
                .arg(format!("--timeout={}", secs)),
        ) {
            Ok(_) => {
                debug!(target: "linkguard::settle", elapsed_ms = started.elapsed().as_millis() as u64, "Settled");
                Ok(())
            }
            // A missing or unspawnable udevadm is an environment fault, not a timeout.
            Err(HarnessError::Command { status, stderr, .. }) if status != command::NOT_STARTED => Err(
                HarnessError::barrier_timeout(timeout, (!stderr.is_empty()).then_some(stderr)),
            ),
            Err(e) => Err(e),
        }
    }
}
