//! Topology Churn Driver
//!
//! Repeatedly destroys and recreates the partition table of one device while
//! the naming daemon catches up asynchronously. Every `check_every`
//! iterations a settle barrier runs followed by a full namespace check; the
//! first barrier with any violation aborts the run.

use crate::environment::Environment;
use crate::scenario::Scenario;
use linkguard_core::{
    ChurnConfig, ChurnFailure, ChurnIteration, HarnessError, NamingScheme, PartitionSpec, Result,
    ScenarioRng,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Drives partition table churn against one environment.
#[derive(Debug)]
pub struct ChurnDriver<'a> {
    env: &'a Environment,
}

impl<'a> ChurnDriver<'a> {
    /// Driver over the partition table and checker of `env`.
    pub fn new(env: &'a Environment) -> Self {
        ChurnDriver { env }
    }

    /// Delete and recreate the table on `device` `iterations` times.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a zero iteration count, zero check interval or
    ///   invalid spec, before the device is touched
    /// - `Churn` with the barrier's iteration and full report on any violation
    /// - adapter errors (`Command`, `BarrierTimeout`) as soon as they occur
    pub fn run_churn(
        &self,
        device: &Path,
        spec: &PartitionSpec,
        iterations: usize,
        check_every: usize,
    ) -> Result<()> {
        if iterations == 0 {
            return Err(HarnessError::invalid_input("churn needs at least one iteration"));
        }
        if check_every == 0 {
            return Err(HarnessError::invalid_input("check interval must be at least 1"));
        }
        spec.validate()?;

        info!(
            target: "linkguard::churn",
            device = %device.display(),
            partitions = spec.len(),
            iterations,
            check_every,
            "Starting partition churn"
        );

        for index in 1..=iterations {
            let iteration = ChurnIteration { index, spec };
            self.env.partitions().delete_table(device)?;
            self.env.partitions().write_table(device, iteration.spec)?;
            if iteration.is_barrier(check_every) {
                self.barrier(index)?;
                debug!(target: "linkguard::churn", iteration = index, "Barrier passed");
            }
        }

        // The last iteration may already have been checked.
        if !(ChurnIteration { index: iterations, spec }).is_barrier(check_every) {
            self.barrier(iterations)?;
        }
        let expected: Vec<PathBuf> = spec
            .names()
            .map(|name| NamingScheme::ByPartlabel.link_path(self.env.namespace_root(), name))
            .collect();
        self.env
            .checker()
            .check_links(&expected)
            .map_err(|report| ChurnFailure {
                iteration: iterations,
                report,
            })?;

        info!(
            target: "linkguard::churn",
            device = %device.display(),
            iterations,
            "Partition churn completed"
        );
        Ok(())
    }

    fn barrier(&self, iteration: usize) -> Result<()> {
        self.env.settle()?;
        self.env
            .checker()
            .check_all(self.env.namespace_root())
            .map_err(|report| ChurnFailure { iteration, report })?;
        Ok(())
    }
}

/// `churn`: partition table churn with the configured layout.
#[derive(Debug, Clone)]
pub struct ChurnScenario {
    config: ChurnConfig,
}

impl ChurnScenario {
    /// Churn scenario configured from `[churn]`.
    pub fn new(config: ChurnConfig) -> Self {
        ChurnScenario { config }
    }
}

impl Scenario for ChurnScenario {
    fn name(&self) -> &str {
        "churn"
    }

    fn description(&self) -> &str {
        "delete and recreate a GPT partition table, checking links at settle barriers"
    }

    fn run(&self, env: &Environment, _rng: &mut ScenarioRng) -> Result<()> {
        let device = self
            .config
            .device
            .as_deref()
            .ok_or_else(|| HarnessError::config("churn.device is not set"))?;
        ChurnDriver::new(env).run_churn(
            device,
            &self.config.partition_spec(),
            self.config.iterations,
            self.config.check_every,
        )
    }
}
