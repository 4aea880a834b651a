//! Scenario Orchestrator
//!
//! Dispatches one named scenario and wraps it with a settle barrier and a
//! full namespace check before and after. The pre-check decides whether the
//! environment is usable at all; the post-check always runs once the handler
//! was attempted. The run ends with exactly one finalized [`ScenarioResult`].

use crate::environment::Environment;
use crate::marker::ResultMarker;
use crate::registry::ScenarioRegistry;
use crate::scenario::Scenario;
use linkguard_core::{Result, ScenarioResult, ScenarioRng};
use tracing::{error, info, warn};

/// Runs registered scenarios against one environment.
#[derive(Debug)]
pub struct Orchestrator {
    env: Environment,
    registry: ScenarioRegistry,
    marker: Option<ResultMarker>,
    seed: Option<u64>,
}

impl Orchestrator {
    /// Orchestrator without a result marker, seeded from the environment's
    /// configuration.
    pub fn new(env: Environment, registry: ScenarioRegistry) -> Self {
        let seed = env.config().seed;
        Orchestrator {
            env,
            registry,
            marker: None,
            seed,
        }
    }

    /// Persist results through `marker`.
    pub fn with_marker(mut self, marker: ResultMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Fixed seed for every run; `None` draws a fresh one per run.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Environment scenarios run against.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Scenarios this orchestrator dispatches.
    pub fn registry(&self) -> &ScenarioRegistry {
        &self.registry
    }

    /// Run the scenario registered as `name`.
    ///
    /// Scenario failures are reported in the returned result, never as `Err`.
    ///
    /// # Errors
    ///
    /// - `UnknownScenario` before any marker write or mutation
    /// - marker I/O failures
    pub fn run(&self, name: &str) -> Result<ScenarioResult> {
        let scenario = self.registry.get(name)?;
        let seed = self.seed.unwrap_or_else(ScenarioRng::fresh_seed);
        let result = ScenarioResult::dispatched(name, seed);
        if let Some(marker) = &self.marker {
            marker.begin(&result)?;
        }
        info!(target: "linkguard::orchestrator", scenario = name, seed, "Dispatching scenario");

        let failures = self.execute(scenario, seed);
        let result = result.finalize(failures);

        if let Some(marker) = &self.marker {
            marker.finish(&result)?;
        }
        if result.is_pass() {
            info!(target: "linkguard::orchestrator", scenario = name, seed, "Scenario passed");
        } else {
            error!(
                target: "linkguard::orchestrator",
                scenario = name,
                seed,
                detail = result.failure_detail.as_deref().unwrap_or_default(),
                "Scenario failed"
            );
        }
        Ok(result)
    }

    fn execute(&self, scenario: &dyn Scenario, seed: u64) -> Vec<String> {
        let mut failures = Vec::new();

        if let Err(e) = self.env.settle_and_check() {
            warn!(target: "linkguard::orchestrator", error = %e, "Pre-check failed");
            failures.push(format!("pre-check: {}", e));
            return failures;
        }

        let mut rng = ScenarioRng::from_seed(seed);
        if let Err(e) = scenario.run(&self.env, &mut rng) {
            warn!(
                target: "linkguard::orchestrator",
                scenario = scenario.name(),
                error = %e,
                "Scenario handler failed"
            );
            failures.push(format!("{}: {}", scenario.name(), e));
        }

        if let Err(e) = self.env.settle_and_check() {
            warn!(target: "linkguard::orchestrator", error = %e, "Post-check failed");
            failures.push(format!("post-check: {}", e));
        }
        failures
    }
}
