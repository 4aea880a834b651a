//! The scenario handler trait.

use crate::environment::Environment;
use linkguard_core::{Result, ScenarioRng};

/// A named verification scenario.
///
/// Handlers run between the orchestrator's pre- and post-checks and take
/// every randomized decision from the supplied `rng`, so a recorded seed
/// replays the same run.
pub trait Scenario: Send + Sync {
    /// Registry name, e.g. `multipath_failover`.
    fn name(&self) -> &str;

    /// One-line description shown by `linkguard list`.
    fn description(&self) -> &str;

    /// Run the scenario body.
    ///
    /// # Errors
    ///
    /// The first failed assertion, or the adapter error that aborted the run.
    fn run(&self, env: &Environment, rng: &mut ScenarioRng) -> Result<()>;
}
