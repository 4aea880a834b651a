//! Scenario Registry
//!
//! Maps scenario names to handlers. Names are unique; lookup of a name that
//! was never registered is an `UnknownScenario` error carrying the known
//! names.

use crate::churn::ChurnScenario;
use crate::failover::FailoverScenario;
use crate::inventory::{DeviceCountScenario, DuplicateLabelScenario};
use crate::scenario::Scenario;
use crate::topology::{MultipathTopologyScenario, SymlinkCheckScenario};
use linkguard_core::{HarnessConfig, HarnessError, Result};
use std::collections::BTreeMap;

/// Named scenario handlers.
#[derive(Default)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, Box<dyn Scenario>>,
}

impl ScenarioRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in scenario, parameterized from `config`.
    pub fn standard(config: &HarnessConfig) -> Self {
        let builtins: Vec<Box<dyn Scenario>> = vec![
            Box::new(ChurnScenario::new(config.churn.clone())),
            Box::new(FailoverScenario::new(config.failover.clone())),
            Box::new(MultipathTopologyScenario::new(config.multipath_topology.clone())),
            Box::new(DeviceCountScenario::new(config.device_count.clone())),
            Box::new(DuplicateLabelScenario::new(config.duplicate_labels.clone())),
            Box::new(SymlinkCheckScenario),
        ];
        let mut registry = Self::new();
        for scenario in builtins {
            registry
                .scenarios
                .insert(scenario.name().to_string(), scenario);
        }
        registry
    }

    /// Add a handler under its own name.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the name is already taken.
    pub fn register(&mut self, scenario: Box<dyn Scenario>) -> Result<()> {
        let name = scenario.name().to_string();
        if self.scenarios.contains_key(&name) {
            return Err(HarnessError::invalid_input(format!(
                "scenario '{}' is already registered",
                name
            )));
        }
        self.scenarios.insert(name, scenario);
        Ok(())
    }

    /// Handler registered under `name`.
    pub fn get(&self, name: &str) -> Result<&dyn Scenario> {
        self.scenarios
            .get(name)
            .map(|s| s.as_ref())
            .ok_or_else(|| HarnessError::UnknownScenario {
                name: name.to_string(),
                known: self.names(),
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.scenarios.keys().cloned().collect()
    }

    /// `(name, description)` pairs, sorted by name.
    pub fn describe(&self) -> Vec<(&str, &str)> {
        self.scenarios
            .values()
            .map(|s| (s.name(), s.description()))
            .collect()
    }

    /// Number of registered scenarios.
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl std::fmt::Debug for ScenarioRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRegistry")
            .field("scenarios", &self.names())
            .finish()
    }
}
