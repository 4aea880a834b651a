//! Static inventory scenarios: device counts per transport and duplicate
//! labels.

use crate::environment::Environment;
use crate::scenario::Scenario;
use linkguard_core::{DeviceCountConfig, HarnessError, LabelConfig, Result, ScenarioRng};
use tracing::info;

/// `device_count`: at least a minimum number of devices per transport.
#[derive(Debug, Clone)]
pub struct DeviceCountScenario {
    config: DeviceCountConfig,
}

impl DeviceCountScenario {
    /// Device count scenario with per-transport minimums.
    pub fn new(config: DeviceCountConfig) -> Self {
        DeviceCountScenario { config }
    }
}

impl Scenario for DeviceCountScenario {
    fn name(&self) -> &str {
        "device_count"
    }

    fn description(&self) -> &str {
        "block inventory reports the expected minimum of devices per transport"
    }

    fn run(&self, env: &Environment, _rng: &mut ScenarioRng) -> Result<()> {
        let mut shortfalls = Vec::new();
        for minimum in &self.config.minimums {
            let found = env.inventory().count_transport(&minimum.transport)?;
            info!(
                target: "linkguard::inventory",
                transport = %minimum.transport,
                found,
                minimum = minimum.minimum,
                "Counted devices"
            );
            if found < minimum.minimum {
                shortfalls.push(format!(
                    "{}: found {}, expected at least {}",
                    minimum.transport, found, minimum.minimum
                ));
            }
        }
        if shortfalls.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::expectation(shortfalls.join("; ")))
        }
    }
}

/// `duplicate_labels`: the same label published an exact number of times.
#[derive(Debug, Clone)]
pub struct DuplicateLabelScenario {
    config: LabelConfig,
}

impl DuplicateLabelScenario {
    /// Duplicate label scenario.
    pub fn new(config: LabelConfig) -> Self {
        DuplicateLabelScenario { config }
    }
}

impl Scenario for DuplicateLabelScenario {
    fn name(&self) -> &str {
        "duplicate_labels"
    }

    fn description(&self) -> &str {
        "count devices sharing one partition or filesystem label"
    }

    fn run(&self, env: &Environment, _rng: &mut ScenarioRng) -> Result<()> {
        let LabelConfig {
            label,
            scheme,
            expected,
        } = &self.config;
        let found = env.inventory().count_label(*scheme, label)?;
        info!(
            target: "linkguard::inventory",
            %label,
            %scheme,
            found,
            expected,
            "Counted labels"
        );
        if found != *expected {
            return Err(HarnessError::expectation(format!(
                "{} '{}': found {}, expected {}",
                scheme, label, found, expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_core::{HarnessConfig, NamingScheme, TransportMinimum};
    use linkguard_probe::testing::StaticInventory;
    use linkguard_probe::SCSI_TRANSPORT;
    use std::sync::Arc;

    fn env(inventory: StaticInventory) -> Environment {
        Environment::builder(HarnessConfig::default())
            .inventory(Arc::new(inventory))
            .build()
    }

    #[test]
    fn test_reference_device_counts_pass() {
        let env = env(
            StaticInventory::new()
                .with_disks("sd", 128, SCSI_TRANSPORT)
                .with_disks("nvme", 28, "nvme"),
        );
        let scenario = DeviceCountScenario::new(DeviceCountConfig::default());
        scenario.run(&env, &mut ScenarioRng::from_seed(0)).unwrap();
    }

    #[test]
    fn test_shortfall_names_every_transport() {
        let env = env(
            StaticInventory::new()
                .with_disks("sd", 100, SCSI_TRANSPORT)
                .with_disks("nvme", 3, "nvme"),
        );
        let scenario = DeviceCountScenario::new(DeviceCountConfig::default());
        let err = scenario.run(&env, &mut ScenarioRng::from_seed(0)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("scsi: found 100"));
        assert!(msg.contains("nvme: found 3"));
    }

    #[test]
    fn test_custom_transport_minimum() {
        let env = env(StaticInventory::new().with_disks("vd", 2, "virtio"));
        let scenario = DeviceCountScenario::new(DeviceCountConfig {
            minimums: vec![TransportMinimum {
                transport: "virtio".to_string(),
                minimum: 2,
            }],
        });
        scenario.run(&env, &mut ScenarioRng::from_seed(0)).unwrap();
    }

    #[test]
    fn test_duplicate_labels_exact() {
        let env = env(StaticInventory::new().with_labeled_partitions("sd", 16, 8, "Hello world"));
        let scenario = DuplicateLabelScenario::new(LabelConfig::default());
        scenario.run(&env, &mut ScenarioRng::from_seed(0)).unwrap();
    }

    #[test]
    fn test_duplicate_labels_too_many() {
        let env = env(StaticInventory::new().with_labeled_partitions("sd", 17, 8, "Hello world"));
        let scenario = DuplicateLabelScenario::new(LabelConfig::default());
        let err = scenario.run(&env, &mut ScenarioRng::from_seed(0)).unwrap_err();
        assert!(err.to_string().contains("found 136, expected 128"));
    }

    #[test]
    fn test_duplicate_labels_other_scheme() {
        let env = env(StaticInventory::new().with_labeled_partitions("sd", 16, 8, "Hello world"));
        let scenario = DuplicateLabelScenario::new(LabelConfig {
            scheme: NamingScheme::ByLabel,
            ..LabelConfig::default()
        });
        assert!(scenario.run(&env, &mut ScenarioRng::from_seed(0)).is_err());
    }
}
