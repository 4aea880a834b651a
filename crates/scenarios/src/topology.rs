//! Namespace-level scenarios: multipath topology and the bare symlink check.

use crate::environment::Environment;
use crate::scenario::Scenario;
use linkguard_core::{HarnessError, NamingScheme, Result, ScenarioRng, TopologyConfig};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Prefix of whole-disk WWN links under `by-id`.
pub const WWN_PREFIX: &str = "wwn-0x";

/// WWIDs of every whole-disk `wwn-0x<wwid>` link under `by-id`.
///
/// Partition links (`...-partN`) are skipped.
pub fn wwn_groups(namespace_root: &Path) -> Result<BTreeSet<String>> {
    let dir = namespace_root.join(NamingScheme::ById.dir_name());
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e.into()),
    };
    let mut wwids = BTreeSet::new();
    for entry in entries {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if let Some(wwid) = name.strip_prefix(WWN_PREFIX) {
            if !wwid.contains("-part") {
                wwids.insert(wwid.to_string());
            }
        }
    }
    Ok(wwids)
}

/// `multipath_topology`: group count and per-group path count.
#[derive(Debug, Clone)]
pub struct MultipathTopologyScenario {
    config: TopologyConfig,
}

impl MultipathTopologyScenario {
    /// Topology scenario expecting `config.groups` groups.
    pub fn new(config: TopologyConfig) -> Self {
        MultipathTopologyScenario { config }
    }
}

impl Scenario for MultipathTopologyScenario {
    fn name(&self) -> &str {
        "multipath_topology"
    }

    fn description(&self) -> &str {
        "every wwn-0x link is a multipath group with the expected number of paths"
    }

    fn run(&self, env: &Environment, _rng: &mut ScenarioRng) -> Result<()> {
        let wwids = wwn_groups(env.namespace_root())?;
        let mut problems = Vec::new();
        if wwids.len() != self.config.expected_groups {
            problems.push(format!(
                "found {} groups, expected {}",
                wwids.len(),
                self.config.expected_groups
            ));
        }
        for wwid in &wwids {
            let paths = env.multipath().paths(wwid)?;
            debug!(target: "linkguard::topology", %wwid, paths = paths.len(), "Queried group");
            if paths.len() != self.config.paths_per_group {
                problems.push(format!(
                    "group {} has {} paths, expected {}",
                    wwid,
                    paths.len(),
                    self.config.paths_per_group
                ));
            }
        }
        info!(
            target: "linkguard::topology",
            groups = wwids.len(),
            problems = problems.len(),
            "Checked multipath topology"
        );
        if problems.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::expectation(problems.join("; ")))
        }
    }
}

/// `symlink_check`: nothing but the orchestrator's pre- and post-checks.
#[derive(Debug, Clone, Default)]
pub struct SymlinkCheckScenario;

impl Scenario for SymlinkCheckScenario {
    fn name(&self) -> &str {
        "symlink_check"
    }

    fn description(&self) -> &str {
        "settle and validate every device link"
    }

    fn run(&self, _env: &Environment, _rng: &mut ScenarioRng) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_core::HarnessConfig;
    use linkguard_probe::testing::{SimulatedMultipath, SimulatedUdev};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup(groups: usize, paths: usize) -> (TempDir, Arc<SimulatedUdev>, Environment) {
        let dir = TempDir::new().unwrap();
        let udev = Arc::new(SimulatedUdev::new(dir.path()).unwrap());
        let multipath = Arc::new(SimulatedMultipath::with_groups(groups, paths));
        for (i, wwid) in multipath.wwids().iter().enumerate() {
            let node = format!("dm-{}", i);
            udev.add_node(&node).unwrap();
            udev.add_link(NamingScheme::ById, &format!("{}{}", WWN_PREFIX, wwid), &node)
                .unwrap();
            udev.add_link(NamingScheme::ById, &format!("{}{}-part1", WWN_PREFIX, wwid), &node)
                .unwrap();
        }
        let env = Environment::builder(HarnessConfig::default())
            .roots(udev.namespace_root(), udev.dev_root())
            .resolver(udev.clone())
            .multipath(multipath)
            .build();
        (dir, udev, env)
    }

    #[test]
    fn test_reference_topology_passes() {
        let (_dir, _udev, env) = setup(64, 4);
        MultipathTopologyScenario::new(TopologyConfig::default())
            .run(&env, &mut ScenarioRng::from_seed(0))
            .unwrap();
    }

    #[test]
    fn test_partition_links_are_not_groups() {
        let (_dir, udev, _env) = setup(3, 2);
        assert_eq!(wwn_groups(udev.namespace_root()).unwrap().len(), 3);
    }

    #[test]
    fn test_wrong_cardinality_is_reported() {
        let (_dir, _udev, env) = setup(64, 3);
        let err = MultipathTopologyScenario::new(TopologyConfig::default())
            .run(&env, &mut ScenarioRng::from_seed(0))
            .unwrap_err();
        assert!(err.to_string().contains("has 3 paths, expected 4"));
    }

    #[test]
    fn test_missing_groups_are_reported() {
        let (_dir, _udev, env) = setup(2, 4);
        let err = MultipathTopologyScenario::new(TopologyConfig::default())
            .run(&env, &mut ScenarioRng::from_seed(0))
            .unwrap_err();
        assert!(err.to_string().contains("found 2 groups, expected 64"));
    }

    #[test]
    fn test_link_without_group_is_an_error() {
        let (_dir, udev, env) = setup(1, 4);
        udev.add_node("sdz").unwrap();
        udev.add_link(NamingScheme::ById, "wwn-0xfeedface", "sdz").unwrap();
        let config = TopologyConfig {
            expected_groups: 2,
            paths_per_group: 4,
        };
        assert!(MultipathTopologyScenario::new(config)
            .run(&env, &mut ScenarioRng::from_seed(0))
            .is_err());
    }
}
