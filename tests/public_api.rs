//! The facade crate exposes everything needed to drive a scenario.

use linkguard::testing::SimulatedUdev;
use linkguard::{
    Environment, HarnessConfig, NamingScheme, Orchestrator, ScenarioOutcome, ScenarioRegistry,
    SymlinkViolation,
};
use std::sync::Arc;
use tempfile::TempDir;

fn orchestrator(dir: &TempDir) -> (Arc<SimulatedUdev>, Orchestrator) {
    let udev = Arc::new(SimulatedUdev::new(dir.path()).unwrap());
    let config = HarnessConfig {
        namespace_root: udev.namespace_root().to_path_buf(),
        dev_root: udev.dev_root().to_path_buf(),
        seed: Some(5),
        ..HarnessConfig::default()
    };
    let env = Environment::builder(config.clone())
        .resolver(udev.clone())
        .barrier(udev.clone())
        .build();
    (udev, Orchestrator::new(env, ScenarioRegistry::standard(&config)))
}

#[test]
fn test_symlink_check_through_facade() {
    let dir = TempDir::new().unwrap();
    let (udev, orchestrator) = orchestrator(&dir);
    udev.add_node("sda1").unwrap();
    udev.add_link(NamingScheme::ByLabel, "root", "sda1").unwrap();

    let result = orchestrator.run("symlink_check").unwrap();
    assert_eq!(result.outcome, ScenarioOutcome::Pass);
    assert_eq!(result.seed, 5);
}

#[test]
fn test_violations_reach_the_result() {
    let dir = TempDir::new().unwrap();
    let (udev, orchestrator) = orchestrator(&dir);
    udev.add_link(NamingScheme::ByUuid, "0000-1111", "sdx9").unwrap();

    let result = orchestrator.run("symlink_check").unwrap();
    assert_eq!(result.outcome, ScenarioOutcome::Fail);
    assert!(result.failure_detail.unwrap().contains("0000-1111"));

    let report = orchestrator
        .environment()
        .checker()
        .check_all(udev.namespace_root())
        .unwrap_err();
    assert!(matches!(
        report.violations()[0],
        SymlinkViolation::DanglingLink { .. }
    ));
}
