//! Core types and traits for linkguard
//!
//! This crate defines the foundational types used throughout the harness:
//! - SymlinkEntry / NamingScheme: the observed device-link namespace
//! - Hctl, Device, DeviceState, MultipathGroup: multipath path model
//! - PartitionSpec, ChurnIteration: partition layouts for topology churn
//! - ScenarioResult: terminal output of a scenario run
//! - Error: SymlinkViolation, ViolationReport, ChurnFailure, FailoverViolation, HarnessError
//! - HarnessConfig: `linkguard.toml`
//! - ScenarioRng: seeded randomness

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod rng;
pub mod types;

pub use config::{
    ChurnConfig, DeviceCountConfig, FailoverConfig, HarnessConfig, LabelConfig, TopologyConfig,
    TransportMinimum, CONFIG_FILE_NAME,
};
pub use error::{
    ChurnFailure, FailoverViolation, HarnessError, Result, SymlinkViolation, ViolationReport,
};
pub use rng::ScenarioRng;
pub use types::{
    ChurnIteration, Device, DeviceState, Hctl, MultipathGroup, NamingScheme, PartitionEntry,
    PartitionSpec, ScenarioOutcome, ScenarioResult, SymlinkEntry, DEFAULT_DEV_ROOT,
    DEFAULT_NAMESPACE_ROOT,
};
