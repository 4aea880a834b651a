//! Verification scenarios for device-link naming
//!
//! - **churn**: partition table delete/recreate cycles with settle barriers
//! - **multipath_failover**: path failures under a mounted filesystem
//! - **multipath_topology**, **device_count**, **duplicate_labels**,
//!   **symlink_check**: static assertions on the settled system
//!
//! The [`Orchestrator`] dispatches a scenario by name from a
//! [`ScenarioRegistry`], brackets it with full namespace checks and records
//! the outcome through a [`ResultMarker`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod churn;
pub mod environment;
pub mod failover;
pub mod inventory;
pub mod marker;
pub mod orchestrator;
pub mod registry;
pub mod scenario;
pub mod topology;

pub use churn::{ChurnDriver, ChurnScenario};
pub use environment::{Environment, EnvironmentBuilder};
pub use failover::{FailoverReport, FailoverScenario, FailoverSession, FailoverValidator};
pub use inventory::{DeviceCountScenario, DuplicateLabelScenario};
pub use marker::{ResultMarker, FAILED_MARKER, OK_MARKER};
pub use orchestrator::Orchestrator;
pub use registry::ScenarioRegistry;
pub use scenario::Scenario;
pub use topology::{wwn_groups, MultipathTopologyScenario, SymlinkCheckScenario};
