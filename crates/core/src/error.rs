//! Error types for the harness
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Checker findings (`SymlinkViolation`) are collected exhaustively into a
//! `ViolationReport`. Everything else is fail-fast and travels as a
//! `HarnessError`.

use crate::types::Hctl;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

// ============================================================================
// Checker violations
// ============================================================================

/// One inconsistency found by the symlink checker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Error)]
pub enum SymlinkViolation {
    /// The link, or the node it resolves to, does not exist
    #[error("dangling link {}{}", .path.display(), .target.as_ref().map(|t| format!(" -> {}", t.display())).unwrap_or_default())]
    DanglingLink {
        /// Link path
        path: PathBuf,
        /// Raw link target, when the link itself could still be read
        target: Option<PathBuf>,
    },

    /// The resolved target disagrees with the canonical device name
    #[error("name mismatch for {}: resolves to {}, naming daemon reports {}", .path.display(), .resolved.display(), .expected.display())]
    NameMismatch {
        /// Link path
        path: PathBuf,
        /// Fully resolved target
        resolved: PathBuf,
        /// `dev_root/canonical_name`
        expected: PathBuf,
    },

    /// The name resolver could not report an owner for the link
    #[error("cannot resolve canonical name of {}: {reason}", .path.display())]
    Unresolvable {
        /// Link path
        path: PathBuf,
        /// Resolver error
        reason: String,
    },

    /// A namespace directory could not be enumerated
    #[error("cannot enumerate {}: {reason}", .path.display())]
    EnumerationFailed {
        /// Directory path
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },
}

impl SymlinkViolation {
    /// Path the violation is about.
    pub fn path(&self) -> &PathBuf {
        match self {
            SymlinkViolation::DanglingLink { path, .. }
            | SymlinkViolation::NameMismatch { path, .. }
            | SymlinkViolation::Unresolvable { path, .. }
            | SymlinkViolation::EnumerationFailed { path, .. } => path,
        }
    }

    /// True for `DanglingLink`.
    pub fn is_dangling(&self) -> bool {
        matches!(self, SymlinkViolation::DanglingLink { .. })
    }
}

/// Every violation found by one checker invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViolationReport(pub Vec<SymlinkViolation>);

impl ViolationReport {
    /// Wrap a list of violations.
    pub fn new(violations: Vec<SymlinkViolation>) -> Self {
        ViolationReport(violations)
    }

    /// Violations in discovery order.
    pub fn violations(&self) -> &[SymlinkViolation] {
        &self.0
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing was found.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when empty, the report itself otherwise.
    pub fn into_result(self) -> std::result::Result<(), ViolationReport> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ViolationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} symlink violation(s)", self.0.len())?;
        for violation in &self.0 {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ViolationReport {}

// ============================================================================
// Scenario failures
// ============================================================================

/// A violation detected at a settle barrier during partition churn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("churn iteration {iteration}: {report}")]
pub struct ChurnFailure {
    /// 1-based iteration index at which the barrier ran
    pub iteration: usize,
    /// Everything the checker found at that barrier
    pub report: ViolationReport,
}

/// A broken failover invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailoverViolation {
    /// The group does not have the expected number of paths
    #[error("group {wwid}: expected {expected} paths, found {found}")]
    PathCount {
        /// Group WWID
        wwid: String,
        /// Configured cardinality
        expected: usize,
        /// Reported cardinality
        found: usize,
    },

    /// The reserved path count leaves nothing to fail or nothing running
    #[error("group {wwid}: cannot reserve {reserved} of {total} paths")]
    InvalidReservation {
        /// Group WWID
        wwid: String,
        /// Paths held back
        reserved: usize,
        /// Group cardinality
        total: usize,
    },

    /// The counter written through the filesystem did not read back
    #[error("data continuity lost on {}: expected {expected:?}, read {actual:?}", .path.display())]
    Continuity {
        /// Counter file
        path: PathBuf,
        /// Value last written
        expected: String,
        /// Value read back
        actual: String,
    },

    /// A dependent alias stopped resolving mid-failover
    #[error("group {wwid}: alias went stale after taking {address} offline: {report}")]
    StaleAlias {
        /// Group WWID
        wwid: String,
        /// Path taken offline just before the check
        address: Hctl,
        /// Alias check findings
        report: ViolationReport,
    },

    /// No running path is left
    #[error("group {wwid}: no running path left")]
    LastPathLost {
        /// Group WWID
        wwid: String,
    },

    /// Final running/offline counts differ from the plan
    #[error("group {wwid}: expected {expected_running} running / {expected_offline} offline, found {running} / {offline}")]
    FinalCounts {
        /// Group WWID
        wwid: String,
        /// Reserved paths
        expected_running: usize,
        /// Deactivated paths
        expected_offline: usize,
        /// Reported running paths
        running: usize,
        /// Reported offline paths
        offline: usize,
    },

    /// A transition the path model does not allow
    #[error("group {wwid}: illegal transition for {address}: {reason}")]
    IllegalTransition {
        /// Group WWID
        wwid: String,
        /// Path address
        address: Hctl,
        /// Why it was refused
        reason: String,
    },
}

// ============================================================================
// Top-level error
// ============================================================================

/// Error types for the harness
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Checker found inconsistencies
    #[error("{0}")]
    Violations(ViolationReport),

    /// Violation detected during partition churn
    #[error("churn failure: {0}")]
    Churn(#[from] ChurnFailure),

    /// Failover invariant broken
    #[error("failover invariant violation: {0}")]
    Failover(#[from] FailoverViolation),

    /// Requested scenario is not registered
    #[error("unknown scenario '{name}' (known: {})", .known.join(", "))]
    UnknownScenario {
        /// Requested name
        name: String,
        /// Registered names
        known: Vec<String>,
    },

    /// The naming subsystem never became quiescent
    #[error("settle barrier timed out after {timeout:?}{}", .detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default())]
    BarrierTimeout {
        /// Bound that was exceeded
        timeout: Duration,
        /// What was still pending
        detail: Option<String>,
    },

    /// An external command failed
    #[error("command `{command}` failed ({status}): {stderr}")]
    Command {
        /// Command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured stderr
        stderr: String,
    },

    /// Output of an external tool could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A static scenario expectation did not hold
    #[error("expectation failed: {0}")]
    Expectation(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file operations, mount points, control files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl HarnessError {
    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        HarnessError::Parse(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        HarnessError::Config(msg.into())
    }

    /// Create an invalid-input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        HarnessError::InvalidInput(msg.into())
    }

    /// Create an expectation failure.
    pub fn expectation(msg: impl Into<String>) -> Self {
        HarnessError::Expectation(msg.into())
    }

    /// Create a barrier timeout.
    pub fn barrier_timeout(timeout: Duration, detail: Option<String>) -> Self {
        HarnessError::BarrierTimeout { timeout, detail }
    }

    /// Whether this error is a dispatch error that happens before any mutation.
    pub fn is_unknown_scenario(&self) -> bool {
        matches!(self, HarnessError::UnknownScenario { .. })
    }

    /// Whether this error is a settle timeout.
    pub fn is_barrier_timeout(&self) -> bool {
        matches!(self, HarnessError::BarrierTimeout { .. })
    }
}

impl From<ViolationReport> for HarnessError {
    fn from(report: ViolationReport) -> Self {
        HarnessError::Violations(report)
    }
}
