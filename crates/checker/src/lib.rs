//! Device-link consistency checking
//!
//! [`SymlinkChecker`] walks a device-link namespace (`/dev/disk` by default),
//! resolves every link, and cross-checks the result against the canonical
//! name reported by the naming daemon.
//!
//! # Example
//!
//! ```ignore
//! use linkguard_checker::SymlinkChecker;
//! use linkguard_probe::UdevadmResolver;
//!
//! let checker = SymlinkChecker::new(Arc::new(UdevadmResolver::new()), "/dev");
//! if let Err(report) = checker.check_all(Path::new("/dev/disk")) {
//!     eprintln!("{}", report);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checker;
pub mod walk;

pub use checker::SymlinkChecker;
pub use walk::collect_links;
