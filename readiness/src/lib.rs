//! Readiness validation for the inference service.
//!
//! A [`Validator`] holds named health checks, each classified as fatal or
//! advisory. [`Validator::run_all`] executes every probe and folds the results
//! into a [`ReadinessVerdict`]: fatal failures make the service unhealthy,
//! advisory failures are only counted as warnings.
//!
//! Probes are plain closures returning `anyhow::Result<CheckOutcome>`. An
//! error or a panic inside a probe is recorded as a failure of that probe;
//! the remaining probes still run.
//!
//! [`Readiness`] keeps the last verdict so request handlers read a cached
//! value instead of re-running the checks.
//!
//! The [`checks`] module has ready-made probes for the conditions the service
//! cares about (runtime, libraries, directories, files).

pub mod checks;
mod error;
mod validator;
mod verdict;

pub use error::DependencyError;
pub use validator::{CheckOutcome, HealthCheck, Probe, Readiness, Validator};
pub use verdict::{CheckResult, CheckStatus, ReadinessVerdict};
