use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::verdict::{CheckResult, CheckStatus, ReadinessVerdict};

/// What a probe reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub detail: String,
}

impl CheckOutcome {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
        }
    }
}

/// A check body.
pub type Probe = Box<dyn Fn() -> anyhow::Result<CheckOutcome> + Send + Sync>;

/// A named probe with its classification.
pub struct HealthCheck {
    name: String,
    fatal: bool,
    probe: Probe,
}

impl HealthCheck {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    fn run(&self) -> CheckResult {
        let outcome = match catch_unwind(AssertUnwindSafe(|| (self.probe)())) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => CheckOutcome::fail(format!("error during check: {e:#}")),
            Err(panic) => CheckOutcome::fail(format!("error during check: {}", panic_message(&*panic))),
        };

        let status = match (outcome.passed, self.fatal) {
            (true, _) => CheckStatus::Passed,
            (false, true) => CheckStatus::Failed,
            (false, false) => CheckStatus::Warning,
        };
        match status {
            CheckStatus::Passed => info!(check = %self.name, detail = %outcome.detail, "check passed"),
            CheckStatus::Failed => error!(check = %self.name, detail = %outcome.detail, "check failed"),
            CheckStatus::Warning => warn!(check = %self.name, detail = %outcome.detail, "check warning"),
        }

        CheckResult {
            name: self.name.clone(),
            fatal: self.fatal,
            status,
            detail: outcome.detail,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "probe panicked".to_string()
    }
}

/// An ordered registry of health checks.
#[derive(Default)]
pub struct Validator {
    checks: Vec<HealthCheck>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a check. Checks run in registration order.
    pub fn register<F>(&mut self, name: impl Into<String>, fatal: bool, probe: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<CheckOutcome> + Send + Sync + 'static,
    {
        self.checks.push(HealthCheck {
            name: name.into(),
            fatal,
            probe: Box::new(probe),
        });
        self
    }

    pub fn checks(&self) -> &[HealthCheck] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Runs every check and aggregates the results.
    pub fn run_all(&self) -> ReadinessVerdict {
        let results = self.checks.iter().map(HealthCheck::run).collect();
        let verdict = ReadinessVerdict::from_results(results);
        info!(
            passed = verdict.passed,
            failed = verdict.failed,
            warnings = verdict.warnings,
            healthy = verdict.healthy,
            "readiness checks complete"
        );
        verdict
    }
}

/// A validator together with its last verdict.
pub struct Readiness {
    validator: Validator,
    verdict: RwLock<ReadinessVerdict>,
}

impl Readiness {
    /// Runs the validator once and caches the verdict.
    pub fn new(validator: Validator) -> Self {
        let verdict = validator.run_all();
        Self {
            validator,
            verdict: RwLock::new(verdict),
        }
    }

    /// Returns the cached verdict.
    pub fn verdict(&self) -> ReadinessVerdict {
        self.verdict.read().clone()
    }

    pub fn is_healthy(&self) -> bool {
        self.verdict.read().healthy
    }

    /// Re-runs every check and replaces the cached verdict.
    pub fn refresh(&self) -> ReadinessVerdict {
        let verdict = self.validator.run_all();
        *self.verdict.write() = verdict.clone();
        verdict
    }
}
