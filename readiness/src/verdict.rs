use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one check, after applying its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    /// A fatal check failed.
    Failed,
    /// An advisory check failed.
    Warning,
}

/// The recorded result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub fatal: bool,
    pub status: CheckStatus,
    pub detail: String,
}

/// Aggregate of one validator run.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessVerdict {
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub healthy: bool,
    pub results: Vec<CheckResult>,
    pub checked_at: DateTime<Utc>,
}

impl ReadinessVerdict {
    pub(crate) fn from_results(results: Vec<CheckResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        let passed = count(CheckStatus::Passed);
        let failed = count(CheckStatus::Failed);
        let warnings = count(CheckStatus::Warning);
        Self {
            passed,
            failed,
            warnings,
            healthy: failed == 0,
            results,
            checked_at: Utc::now(),
        }
    }

    /// Verdict of a validator that has not run yet.
    pub fn pending() -> Self {
        Self::from_results(Vec::new())
    }

    /// Results that did not pass, fatal first.
    pub fn problems(&self) -> impl Iterator<Item = &CheckResult> {
        let fatal = self.results.iter().filter(|r| r.status == CheckStatus::Failed);
        let advisory = self.results.iter().filter(|r| r.status == CheckStatus::Warning);
        fatal.chain(advisory)
    }

    /// One-line summary, e.g. `5 passed, 1 failed, 1 warning`.
    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} warning{}",
            self.passed,
            self.failed,
            self.warnings,
            if self.warnings == 1 { "" } else { "s" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, fatal: bool, status: CheckStatus) -> CheckResult {
        CheckResult {
            name: name.into(),
            fatal,
            status,
            detail: String::new(),
        }
    }

    #[test]
    fn test_counts() {
        let v = ReadinessVerdict::from_results(vec![
            result("a", true, CheckStatus::Passed),
            result("b", false, CheckStatus::Warning),
            result("c", true, CheckStatus::Failed),
            result("d", false, CheckStatus::Passed),
        ]);
        assert_eq!((v.passed, v.failed, v.warnings), (2, 1, 1));
        assert!(!v.healthy);
        assert_eq!(v.summary(), "2 passed, 1 failed, 1 warning");
    }

    #[test]
    fn test_problems_fatal_first() {
        let v = ReadinessVerdict::from_results(vec![
            result("advisory", false, CheckStatus::Warning),
            result("fatal", true, CheckStatus::Failed),
        ]);
        let names: Vec<_> = v.problems().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["fatal", "advisory"]);
    }

    #[test]
    fn test_pending_is_healthy_and_empty() {
        let v = ReadinessVerdict::pending();
        assert!(v.healthy);
        assert!(v.results.is_empty());
    }

    #[test]
    fn test_serializes_status_lowercase() {
        let v = ReadinessVerdict::from_results(vec![result("x", false, CheckStatus::Warning)]);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["results"][0]["status"], "warning");
        assert_eq!(json["healthy"], true);
        assert!(json["checked_at"].is_string());
    }
}
