//! Common types for xmile-regress.
//!
//! Defines regression cases and their results.

use std::path::PathBuf;

use serde::Serialize;

/// One model directory under the suite base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    /// Model directory name.
    pub name: String,
    /// First readable model file.
    pub model: PathBuf,
    /// Reference fixture.
    pub reference: PathBuf,
}

/// Result of running a case.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TestResult {
    /// Simulated output matched the reference.
    Pass { name: String, details: String },
    /// Simulated output diverged.
    Fail { name: String, reason: String },
    /// Case could not be evaluated.
    Error { name: String, error: String },
    /// Case was not run.
    Skip { name: String, reason: String },
}

impl TestResult {
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}

/// Pass/fail counts over a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let count = |pred: fn(&TestResult) -> bool| results.iter().filter(|r| pred(r)).count();
        Self {
            passed: count(TestResult::is_pass),
            failed: count(TestResult::is_fail),
            errored: count(TestResult::is_error),
            skipped: count(TestResult::is_skip),
        }
    }

    pub const fn success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}
