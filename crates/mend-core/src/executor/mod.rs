//! Test execution: running one named test in isolation.

mod pytest;

pub use pytest::PytestExecutor;

use async_trait::async_trait;
use thiserror::Error;

/// Result of executing a single test.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub passed: bool,
    /// Failure output when the test failed; empty on pass.
    pub diagnostic: String,
}

impl ExecutionOutcome {
    pub fn passed() -> Self {
        Self {
            passed: true,
            diagnostic: String::new(),
        }
    }

    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            passed: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Errors from the test runner itself, as opposed to a test failing.
///
/// A test that runs and fails is a normal `ExecutionOutcome`; these errors
/// mean no valid pass/fail signal exists.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Failed to spawn test runner: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Test runner produced an unreadable report: {0}")]
    Report(String),
}

/// Runs one named test in isolation and reports its outcome.
///
/// Implementations must execute only the single named test, with no ordering
/// dependency on other tests and no shared mutable fixtures across tests.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    async fn run(&self, test_id: &str) -> Result<ExecutionOutcome, ExecutorError>;
}
