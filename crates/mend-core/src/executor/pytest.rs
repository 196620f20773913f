use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::debug;

use crate::config::ExecutorConfig;
use crate::report::RunReport;

use super::{ExecutionOutcome, ExecutorError, TestExecutor};

/// Runs a single pytest node id as a subprocess and reads its
/// machine-readable report (`pytest-json-report`).
pub struct PytestExecutor {
    python: String,
    project_root: PathBuf,
    report_dir: PathBuf,
    timeout: Duration,
}

impl PytestExecutor {
    pub fn new(project_root: impl Into<PathBuf>, config: &ExecutorConfig) -> Self {
        let project_root = project_root.into();
        Self {
            python: config.python.clone(),
            report_dir: project_root.join(&config.report_dir),
            project_root,
            timeout: Duration::from_secs(config.run_timeout_secs),
        }
    }

    /// Per-test temp report path, stable for the test but unique across
    /// tests so concurrent runs never collide.
    fn temp_report_path(&self, test_id: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(test_id.as_bytes());
        let digest = hex::encode(hasher.finalize());
        self.report_dir.join(format!("run-{}.json", &digest[..16]))
    }
}

#[async_trait]
impl TestExecutor for PytestExecutor {
    async fn run(&self, test_id: &str) -> Result<ExecutionOutcome, ExecutorError> {
        if !self.report_dir.exists() {
            std::fs::create_dir_all(&self.report_dir).map_err(ExecutorError::Spawn)?;
        }

        let report_path = self.temp_report_path(test_id);

        let mut command = Command::new(&self.python);
        command
            .args(["-m", "pytest", test_id, "--json-report"])
            .arg(format!("--json-report-file={}", report_path.display()))
            .args(["--tb=short", "-q"])
            .current_dir(&self.project_root)
            .kill_on_drop(true);

        debug!(test_id, "running test");

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(ExecutorError::Spawn)?,
            Err(_) => {
                // Dropping the future kills the child (kill_on_drop). A hung
                // test is a failed run, not a runner crash.
                let _ = std::fs::remove_file(&report_path);
                return Ok(ExecutionOutcome::failed(format!(
                    "test execution timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };

        let report = std::fs::read_to_string(&report_path).ok();
        let _ = std::fs::remove_file(&report_path);

        if let Some(json) = report {
            let parsed = RunReport::from_json(&json)
                .map_err(|e| ExecutorError::Report(e.to_string()))?;

            if let Some(entry) = parsed.tests.first() {
                return Ok(if entry.passed() {
                    ExecutionOutcome::passed()
                } else {
                    ExecutionOutcome::failed(entry.diagnostic())
                });
            }
        }

        // No report was written (e.g. collection error); fall back to the
        // process exit status.
        if output.status.success() {
            Ok(ExecutionOutcome::passed())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let diagnostic = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            Ok(ExecutionOutcome::failed(if diagnostic.is_empty() {
                "test runner exited nonzero with no output".to_string()
            } else {
                diagnostic
            }))
        }
    }
}
