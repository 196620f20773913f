//! Parsing of the machine-readable run report produced by the test
//! execution framework (pytest with `pytest-json-report`).

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::case::Failure;

/// Errors that can occur while reading a run report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to read report file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse run report: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A full test-run report keyed by test node id.
#[derive(Debug, Clone, Deserialize)]
pub struct RunReport {
    #[serde(default)]
    pub tests: Vec<TestEntry>,
    /// Report creation time as a unix timestamp with fractional seconds.
    #[serde(default)]
    pub created: Option<f64>,
}

/// One test's entry in the run report.
#[derive(Debug, Clone, Deserialize)]
pub struct TestEntry {
    pub nodeid: String,
    pub outcome: String,
    #[serde(default)]
    pub call: Option<CallInfo>,
}

/// The `call` phase of a test entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallInfo {
    #[serde(default)]
    pub longrepr: Option<String>,
    #[serde(default)]
    pub crash: Option<CrashInfo>,
}

/// Crash detail attached to a failed call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrashInfo {
    #[serde(default)]
    pub message: Option<String>,
}

impl RunReport {
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Extracts one `Failure` per failed test.
    pub fn failures(&self) -> Vec<Failure> {
        let occurred_at = self.created_at().unwrap_or_else(Utc::now);

        self.tests
            .iter()
            .filter(|t| t.outcome == "failed")
            .map(|t| Failure {
                test_id: t.nodeid.clone(),
                diagnostic: t.diagnostic(),
                occurred_at,
            })
            .collect()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.created?;
        Utc.timestamp_opt(secs as i64, 0).single()
    }
}

impl TestEntry {
    pub fn passed(&self) -> bool {
        self.outcome == "passed"
    }

    /// Best available diagnostic text for this entry: the long
    /// representation of the failure, falling back to the crash message.
    pub fn diagnostic(&self) -> String {
        let call = self.call.as_ref();

        call.and_then(|c| c.longrepr.clone())
            .or_else(|| call.and_then(|c| c.crash.as_ref()).and_then(|c| c.message.clone()))
            .unwrap_or_else(|| "test failed with no captured output".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "created": 1722945600.123,
        "tests": [
            {
                "nodeid": "tests/generated/test_auth.py::test_login",
                "outcome": "failed",
                "call": {
                    "longrepr": "assert 401 == 200",
                    "crash": {"message": "AssertionError: assert 401 == 200"}
                }
            },
            {
                "nodeid": "tests/generated/test_auth.py::test_logout",
                "outcome": "passed",
                "call": {}
            },
            {
                "nodeid": "tests/generated/test_users.py::test_create",
                "outcome": "failed",
                "call": {"crash": {"message": "ConnectionRefusedError"}}
            }
        ]
    }"#;

    #[test]
    fn test_extracts_only_failures() {
        let report = RunReport::from_json(SAMPLE).unwrap();
        let failures = report.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].test_id, "tests/generated/test_auth.py::test_login");
        assert_eq!(failures[0].diagnostic, "assert 401 == 200");
    }

    #[test]
    fn test_crash_message_fallback() {
        let report = RunReport::from_json(SAMPLE).unwrap();
        let failures = report.failures();
        assert_eq!(failures[1].diagnostic, "ConnectionRefusedError");
    }

    #[test]
    fn test_missing_call_info() {
        let report = RunReport::from_json(
            r#"{"tests": [{"nodeid": "t.py::t", "outcome": "failed"}]}"#,
        )
        .unwrap();
        let failures = report.failures();
        assert_eq!(failures[0].diagnostic, "test failed with no captured output");
    }

    #[test]
    fn test_empty_report() {
        let report = RunReport::from_json("{}").unwrap();
        assert!(report.failures().is_empty());
    }
}
