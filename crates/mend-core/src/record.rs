use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verdict on a single test failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationKind {
    /// The test itself is wrong (bad assertion, wrong endpoint, flaky
    /// setup); eligible for automatic repair.
    TestError,
    /// The application under test is wrong; never auto-repaired.
    ActualDefect,
}

/// One classification event, produced for every (re)classification of a
/// failing test. The kind is the sole branching signal; confidence is
/// advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: ClassificationKind,
    /// Free-text rationale from the classifier.
    pub rationale: String,
    /// Advisory confidence in [0.0, 1.0]. Never drives control flow.
    pub confidence: f64,
}

impl Classification {
    pub fn new(kind: ClassificationKind, rationale: impl Into<String>, confidence: f64) -> Self {
        Self {
            kind,
            rationale: rationale.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// How one healing attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The repaired test passed on rerun.
    RerunPassed,
    /// The repaired test still failed on rerun.
    RerunFailed,
    /// The healer was unavailable; the attempt consumed budget without a
    /// rerun.
    HealFailed,
    /// The test runner itself failed during the rerun.
    RunError,
}

/// One classify→heal→rerun cycle for a single test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealingAttempt {
    /// 1-based attempt number.
    pub number: u32,
    /// The TEST_ERROR classification that triggered this attempt.
    pub classification: Classification,
    /// Source text before the repair was applied.
    pub source_before: String,
    /// Replacement source, when the healer produced one.
    pub source_after: Option<String>,
    pub outcome: AttemptOutcome,
    pub completed_at: DateTime<Utc>,
}

/// Terminal status of a healing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealStatus {
    SuccessfullyHealed,
    ActualDefect,
    MaxAttemptsExceeded,
}

/// The full healing history of one originally-failing test: its ordered,
/// append-only attempt sequence plus the terminal status the state machine
/// reached. Exactly one record exists per failing test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealingRecord {
    pub test_id: String,
    pub attempts: Vec<HealingAttempt>,
    pub status: HealStatus,
    /// The classification that sealed the record, when one was issued
    /// (absent when the classifier was unavailable or the session was
    /// cancelled before a verdict).
    pub final_classification: Option<Classification>,
    /// Diagnostic text current when the record was sealed.
    pub final_diagnostic: String,
}

impl HealingRecord {
    /// Number of healing attempts consumed.
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn is_healed(&self) -> bool {
        self.status == HealStatus::SuccessfullyHealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let c = Classification::new(ClassificationKind::TestError, "r", 1.7);
        assert_eq!(c.confidence, 1.0);
        let c = Classification::new(ClassificationKind::ActualDefect, "r", -0.2);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn test_kind_serializes_as_wire_names() {
        let json = serde_json::to_string(&ClassificationKind::TestError).unwrap();
        assert_eq!(json, "\"TEST_ERROR\"");
        let json = serde_json::to_string(&ClassificationKind::ActualDefect).unwrap();
        assert_eq!(json, "\"ACTUAL_DEFECT\"");
    }

    #[test]
    fn test_status_serializes_as_wire_names() {
        let json = serde_json::to_string(&HealStatus::MaxAttemptsExceeded).unwrap();
        assert_eq!(json, "\"MAX_ATTEMPTS_EXCEEDED\"");
    }
}
