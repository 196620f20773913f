//! The per-test healing state machine.
//!
//! Each originally-failing test walks
//! `PendingClassification → (Healing → Rerunning → PendingClassification)*`
//! until it reaches one of the terminal phases. The transition function is
//! pure so the budget invariant and the absorbing-defect property can be
//! checked directly against it.

use crate::record::{Classification, ClassificationKind};

/// Where a test currently is in its healing loop.
#[derive(Debug, Clone, PartialEq)]
pub enum CasePhase {
    /// Waiting for a (re)classification of the current failure.
    PendingClassification,
    /// Classified TEST_ERROR; a repair is being produced.
    Healing(Classification),
    /// Repair applied; waiting for the rerun verdict.
    Rerunning,
    /// Terminal: the repaired test passed.
    Healed,
    /// Terminal: the application is at fault; never auto-repaired.
    Defect,
    /// Terminal: the repair budget is spent or no valid signal exists.
    Exhausted,
}

/// Everything that can happen to a case while non-terminal.
#[derive(Debug, Clone)]
pub enum CaseEvent {
    /// The classifier returned a verdict.
    Classified(Classification),
    /// The classifier was unavailable (transport failure or timeout).
    ClassifierUnavailable,
    /// The healer produced a replacement source.
    HealApplied,
    /// The healer was unavailable; the attempt is spent.
    HealRejected,
    RerunPassed,
    RerunFailed,
    /// The runner itself failed; no pass/fail signal exists.
    ExecutorFailed,
    /// The session was cancelled while this case was in flight.
    Cancelled,
}

/// Per-test loop state: the attempt counter plus the current phase.
///
/// The attempt counter is 1-based and counts the heal cycle currently being
/// paid for; it moves only when an attempt is consumed (a completed
/// heal+rerun cycle, or a heal the healer failed to produce), never on pure
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseState {
    pub attempt: u32,
    pub phase: CasePhase,
}

impl CaseState {
    pub fn new() -> Self {
        Self {
            attempt: 1,
            phase: CasePhase::PendingClassification,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.phase,
            CasePhase::Healed | CasePhase::Defect | CasePhase::Exhausted
        )
    }

    /// Applies one event. Terminal states absorb every event unchanged.
    pub fn step(self, event: CaseEvent, max_attempts: u32) -> CaseState {
        if self.is_terminal() {
            return self;
        }

        let CaseState { attempt, phase } = self;

        let (attempt, phase) = match (phase, event) {
            (CasePhase::PendingClassification, CaseEvent::Classified(c)) => match c.kind {
                ClassificationKind::ActualDefect => (attempt, CasePhase::Defect),
                ClassificationKind::TestError if attempt > max_attempts => {
                    (attempt, CasePhase::Exhausted)
                }
                ClassificationKind::TestError => (attempt, CasePhase::Healing(c)),
            },
            (CasePhase::PendingClassification, CaseEvent::ClassifierUnavailable) => {
                (attempt, CasePhase::Exhausted)
            }

            (CasePhase::Healing(_), CaseEvent::HealApplied) => (attempt, CasePhase::Rerunning),
            (CasePhase::Healing(_), CaseEvent::HealRejected) => {
                (attempt + 1, CasePhase::PendingClassification)
            }

            (CasePhase::Rerunning, CaseEvent::RerunPassed) => (attempt, CasePhase::Healed),
            (CasePhase::Rerunning, CaseEvent::RerunFailed) => {
                (attempt + 1, CasePhase::PendingClassification)
            }

            (_, CaseEvent::ExecutorFailed) => (attempt, CasePhase::Exhausted),
            (_, CaseEvent::Cancelled) => (attempt, CasePhase::Exhausted),

            // An event that does not apply to the current phase leaves the
            // state untouched; the orchestrator never emits these.
            (phase, _) => (attempt, phase),
        };

        CaseState { attempt, phase }
    }
}

impl Default for CaseState {
    fn default() -> Self {
        Self::new()
    }
}
