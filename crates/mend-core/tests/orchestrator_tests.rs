//! End-to-end healing session scenarios against scripted collaborators.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use mend_core::case::Failure;
use mend_core::config::HealingConfig;
use mend_core::executor::{ExecutionOutcome, ExecutorError, TestExecutor};
use mend_core::healing::{HealingOrchestrator, SessionCancel};
use mend_core::record::{AttemptOutcome, Classification, ClassificationKind, HealStatus};
use mend_core::storage::{SourceStore, StorageError};
use mend_core::triage::{Triage, TriageError};
use mend_core::workflow::{aggregate, decide};
use mend_core::WorkflowResult;

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ScriptedTriage {
    classifications: Mutex<VecDeque<Result<Classification, TriageError>>>,
    heals: Mutex<VecDeque<Result<String, TriageError>>>,
}

impl ScriptedTriage {
    fn classify_next(self, result: Result<Classification, TriageError>) -> Self {
        self.classifications.lock().unwrap().push_back(result);
        self
    }

    fn heal_next(self, result: Result<String, TriageError>) -> Self {
        self.heals.lock().unwrap().push_back(result);
        self
    }
}

#[async_trait]
impl Triage for ScriptedTriage {
    async fn classify(
        &self,
        _source: &str,
        _diagnostic: &str,
    ) -> Result<Classification, TriageError> {
        self.classifications
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected classify call")
    }

    async fn heal(
        &self,
        _source: &str,
        _diagnostic: &str,
        _rationale: &str,
    ) -> Result<String, TriageError> {
        self.heals
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected heal call")
    }
}

#[derive(Default)]
struct ScriptedExecutor {
    outcomes: Mutex<VecDeque<Result<ExecutionOutcome, ExecutorError>>>,
}

impl ScriptedExecutor {
    fn run_next(self, result: Result<ExecutionOutcome, ExecutorError>) -> Self {
        self.outcomes.lock().unwrap().push_back(result);
        self
    }
}

#[async_trait]
impl TestExecutor for ScriptedExecutor {
    async fn run(&self, _test_id: &str) -> Result<ExecutionOutcome, ExecutorError> {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected executor call")
    }
}

#[derive(Default)]
struct MemStore {
    sources: Mutex<HashMap<String, String>>,
    report: Mutex<Option<WorkflowResult>>,
}

impl MemStore {
    fn with_source(self, test_id: &str, source: &str) -> Self {
        self.sources
            .lock()
            .unwrap()
            .insert(test_id.to_string(), source.to_string());
        self
    }

    fn source(&self, test_id: &str) -> Option<String> {
        self.sources.lock().unwrap().get(test_id).cloned()
    }
}

impl SourceStore for &MemStore {
    fn load_source(&self, test_id: &str) -> Result<String, StorageError> {
        self.sources
            .lock()
            .unwrap()
            .get(test_id)
            .cloned()
            .ok_or_else(|| StorageError::SourceNotFound(test_id.to_string()))
    }

    fn save_source(&self, test_id: &str, source: &str) -> Result<(), StorageError> {
        self.sources
            .lock()
            .unwrap()
            .insert(test_id.to_string(), source.to_string());
        Ok(())
    }

    fn save_report(&self, result: &WorkflowResult) -> Result<(), StorageError> {
        *self.report.lock().unwrap() = Some(result.clone());
        Ok(())
    }

    fn load_report(&self) -> Result<WorkflowResult, StorageError> {
        self.report
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| StorageError::SourceNotFound("healing report".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_error(reason: &str) -> Result<Classification, TriageError> {
    Ok(Classification::new(ClassificationKind::TestError, reason, 0.9))
}

fn actual_defect(reason: &str) -> Result<Classification, TriageError> {
    Ok(Classification::new(ClassificationKind::ActualDefect, reason, 0.8))
}

fn transport_error() -> TriageError {
    TriageError::Provider(mend_core::llm::LLMError::Network("connection reset".into()))
}

/// Sequential config so globally scripted queues line up with call order.
fn config() -> HealingConfig {
    HealingConfig {
        max_attempts: 3,
        concurrency: 1,
        classify_timeout_secs: 5,
        heal_timeout_secs: 5,
        rerun_timeout_secs: 5,
        session_timeout_secs: None,
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_heal_on_first_attempt() {
    let triage = ScriptedTriage::default()
        .classify_next(test_error("assertion expects stale status code"))
        .heal_next(Ok("def test_login():\n    assert resp.status_code == 200".into()));
    let executor = ScriptedExecutor::default().run_next(Ok(ExecutionOutcome::passed()));
    let store = MemStore::default().with_source("test_login.py::test_login", "def test_login():\n    assert resp.status_code == 401");

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator
        .run(vec![Failure::new("test_login.py::test_login", "assert 401 == 200")])
        .await;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, HealStatus::SuccessfullyHealed);
    assert_eq!(record.attempt_count(), 1);
    assert_eq!(record.attempts[0].outcome, AttemptOutcome::RerunPassed);

    // The healed source stays written back.
    let source = store.source("test_login.py::test_login").unwrap();
    assert!(source.contains("== 200"));

    let result = aggregate(&records);
    assert!(result.successfully_healed.contains("test_login.py::test_login"));
    assert!(result.commit_allowed);
}

#[tokio::test]
async fn test_defect_on_first_attempt_records_no_heal_step() {
    let triage = ScriptedTriage::default().classify_next(actual_defect("endpoint returns wrong payload"));
    let executor = ScriptedExecutor::default();
    let store = MemStore::default().with_source("test_payment.py::test_payment", "def test_payment(): ...");

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator
        .run(vec![Failure::new("test_payment.py::test_payment", "assert total == 99")])
        .await;

    let record = &records[0];
    assert_eq!(record.status, HealStatus::ActualDefect);
    assert_eq!(record.attempt_count(), 0);
    assert_eq!(
        record.final_classification.as_ref().unwrap().kind,
        ClassificationKind::ActualDefect
    );

    let result = aggregate(&records);
    assert!(result.actual_defects.contains("test_payment.py::test_payment"));
    // A defect alone never blocks commit.
    assert!(result.commit_allowed);
}

#[tokio::test]
async fn test_three_failed_cycles_exhaust_and_block_commit() {
    let triage = ScriptedTriage::default()
        .classify_next(test_error("attempt 1"))
        .classify_next(test_error("attempt 2"))
        .classify_next(test_error("attempt 3"))
        .classify_next(test_error("budget spent"))
        .heal_next(Ok("fix one".into()))
        .heal_next(Ok("fix two".into()))
        .heal_next(Ok("fix three".into()));
    let executor = ScriptedExecutor::default()
        .run_next(Ok(ExecutionOutcome::failed("still failing (1)")))
        .run_next(Ok(ExecutionOutcome::failed("still failing (2)")))
        .run_next(Ok(ExecutionOutcome::failed("still failing (3)")));
    let store = MemStore::default().with_source("test_flaky.py::test_flaky", "original source");

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator
        .run(vec![Failure::new("test_flaky.py::test_flaky", "flaky assertion")])
        .await;

    let record = &records[0];
    assert_eq!(record.status, HealStatus::MaxAttemptsExceeded);
    assert_eq!(record.attempt_count(), 3);
    assert!(record
        .attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::RerunFailed));
    // The diagnostic sealed into the record is the latest rerun's.
    assert_eq!(record.final_diagnostic, "still failing (3)");

    // Only healed tests may leave updated sources behind.
    assert_eq!(store.source("test_flaky.py::test_flaky").unwrap(), "original source");

    let result = aggregate(&records);
    assert!(!result.commit_allowed);
    assert!(!decide(&result));
}

#[tokio::test]
async fn test_reclassification_to_defect_absorbs_mid_loop() {
    let triage = ScriptedTriage::default()
        .classify_next(test_error("wrong assertion"))
        .classify_next(actual_defect("the fix revealed a genuine bug"))
        .heal_next(Ok("patched source".into()));
    let executor = ScriptedExecutor::default()
        .run_next(Ok(ExecutionOutcome::failed("new failure after repair")));
    let store = MemStore::default().with_source("t.py::t", "original");

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator.run(vec![Failure::new("t.py::t", "boom")]).await;

    let record = &records[0];
    assert_eq!(record.status, HealStatus::ActualDefect);
    // The defect came on attempt 2; exactly one heal cycle exists.
    assert_eq!(record.attempt_count(), 1);
    assert!(record.attempts.iter().all(|a| a.number <= 1));
}

#[tokio::test]
async fn test_mixed_session_allows_commit() {
    let triage = ScriptedTriage::default()
        .classify_next(test_error("bad assertion"))
        .classify_next(actual_defect("logic bug"))
        .heal_next(Ok("fixed".into()));
    let executor = ScriptedExecutor::default().run_next(Ok(ExecutionOutcome::passed()));
    let store = MemStore::default()
        .with_source("a.py::one", "src one")
        .with_source("b.py::two", "src two");

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator
        .run(vec![
            Failure::new("a.py::one", "assert 1 == 2"),
            Failure::new("b.py::two", "assert ok"),
        ])
        .await;

    let result = aggregate(&records);
    assert_eq!(result.healed_count, 1);
    assert_eq!(result.defect_count, 1);
    assert_eq!(result.exceeded_count, 0);
    assert!(result.commit_allowed);
}

#[tokio::test]
async fn test_classifier_transport_error_seals_exhausted() {
    let triage = ScriptedTriage::default().classify_next(Err(transport_error()));
    let executor = ScriptedExecutor::default();
    let store = MemStore::default().with_source("t.py::t", "src");

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator.run(vec![Failure::new("t.py::t", "boom")]).await;

    let record = &records[0];
    // Not silently skipped, and not an AI-issued defect: the record exists,
    // carries no classification, and blocks commit.
    assert_eq!(record.status, HealStatus::MaxAttemptsExceeded);
    assert_eq!(record.attempt_count(), 0);
    assert!(record.final_classification.is_none());

    let result = aggregate(&records);
    assert!(!result.commit_allowed);
}

#[tokio::test]
async fn test_healer_failures_consume_budget() {
    let triage = ScriptedTriage::default()
        .classify_next(test_error("1"))
        .classify_next(test_error("2"))
        .classify_next(test_error("3"))
        .classify_next(test_error("4"))
        .heal_next(Err(transport_error()))
        .heal_next(Err(transport_error()))
        .heal_next(Err(transport_error()));
    let executor = ScriptedExecutor::default();
    let store = MemStore::default().with_source("t.py::t", "src");

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator.run(vec![Failure::new("t.py::t", "boom")]).await;

    let record = &records[0];
    assert_eq!(record.status, HealStatus::MaxAttemptsExceeded);
    assert_eq!(record.attempt_count(), 3);
    assert!(record
        .attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::HealFailed && a.source_after.is_none()));
}

#[tokio::test]
async fn test_executor_crash_seals_exhausted() {
    let triage = ScriptedTriage::default()
        .classify_next(test_error("bad assertion"))
        .heal_next(Ok("fixed".into()));
    let executor = ScriptedExecutor::default().run_next(Err(ExecutorError::Report(
        "runner crashed before writing a report".into(),
    )));
    let store = MemStore::default().with_source("t.py::t", "src");

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator.run(vec![Failure::new("t.py::t", "boom")]).await;

    let record = &records[0];
    assert_eq!(record.status, HealStatus::MaxAttemptsExceeded);
    assert_eq!(record.attempts[0].outcome, AttemptOutcome::RunError);
    assert!(record.final_diagnostic.contains("runner crashed"));
}

#[tokio::test]
async fn test_missing_source_seals_exhausted() {
    let triage = ScriptedTriage::default();
    let executor = ScriptedExecutor::default();
    let store = MemStore::default();

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator
        .run(vec![Failure::new("gone.py::test", "boom")])
        .await;

    let record = &records[0];
    assert_eq!(record.status, HealStatus::MaxAttemptsExceeded);
    assert!(record.final_diagnostic.contains("test source unavailable"));
}

#[tokio::test]
async fn test_cancelled_session_seals_in_flight_cases() {
    // Empty scripts: any triage/executor call would panic the test.
    let triage = ScriptedTriage::default();
    let executor = ScriptedExecutor::default();
    let store = MemStore::default()
        .with_source("a.py::one", "src")
        .with_source("b.py::two", "src");

    let cancel = SessionCancel::new();
    cancel.cancel();

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator
        .run_with_cancel(
            vec![
                Failure::new("a.py::one", "boom"),
                Failure::new("b.py::two", "boom"),
            ],
            &cancel,
        )
        .await;

    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.status, HealStatus::MaxAttemptsExceeded);
        assert_eq!(record.attempt_count(), 0);
    }

    let result = aggregate(&records);
    assert!(!result.commit_allowed);
}

#[tokio::test]
async fn test_classification_timeout_counts_as_unavailable() {
    struct StalledTriage;

    #[async_trait]
    impl Triage for StalledTriage {
        async fn classify(
            &self,
            _source: &str,
            _diagnostic: &str,
        ) -> Result<Classification, TriageError> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            unreachable!("classification should have timed out")
        }

        async fn heal(
            &self,
            _source: &str,
            _diagnostic: &str,
            _rationale: &str,
        ) -> Result<String, TriageError> {
            unreachable!("heal is never reached")
        }
    }

    let mut cfg = config();
    cfg.classify_timeout_secs = 0;

    let store = MemStore::default().with_source("t.py::t", "src");
    let orchestrator =
        HealingOrchestrator::new(StalledTriage, ScriptedExecutor::default(), &store, cfg);
    let records = orchestrator.run(vec![Failure::new("t.py::t", "boom")]).await;

    assert_eq!(records[0].status, HealStatus::MaxAttemptsExceeded);
}

#[tokio::test]
async fn test_attempt_budget_invariant_holds_across_records() {
    let triage = ScriptedTriage::default()
        .classify_next(test_error("1"))
        .classify_next(test_error("2"))
        .classify_next(test_error("3"))
        .classify_next(test_error("4"))
        .heal_next(Ok("a".into()))
        .heal_next(Ok("b".into()))
        .heal_next(Ok("c".into()));
    let executor = ScriptedExecutor::default()
        .run_next(Ok(ExecutionOutcome::failed("f1")))
        .run_next(Ok(ExecutionOutcome::failed("f2")))
        .run_next(Ok(ExecutionOutcome::failed("f3")));
    let store = MemStore::default().with_source("t.py::t", "src");

    let orchestrator = HealingOrchestrator::new(triage, executor, &store, config());
    let records = orchestrator.run(vec![Failure::new("t.py::t", "boom")]).await;

    for record in &records {
        assert!(record.attempt_count() <= 3);
        for (i, attempt) in record.attempts.iter().enumerate() {
            assert_eq!(attempt.number, i as u32 + 1);
        }
    }
}
