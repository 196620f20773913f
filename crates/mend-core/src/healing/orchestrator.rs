use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::case::{Failure, TestCase};
use crate::config::HealingConfig;
use crate::executor::{ExecutorError, TestExecutor};
use crate::record::{
    AttemptOutcome, Classification, HealStatus, HealingAttempt, HealingRecord,
};
use crate::storage::SourceStore;
use crate::triage::{Triage, TriageError};

use super::state::{CaseEvent, CasePhase, CaseState};
use super::SessionCancel;

/// Drives the healing state machine for every failing test.
///
/// Per test, the loop is strictly sequential (classify → heal → rerun are
/// causally dependent); across tests, loops run concurrently up to the
/// configured limit. Each loop exclusively owns its case state for the
/// lifetime of the session, and no failure in one loop can abort another:
/// a session always completes and yields one sealed record per failure.
pub struct HealingOrchestrator<T, E, S> {
    triage: T,
    executor: E,
    store: S,
    config: HealingConfig,
}

impl<T, E, S> HealingOrchestrator<T, E, S>
where
    T: Triage,
    E: TestExecutor,
    S: SourceStore,
{
    pub fn new(triage: T, executor: E, store: S, config: HealingConfig) -> Self {
        Self {
            triage,
            executor,
            store,
            config,
        }
    }

    /// Runs a healing session to completion.
    ///
    /// Applies the configured session time budget, if any.
    pub async fn run(&self, failures: Vec<Failure>) -> Vec<HealingRecord> {
        let cancel = SessionCancel::new();

        let watchdog = self.config.session_timeout_secs.map(|secs| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                warn!(budget_secs = secs, "session time budget elapsed, cancelling");
                cancel.cancel();
            })
        });

        let records = self.run_with_cancel(failures, &cancel).await;

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        records
    }

    /// Runs a healing session under an externally owned cancellation flag.
    pub async fn run_with_cancel(
        &self,
        failures: Vec<Failure>,
        cancel: &SessionCancel,
    ) -> Vec<HealingRecord> {
        let session = Uuid::new_v4();
        let total = failures.len();
        info!(session = %session, failing_tests = total, "healing session started");

        let records: Vec<HealingRecord> = stream::iter(failures)
            .map(|failure| self.heal_case(failure, cancel))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let healed = records.iter().filter(|r| r.is_healed()).count();
        info!(session = %session, healed, total, "healing session finished");

        records
    }

    /// Drives one test's loop from its originating failure to a sealed record.
    async fn heal_case(&self, failure: Failure, cancel: &SessionCancel) -> HealingRecord {
        let test_id = failure.test_id;
        let max = self.config.max_attempts;

        let original = match self.store.load_source(&test_id) {
            Ok(source) => source,
            Err(e) => {
                warn!(test = %test_id, error = %e, "test source unavailable, sealing conservatively");
                return HealingRecord {
                    test_id,
                    attempts: Vec::new(),
                    status: HealStatus::MaxAttemptsExceeded,
                    final_classification: None,
                    final_diagnostic: format!("test source unavailable: {e}"),
                };
            }
        };

        // The case's source is mutated only by applying a repair; its id
        // stays the failure's id for the whole loop.
        let mut case = TestCase::new(&test_id, &original);
        let mut diagnostic = failure.diagnostic;
        let mut state = CaseState::new();
        let mut attempts: Vec<HealingAttempt> = Vec::new();
        let mut final_classification: Option<Classification> = None;
        // (classification, source before the repair) of the cycle in flight
        let mut in_flight: Option<(Classification, String)> = None;
        let mut wrote_source = false;

        while !state.is_terminal() {
            if cancel.is_cancelled() {
                warn!(test = %test_id, "session cancelled, sealing in-flight case");
                state = state.step(CaseEvent::Cancelled, max);
                continue;
            }

            state = match state.phase.clone() {
                CasePhase::PendingClassification => {
                    match self.classify(&case.source, &diagnostic).await {
                        Ok(classification) => {
                            info!(
                                test = %test_id,
                                kind = ?classification.kind,
                                attempt = state.attempt,
                                confidence = classification.confidence,
                                "failure classified"
                            );
                            final_classification = Some(classification.clone());
                            state.step(CaseEvent::Classified(classification), max)
                        }
                        Err(e) => {
                            warn!(
                                test = %test_id,
                                error = %e,
                                cause = "classifier_unavailable",
                                "no classification signal, sealing conservatively"
                            );
                            state.step(CaseEvent::ClassifierUnavailable, max)
                        }
                    }
                }

                CasePhase::Healing(classification) => {
                    match self.heal(&case.source, &diagnostic, &classification.rationale).await {
                        Ok(healed) => match self.store.save_source(&test_id, &healed) {
                            Ok(()) => {
                                debug!(test = %test_id, attempt = state.attempt, "repair applied");
                                wrote_source = true;
                                in_flight = Some((classification, case.source.clone()));
                                case.source = healed;
                                state.step(CaseEvent::HealApplied, max)
                            }
                            Err(e) => {
                                warn!(test = %test_id, error = %e, "could not write healed source");
                                diagnostic = format!("failed to write healed source: {e}");
                                state.step(CaseEvent::ExecutorFailed, max)
                            }
                        },
                        Err(e) => {
                            warn!(
                                test = %test_id,
                                error = %e,
                                attempt = state.attempt,
                                "healer unavailable, attempt counts against budget"
                            );
                            attempts.push(HealingAttempt {
                                number: state.attempt,
                                classification,
                                source_before: case.source.clone(),
                                source_after: None,
                                outcome: AttemptOutcome::HealFailed,
                                completed_at: Utc::now(),
                            });
                            state.step(CaseEvent::HealRejected, max)
                        }
                    }
                }

                CasePhase::Rerunning => {
                    let outcome = self.rerun(&test_id).await;
                    let (classification, before) = match in_flight.take() {
                        Some(pair) => pair,
                        // Rerunning is only ever entered from a successful
                        // heal, which always sets in_flight.
                        None => break,
                    };

                    match outcome {
                        Ok(run) if run.passed => {
                            info!(test = %test_id, attempt = state.attempt, "repaired test passed");
                            attempts.push(HealingAttempt {
                                number: state.attempt,
                                classification,
                                source_before: before,
                                source_after: Some(case.source.clone()),
                                outcome: AttemptOutcome::RerunPassed,
                                completed_at: Utc::now(),
                            });
                            state.step(CaseEvent::RerunPassed, max)
                        }
                        Ok(run) => {
                            debug!(test = %test_id, attempt = state.attempt, "repaired test still failing");
                            attempts.push(HealingAttempt {
                                number: state.attempt,
                                classification,
                                source_before: before,
                                source_after: Some(case.source.clone()),
                                outcome: AttemptOutcome::RerunFailed,
                                completed_at: Utc::now(),
                            });
                            diagnostic = run.diagnostic;
                            state.step(CaseEvent::RerunFailed, max)
                        }
                        Err(e) => {
                            warn!(test = %test_id, error = %e, "test runner failed, sealing conservatively");
                            attempts.push(HealingAttempt {
                                number: state.attempt,
                                classification,
                                source_before: before,
                                source_after: Some(case.source.clone()),
                                outcome: AttemptOutcome::RunError,
                                completed_at: Utc::now(),
                            });
                            diagnostic = e.to_string();
                            state.step(CaseEvent::ExecutorFailed, max)
                        }
                    }
                }

                // Terminal phases never reach the loop body.
                _ => break,
            };
        }

        let status = match state.phase {
            CasePhase::Healed => HealStatus::SuccessfullyHealed,
            CasePhase::Defect => HealStatus::ActualDefect,
            _ => HealStatus::MaxAttemptsExceeded,
        };

        // Only healed tests leave updated sources behind.
        if status != HealStatus::SuccessfullyHealed && wrote_source {
            if let Err(e) = self.store.save_source(&test_id, &original) {
                warn!(test = %test_id, error = %e, "could not restore original test source");
            }
        }

        HealingRecord {
            test_id,
            attempts,
            status,
            final_classification,
            final_diagnostic: diagnostic,
        }
    }

    async fn classify(&self, source: &str, diagnostic: &str) -> Result<Classification, TriageError> {
        match tokio::time::timeout(
            self.config.classify_timeout(),
            self.triage.classify(source, diagnostic),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TriageError::Provider(crate::llm::LLMError::RequestFailed(
                format!(
                    "classification timed out after {} seconds",
                    self.config.classify_timeout_secs
                ),
            ))),
        }
    }

    async fn heal(
        &self,
        source: &str,
        diagnostic: &str,
        rationale: &str,
    ) -> Result<String, TriageError> {
        match tokio::time::timeout(
            self.config.heal_timeout(),
            self.triage.heal(source, diagnostic, rationale),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TriageError::Provider(crate::llm::LLMError::RequestFailed(
                format!(
                    "healing timed out after {} seconds",
                    self.config.heal_timeout_secs
                ),
            ))),
        }
    }

    async fn rerun(
        &self,
        test_id: &str,
    ) -> Result<crate::executor::ExecutionOutcome, ExecutorError> {
        match tokio::time::timeout(self.config.rerun_timeout(), self.executor.run(test_id)).await {
            Ok(result) => result,
            Err(_) => Err(ExecutorError::Report(format!(
                "rerun produced no verdict within {} seconds",
                self.config.rerun_timeout_secs
            ))),
        }
    }
}
