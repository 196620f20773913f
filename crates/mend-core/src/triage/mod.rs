//! The AI triage capability: failure classification and test healing.
//!
//! The orchestrator only ever sees this trait; the production adapter wraps
//! an [`LLM`](crate::llm::LLM) provider, and tests substitute scripted fakes.

mod llm;
pub mod patterns;
pub mod prompts;

pub use llm::LlmTriage;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::LLMError;
use crate::record::Classification;

/// Errors that can occur during triage operations.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Diagnostic must not be empty")]
    EmptyDiagnostic,

    #[error("AI provider error: {0}")]
    Provider(#[from] LLMError),

    #[error("Healer returned empty source")]
    EmptyHealedSource,
}

/// Classifies failing tests and produces repaired sources.
///
/// # Contract
///
/// - `classify` always returns exactly one of the two kinds for a non-empty
///   diagnostic; an ambiguous or malformed AI response resolves to
///   ACTUAL_DEFECT so that unclassifiable failures are never auto-repaired.
///   An error means the capability itself was unavailable.
/// - `heal` is only invoked after a TEST_ERROR classification. The returned
///   source replaces the test's current source; the test's identifier and
///   category must survive the rewrite.
#[async_trait]
pub trait Triage: Send + Sync {
    async fn classify(&self, source: &str, diagnostic: &str)
        -> Result<Classification, TriageError>;

    async fn heal(
        &self,
        source: &str,
        diagnostic: &str,
        rationale: &str,
    ) -> Result<String, TriageError>;
}
