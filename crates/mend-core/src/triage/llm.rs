use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::llm::LLM;
use crate::record::{Classification, ClassificationKind};

use super::patterns::pre_classify;
use super::prompts::{
    build_classify_prompt, build_heal_prompt, CLASSIFY_SYSTEM_PROMPT, HEAL_SYSTEM_PROMPT,
};
use super::{Triage, TriageError};

/// Production triage adapter backed by an LLM provider.
pub struct LlmTriage<L: LLM> {
    llm: L,
}

impl<L: LLM> LlmTriage<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }
}

/// Parses the classifier's JSON verdict.
///
/// A response that cannot be parsed resolves to ACTUAL_DEFECT with zero
/// confidence: the call succeeded, so the failure is classifiable, but not
/// with enough signal to justify an automatic repair.
fn parse_classification(response: &str) -> Classification {
    let json = extract_json(response);

    match serde_json::from_str::<ClassifyResponse>(json) {
        Ok(parsed) => {
            let kind = match parsed.classification.as_str() {
                "TEST_ERROR" => ClassificationKind::TestError,
                "ACTUAL_DEFECT" => ClassificationKind::ActualDefect,
                other => {
                    warn!(verdict = other, "unrecognized classification verdict, defaulting to defect");
                    ClassificationKind::ActualDefect
                }
            };
            Classification::new(kind, parsed.reason, parsed.confidence)
        }
        Err(e) => {
            warn!(error = %e, "classifier response was not valid JSON, defaulting to defect");
            Classification::new(
                ClassificationKind::ActualDefect,
                "classifier response could not be parsed",
                0.0,
            )
        }
    }
}

#[async_trait]
impl<L: LLM> Triage for LlmTriage<L> {
    async fn classify(
        &self,
        source: &str,
        diagnostic: &str,
    ) -> Result<Classification, TriageError> {
        if diagnostic.trim().is_empty() {
            return Err(TriageError::EmptyDiagnostic);
        }

        let hint = pre_classify(diagnostic);
        if let Some(hint) = hint {
            debug!(hint, "failure signature matched a known pattern");
        }

        let prompt = build_classify_prompt(source, diagnostic, hint);
        let response = self
            .llm
            .complete_with_system(CLASSIFY_SYSTEM_PROMPT, &prompt)
            .await?;

        Ok(parse_classification(&response))
    }

    async fn heal(
        &self,
        source: &str,
        diagnostic: &str,
        rationale: &str,
    ) -> Result<String, TriageError> {
        let prompt = build_heal_prompt(source, diagnostic, rationale);
        let response = self
            .llm
            .complete_with_system(HEAL_SYSTEM_PROMPT, &prompt)
            .await?;

        let healed = strip_code_fences(&response).trim().to_string();
        if healed.is_empty() {
            return Err(TriageError::EmptyHealedSource);
        }

        Ok(healed)
    }
}

/// Extracts JSON from a response that might be wrapped in markdown code blocks.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        if let Some(start) = trimmed.find('\n') {
            let rest = &trimmed[start + 1..];
            if let Some(end) = rest.rfind("```") {
                return rest[..end].trim();
            }
        }
    }

    trimmed
}

/// Strips a leading/trailing markdown fence from generated source.
fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop the info string ("python", "rust", ...) on the fence line
        let body = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => rest,
        };
        return body.strip_suffix("```").unwrap_or(body);
    }

    trimmed
}

/// Verdict structure the classifier is prompted to emit.
#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    classification: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    confidence: f64,
}
