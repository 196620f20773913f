/// System prompt for failure classification.
pub const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are an expert QA engineer specializing in test failure analysis.

Given a failing test's source and its failure output, decide whether the failure is caused by the test itself or by a genuine bug in the application under test.

1. TEST_ERROR - the test code is wrong:
   - Wrong endpoint URL or HTTP method
   - Wrong assertion or expected value
   - Bad test data
   - Timing/race condition
   - Missing setup or cleanup

2. ACTUAL_DEFECT - the application is wrong:
   - Correct request returns wrong data
   - Business logic error
   - Database constraint violation
   - Authentication/authorization bug

A 404 response on a documented route usually means the test used the wrong URL (TEST_ERROR), not a missing feature.

If the signal is ambiguous, classify as ACTUAL_DEFECT: an unclassifiable failure must never be silently auto-repaired.

IMPORTANT: Output your verdict as valid JSON matching this exact structure:
{
  "classification": "TEST_ERROR" or "ACTUAL_DEFECT",
  "reason": "Brief explanation",
  "confidence": 0.0 to 1.0
}

Only output the JSON, no additional text."#;

/// System prompt for test healing.
pub const HEAL_SYSTEM_PROMPT: &str = r#"You are an expert test automation engineer. Fix failing tests while maintaining their purpose.

Rules:
- Fix only the test's assertions, data, or setup - never its name or the endpoint under test
- NO comments and NO docstrings
- Return ONLY the fixed test source, no explanations and no markdown fences"#;

/// Builds the user prompt for classification.
pub fn build_classify_prompt(source: &str, diagnostic: &str, hint: Option<&str>) -> String {
    let hint_section = match hint {
        Some(h) => format!("\n## Pattern hint\n\n{h}\n"),
        None => String::new(),
    };

    format!(
        r#"## Test source

{source}

## Failure output

{diagnostic}
{hint_section}
Classify this failure."#
    )
}

/// Builds the user prompt for healing.
pub fn build_heal_prompt(source: &str, diagnostic: &str, rationale: &str) -> String {
    format!(
        r#"## Current test source

{source}

## Failure output

{diagnostic}

## Diagnosis

{rationale}

Produce the fixed test source."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prompt_includes_hint() {
        let prompt = build_classify_prompt("def t(): ...", "assert 1 == 2", Some("likely wrong URL"));
        assert!(prompt.contains("Pattern hint"));
        assert!(prompt.contains("likely wrong URL"));
    }

    #[test]
    fn test_classify_prompt_without_hint() {
        let prompt = build_classify_prompt("def t(): ...", "assert 1 == 2", None);
        assert!(!prompt.contains("Pattern hint"));
    }

    #[test]
    fn test_heal_prompt_carries_rationale() {
        let prompt = build_heal_prompt("src", "diag", "assertion expects stale value");
        assert!(prompt.contains("assertion expects stale value"));
    }
}
