//! Default values for Mend configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// LLM Defaults
// ============================================================================

/// Default LLM provider.
pub const DEFAULT_LLM_PROVIDER: &str = "openai";

/// Default max tokens for LLM responses.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default request timeout for LLM calls, in seconds.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

// OpenAI defaults
/// Default OpenAI API URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

// Anthropic defaults
/// Default Anthropic API URL.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
/// Default Anthropic model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
/// Default Anthropic API version.
pub const DEFAULT_ANTHROPIC_API_VERSION: &str = "2023-06-01";

// Ollama defaults
/// Default Ollama API URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1";
/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

// OpenRouter defaults
/// Default OpenRouter API URL.
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";

// ============================================================================
// Healing Defaults
// ============================================================================

/// Maximum healing attempts per test.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Number of per-test healing loops allowed to run concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Timeout for one classification call, in seconds.
pub const DEFAULT_CLASSIFY_TIMEOUT_SECS: u64 = 60;

/// Timeout for one healing call, in seconds.
pub const DEFAULT_HEAL_TIMEOUT_SECS: u64 = 120;

/// Timeout for one rerun as observed by the orchestrator, in seconds.
/// Larger than the executor's own budget so a well-behaved executor reports
/// its timeout as a failed run before this one fires.
pub const DEFAULT_RERUN_TIMEOUT_SECS: u64 = 90;

// ============================================================================
// Executor Defaults
// ============================================================================

/// Python interpreter used to invoke the test runner.
pub const DEFAULT_PYTHON: &str = "python";

/// Time budget for a single test execution, in seconds.
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 60;

/// Directory for transient per-run report files.
pub const DEFAULT_REPORT_DIR: &str = "reports";

// ============================================================================
// Storage Defaults
// ============================================================================

/// Root directory test sources are resolved against.
pub const DEFAULT_SOURCE_ROOT: &str = ".";

/// Path of the persisted healing report.
pub const DEFAULT_HEALING_REPORT_FILE: &str = "reports/healing_analysis.json";
