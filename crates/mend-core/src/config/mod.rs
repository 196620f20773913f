//! Configuration management for Mend.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `mend.toml` file
//! 3. User config `~/.config/mend/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration.
    pub llm: LLMConfig,

    /// Healing loop configuration.
    pub healing: HealingConfig,

    /// Test executor configuration.
    pub executor: ExecutorConfig,

    /// Storage configuration.
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./mend.toml` (project local)
    /// 2. `~/.config/mend/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("mend.toml").exists() {
            return Self::from_file("mend.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("mend").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // LLM overrides
        if let Ok(provider) = std::env::var("MEND_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("MEND_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Ok(url) = std::env::var("MEND_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("MEND_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(tokens) = std::env::var("MEND_LLM_MAX_TOKENS") {
            if let Ok(n) = tokens.parse() {
                self.llm.max_tokens = n;
            }
        }

        // Healing overrides
        if let Ok(n) = std::env::var("MEND_MAX_ATTEMPTS") {
            if let Ok(n) = n.parse() {
                self.healing.max_attempts = n;
            }
        }
        if let Ok(n) = std::env::var("MEND_CONCURRENCY") {
            if let Ok(n) = n.parse() {
                self.healing.concurrency = n;
            }
        }
        if let Ok(n) = std::env::var("MEND_SESSION_TIMEOUT_SECS") {
            if let Ok(n) = n.parse() {
                self.healing.session_timeout_secs = Some(n);
            }
        }

        // Executor overrides
        if let Ok(python) = std::env::var("MEND_PYTHON") {
            self.executor.python = python;
        }
        if let Ok(n) = std::env::var("MEND_RUN_TIMEOUT_SECS") {
            if let Ok(n) = n.parse() {
                self.executor.run_timeout_secs = n;
            }
        }
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Provider name: "openai", "anthropic", "ollama", or "openai-compatible".
    pub provider: String,

    /// Model name (provider-specific).
    pub model: Option<String>,

    /// Base URL for API (for openai-compatible providers).
    pub base_url: Option<String>,

    /// API key (can also be set via environment variable).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum tokens for response.
    pub max_tokens: u32,

    /// API version (for Anthropic).
    pub api_version: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_LLM_PROVIDER.to_string(),
            model: None,
            base_url: None,
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            api_version: Some(DEFAULT_ANTHROPIC_API_VERSION.to_string()),
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

impl LLMConfig {
    /// Get the model name, falling back to provider defaults.
    pub fn model_or_default(&self) -> String {
        self.model.clone().unwrap_or_else(|| match self.provider.as_str() {
            "anthropic" | "claude" => DEFAULT_ANTHROPIC_MODEL.to_string(),
            "ollama" => DEFAULT_OLLAMA_MODEL.to_string(),
            _ => DEFAULT_OPENAI_MODEL.to_string(),
        })
    }

    /// Get the base URL, falling back to provider defaults.
    pub fn base_url_or_default(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| match self.provider.as_str() {
            "anthropic" | "claude" => DEFAULT_ANTHROPIC_URL.to_string(),
            "ollama" => DEFAULT_OLLAMA_URL.to_string(),
            "openrouter" => DEFAULT_OPENROUTER_URL.to_string(),
            _ => DEFAULT_OPENAI_URL.to_string(),
        })
    }

    /// Get API key from config or environment.
    pub fn api_key_or_env(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("MEND_LLM_API_KEY").ok())
            .or_else(|| match self.provider.as_str() {
                "anthropic" | "claude" => std::env::var("ANTHROPIC_API_KEY").ok(),
                "openrouter" => std::env::var("OPENROUTER_API_KEY").ok(),
                _ => std::env::var("OPENAI_API_KEY").ok(),
            })
    }
}

/// Healing loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealingConfig {
    /// Upper bound on heal+rerun cycles per test.
    pub max_attempts: u32,

    /// How many per-test loops may run concurrently.
    pub concurrency: usize,

    /// Timeout for one classification call, in seconds.
    pub classify_timeout_secs: u64,

    /// Timeout for one healing call, in seconds.
    pub heal_timeout_secs: u64,

    /// Timeout for one rerun call, in seconds.
    pub rerun_timeout_secs: u64,

    /// Optional wall-clock budget for the whole session, in seconds.
    /// When it elapses, in-flight tests are sealed conservatively.
    pub session_timeout_secs: Option<u64>,
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            concurrency: DEFAULT_CONCURRENCY,
            classify_timeout_secs: DEFAULT_CLASSIFY_TIMEOUT_SECS,
            heal_timeout_secs: DEFAULT_HEAL_TIMEOUT_SECS,
            rerun_timeout_secs: DEFAULT_RERUN_TIMEOUT_SECS,
            session_timeout_secs: None,
        }
    }
}

impl HealingConfig {
    pub fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs)
    }

    pub fn heal_timeout(&self) -> Duration {
        Duration::from_secs(self.heal_timeout_secs)
    }

    pub fn rerun_timeout(&self) -> Duration {
        Duration::from_secs(self.rerun_timeout_secs)
    }
}

/// Test executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Python interpreter used to invoke the runner.
    pub python: String,

    /// Time budget for a single test execution, in seconds.
    pub run_timeout_secs: u64,

    /// Directory for transient per-run report files.
    pub report_dir: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
            run_timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
            report_dir: DEFAULT_REPORT_DIR.to_string(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory test sources are resolved against.
    pub source_root: String,

    /// Path of the persisted healing report.
    pub report_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            source_root: DEFAULT_SOURCE_ROOT.to_string(),
            report_file: DEFAULT_HEALING_REPORT_FILE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, DEFAULT_LLM_PROVIDER);
        assert_eq!(config.healing.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.healing.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.executor.python, DEFAULT_PYTHON);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[llm]"));
        assert!(toml_str.contains("[healing]"));
        assert!(toml_str.contains("[executor]"));
        assert!(toml_str.contains("[storage]"));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[llm]
provider = "ollama"
model = "llama3"

[healing]
max_attempts = 5
concurrency = 2

[executor]
python = "python3"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.healing.max_attempts, 5);
        assert_eq!(config.healing.concurrency, 2);
        assert_eq!(config.executor.python, "python3");
        // Unset sections fall back to defaults
        assert_eq!(config.storage.report_file, DEFAULT_HEALING_REPORT_FILE);
    }

    #[test]
    fn test_model_or_default() {
        let mut config = LLMConfig::default();

        config.provider = "anthropic".to_string();
        assert_eq!(config.model_or_default(), DEFAULT_ANTHROPIC_MODEL);

        config.provider = "ollama".to_string();
        assert_eq!(config.model_or_default(), DEFAULT_OLLAMA_MODEL);

        config.model = Some("custom-model".to_string());
        assert_eq!(config.model_or_default(), "custom-model");
    }

    #[test]
    fn test_timeouts_as_durations() {
        let config = HealingConfig::default();
        assert_eq!(config.classify_timeout(), Duration::from_secs(DEFAULT_CLASSIFY_TIMEOUT_SECS));
        assert_eq!(config.heal_timeout(), Duration::from_secs(DEFAULT_HEAL_TIMEOUT_SECS));
    }
}
