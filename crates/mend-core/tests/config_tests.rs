use mend_core::config::{
    Config, HealingConfig, LLMConfig, DEFAULT_ANTHROPIC_MODEL, DEFAULT_CONCURRENCY,
    DEFAULT_HEALING_REPORT_FILE, DEFAULT_MAX_ATTEMPTS, DEFAULT_OLLAMA_MODEL, DEFAULT_OPENAI_MODEL,
};

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.healing.max_attempts, DEFAULT_MAX_ATTEMPTS);
    assert_eq!(config.healing.concurrency, DEFAULT_CONCURRENCY);
    assert!(config.healing.session_timeout_secs.is_none());
    assert_eq!(config.storage.report_file, DEFAULT_HEALING_REPORT_FILE);
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config: Config = toml::from_str(
        r#"
[healing]
max_attempts = 1
session_timeout_secs = 600
"#,
    )
    .unwrap();

    assert_eq!(config.healing.max_attempts, 1);
    assert_eq!(config.healing.session_timeout_secs, Some(600));
    assert_eq!(config.healing.concurrency, DEFAULT_CONCURRENCY);
    assert_eq!(config.llm.provider, "openai");
}

#[test]
fn test_default_config_string_is_parseable() {
    let rendered = Config::default_config_string();
    let reparsed: Config = toml::from_str(&rendered).unwrap();
    assert_eq!(reparsed.healing.max_attempts, DEFAULT_MAX_ATTEMPTS);
}

#[test]
fn test_model_fallbacks_per_provider() {
    let mut llm = LLMConfig::default();
    assert_eq!(llm.model_or_default(), DEFAULT_OPENAI_MODEL);

    llm.provider = "anthropic".to_string();
    assert_eq!(llm.model_or_default(), DEFAULT_ANTHROPIC_MODEL);

    llm.provider = "ollama".to_string();
    assert_eq!(llm.model_or_default(), DEFAULT_OLLAMA_MODEL);
}

#[test]
fn test_healing_timeouts_convert_to_durations() {
    let healing = HealingConfig {
        classify_timeout_secs: 7,
        ..HealingConfig::default()
    };
    assert_eq!(healing.classify_timeout().as_secs(), 7);
}
