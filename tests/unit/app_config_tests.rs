/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use std::str::FromStr;
use std::time::Duration;

use subtrans::app_config::{Config, LogLevel, ProviderConfig, TranslationProvider};
use subtrans::translation::{BatchOptions, FailurePolicy};

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "auto");
    assert_eq!(config.translation.provider, TranslationProvider::Google);
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert!(config.server.cors_origins.contains(&"http://localhost:5173".to_string()));
    assert!(config.server.cors_origins.contains(&"*".to_string()));

    let common = &config.translation.common;
    assert_eq!(common.failure_policy, FailurePolicy::BestEffort);
    assert!(!common.cache_enabled);

    assert_eq!(config.translation.get_timeout_secs(), 30);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.server.port = 0;
    assert!(config.validate().is_err());
    config.server.port = 5000;

    config.translation.active_provider_config_mut().timeout_secs = 0;
    assert!(config.validate().is_err());
    config.translation.active_provider_config_mut().timeout_secs = 30;

    config.translation.active_provider_config_mut().rate_limit = Some(0);
    assert!(config.validate().is_err());
    config.translation.active_provider_config_mut().rate_limit = None;

    config.translation.common.cache_enabled = true;
    config.translation.common.cache_capacity = 0;
    assert!(config.validate().is_err());
    config.translation.common.cache_capacity = 100;

    assert!(config.validate().is_ok());
}

#[test]
fn test_config_deserialize_withPartialJson_shouldFillDefaults() -> Result<()> {
    let config: Config = serde_json::from_str(
        r#"{
            "server": { "port": 8080 },
            "translation": {
                "provider": "ollama",
                "common": { "failure_policy": "fail_fast", "cache_enabled": true }
            }
        }"#,
    )?;

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.common.failure_policy, FailurePolicy::FailFast);
    assert!(config.translation.common.cache_enabled);
    assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");
    assert_eq!(config.translation.get_model(), "llama3.2:3b");
    assert_eq!(config.translation.get_rate_limit(), None);
    Ok(())
}

#[test]
fn test_load_or_default_withMissingFile_shouldUseDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = Config::load_or_default(temp_dir.path().join("absent.json"))?;
    assert_eq!(config.server.port, 5000);
    Ok(())
}

#[test]
fn test_load_or_default_withFile_shouldReadIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{ "source_language": "en", "log_level": "debug" }"#,
    )?;

    let config = Config::load_or_default(&path)?;
    assert_eq!(config.source_language, "en");
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

#[test]
fn test_load_or_default_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;
    assert!(Config::load_or_default(&path).is_err());
    Ok(())
}

#[test]
fn test_translation_provider_fromStr_shouldParseCaseInsensitive() {
    assert_eq!(TranslationProvider::from_str("Google").unwrap(), TranslationProvider::Google);
    assert_eq!(TranslationProvider::from_str("OLLAMA").unwrap(), TranslationProvider::Ollama);
    assert!(TranslationProvider::from_str("babelfish").is_err());
    assert_eq!(TranslationProvider::Ollama.to_string(), "ollama");
}

#[test]
fn test_active_provider_config_mut_withMissingEntry_shouldCreateIt() {
    let mut config = Config::default();
    config.translation.available_providers.clear();

    config.translation.active_provider_config_mut().concurrent_requests = 7;

    let provider = config
        .translation
        .get_provider_config(&TranslationProvider::Google)
        .expect("google config should have been created");
    assert_eq!(provider.concurrent_requests, 7);
    assert_eq!(config.translation.get_concurrent_requests(), Some(7));
}

#[test]
fn test_batch_options_fromConfig_shouldUseProfileAndOverrides() {
    let mut config = Config::default();
    let options = BatchOptions::from_config(&config.translation);
    assert_eq!(options.max_concurrent_requests, 5);
    assert_eq!(options.request_timeout, Duration::from_secs(30));

    config.translation.active_provider_config_mut().concurrent_requests = 12;
    config.translation.common.failure_policy = FailurePolicy::FailFast;
    let options = BatchOptions::from_config(&config.translation);
    assert_eq!(options.max_concurrent_requests, 12);
    assert_eq!(options.failure_policy, FailurePolicy::FailFast);
}

#[test]
fn test_provider_config_new_withOllama_shouldHaveLocalDefaults() {
    let provider = ProviderConfig::new(TranslationProvider::Ollama);
    assert_eq!(provider.provider_type, "ollama");
    assert_eq!(provider.endpoint, "http://localhost:11434");
    assert!(provider.rate_limit.is_none());
}
