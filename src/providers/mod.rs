/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported backends:
 * - Google: the public Google Translate endpoint (default)
 * - Ollama: Local LLM server
 * - Mock: deterministic in-process provider for tests and benchmarks
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

/// Common trait for all translation providers
///
/// A provider maps `(text, target language)` to translated text. It is
/// fallible and may throttle; the batch translator owns timeouts, retries
/// and concurrency, so implementations make exactly one attempt per call.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Provider identifier used in logs
    fn name(&self) -> &str;

    /// Translate a single text into `target_language`
    ///
    /// # Arguments
    /// * `text` - The text to translate
    /// * `target_language` - Target language code as supplied by the caller
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or an error
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError>;
}

/// Build the provider selected in the configuration
pub fn build_provider(config: &TranslationConfig, source_language: &str) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider: Arc<dyn Provider> = match config.provider {
        TranslationProvider::Google => Arc::new(google::GoogleTranslate::new(
            config.get_endpoint(),
            source_language,
        )?),
        TranslationProvider::Ollama => Arc::new(ollama::Ollama::new(
            config.get_endpoint(),
            config.get_model(),
            config.common.temperature,
        )?),
    };
    Ok(provider)
}

/// Map a transport failure from reqwest onto a provider error
pub(crate) fn classify_request_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() {
        ProviderError::ConnectionError(error.to_string())
    } else if error.is_decode() {
        ProviderError::ParseError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

/// Map a non-success HTTP status onto a provider error
pub(crate) fn classify_status(status: reqwest::StatusCode, retry_after_secs: Option<u64>, body: String) -> ProviderError {
    match status.as_u16() {
        429 => ProviderError::RateLimitExceeded { message: body, retry_after_secs },
        401 | 403 => ProviderError::AuthenticationError(format!("{}: {}", status, body)),
        code => ProviderError::ApiError { status_code: code, message: body },
    }
}

/// Read the `Retry-After` header when it carries a number of seconds
pub(crate) fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

pub mod google;
pub mod mock;
pub mod ollama;
