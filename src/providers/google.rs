use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{Provider, classify_request_error, classify_status, retry_after_secs};

/// Client for the public Google Translate `translate_a/single` endpoint
#[derive(Debug)]
pub struct GoogleTranslate {
    /// Fully built `translate_a/single` URL without query parameters
    url: Url,
    /// HTTP client for making requests
    client: Client,
    /// Source language passed as `sl` (`auto` lets Google detect it)
    source_language: String,
}

impl GoogleTranslate {
    /// Create a client against `endpoint` (e.g. `https://translate.googleapis.com`)
    pub fn new(endpoint: impl AsRef<str>, source_language: impl Into<String>) -> Result<Self, ProviderError> {
        let base = Url::parse(endpoint.as_ref())
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint '{}': {}", endpoint.as_ref(), e)))?;
        let url = base
            .join("translate_a/single")
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint '{}': {}", endpoint.as_ref(), e)))?;

        let source_language = source_language.into();
        Ok(Self {
            url,
            client: Client::builder()
                // Keep connections alive for parallel requests
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(20)
                .build()
                .unwrap_or_default(),
            source_language: if source_language.trim().is_empty() { "auto".to_string() } else { source_language },
        })
    }

    /// Extract the translated text from a `translate_a/single` response.
    ///
    /// The response is a nested array whose first element is the list of
    /// translated segments; each segment starts with its translated string.
    pub fn extract_translation(body: &Value) -> Result<String, ProviderError> {
        let segments = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("response has no segment list".to_string()))?;

        let mut translated = String::new();
        for segment in segments {
            if let Some(part) = segment.get(0).and_then(Value::as_str) {
                translated.push_str(part);
            }
        }

        if translated.is_empty() && !segments.is_empty() {
            return Err(ProviderError::ParseError("response segments carry no text".to_string()));
        }
        Ok(translated)
    }
}

#[async_trait]
impl Provider for GoogleTranslate {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.url.clone())
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_language.as_str()),
                ("tl", target_language),
                ("dt", "t"),
            ])
            .form(&[("q", text)])
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(response.headers());
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Google Translate error ({}): {}", status, error_text);
            return Err(classify_status(status, retry_after, error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let translated = Self::extract_translation(&body)?;
        debug!("Google translated {} chars into {} chars ({})", text.len(), translated.len(), target_language);
        Ok(translated)
    }
}
