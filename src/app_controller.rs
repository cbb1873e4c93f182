use anyhow::{Result, anyhow};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::{AppError, EntryFailure, ValidationError};
use crate::providers::{self, Provider};
use crate::subtitle_processor::{SubtitleEntry, SubtitleIngestor};
use crate::translation::BatchTranslator;

// @module: Application controller for the parse and translate operations

// @struct: Result of the parse operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResponse {
    // @field: Entries in file order
    pub subtitles: Vec<SubtitleEntry>,
}

// @struct: Result of the translate operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateResponse {
    // @field: Entries in request order
    pub subtitles: Vec<SubtitleEntry>,

    // @field: Entries that could not be translated
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EntryFailure>,
}

// @struct: Validated translate request
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateRequest {
    pub subtitles: Vec<SubtitleEntry>,
    pub target_lang: String,
}

impl TranslateRequest {
    /// Validate the shape of a raw JSON translate request.
    ///
    /// Every problem is a `ValidationError`; nothing reaches a provider
    /// unless the whole request is well formed.
    pub fn from_value(body: &Value) -> Result<Self, ValidationError> {
        let object = body
            .as_object()
            .ok_or_else(|| ValidationError::new("Missing or invalid parameters: request body must be a JSON object"))?;

        let items = object
            .get("subtitles")
            .and_then(Value::as_array)
            .ok_or_else(|| ValidationError::new("Missing or invalid parameters: subtitles must be an array"))?;

        let target_lang = object
            .get("targetLang")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .ok_or_else(|| ValidationError::new("Missing or invalid parameters: targetLang must be a non-empty string"))?;

        let mut subtitles = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if !item.is_object() {
                return Err(ValidationError::new(format!(
                    "Missing or invalid parameters: subtitles[{}] must be an object",
                    index
                )));
            }
            let entry: SubtitleEntry = serde_json::from_value(item.clone()).map_err(|e| {
                ValidationError::new(format!("Missing or invalid parameters: subtitles[{}]: {}", index, e))
            })?;
            subtitles.push(entry);
        }

        Ok(Self {
            subtitles,
            target_lang: target_lang.to_string(),
        })
    }
}

/// Main application controller shared by the HTTP service and the CLI
#[derive(Debug, Clone)]
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: File to entries
    ingestor: SubtitleIngestor,

    // @field: Entries to translations
    translator: BatchTranslator,
}

impl Controller {
    // @method: Create a controller using the provider selected in the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let provider = providers::build_provider(&config.translation, &config.source_language)
            .map_err(|e| anyhow!("Failed to initialize {} provider: {}", config.translation.provider.display_name(), e))?;

        Ok(Self::with_provider(config, provider))
    }

    // @method: Create a controller around an already built provider
    pub fn with_provider(config: Config, provider: Arc<dyn Provider>) -> Self {
        let translator = BatchTranslator::from_config(provider, &config.translation);
        Self::with_parts(config, SubtitleIngestor::default(), translator)
    }

    // @method: Create a controller from explicit parts
    pub fn with_parts(config: Config, ingestor: SubtitleIngestor, translator: BatchTranslator) -> Self {
        Self {
            config,
            ingestor,
            translator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn translator(&self) -> &BatchTranslator {
        &self.translator
    }

    /// Parse an uploaded subtitle file, `None` when no file was uploaded
    pub fn parse_subtitles(&self, payload: Option<&[u8]>) -> Result<ParseResponse, AppError> {
        let subtitles = self.ingestor.parse(payload)?;
        info!("Parsed {} subtitle entries", subtitles.len());
        Ok(ParseResponse { subtitles })
    }

    /// Load entries from either a subtitle file or a parse JSON document
    pub fn load_entries(&self, payload: &[u8]) -> Result<Vec<SubtitleEntry>, AppError> {
        let looks_like_json = payload
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'{');

        if looks_like_json {
            debug!("Input looks like a parse document, reading entries from JSON");
            let document: ParseResponse = serde_json::from_slice(payload)
                .map_err(|e| ValidationError::new(format!("Invalid subtitle document: {}", e)))?;
            return Ok(document.subtitles);
        }

        Ok(self.ingestor.parse(Some(payload))?)
    }

    /// Handle a raw translate request body
    pub async fn translate_subtitles(&self, body: &Value) -> Result<TranslateResponse, AppError> {
        let request = TranslateRequest::from_value(body)?;
        self.translate_request(&request).await
    }

    /// Translate a validated request
    pub async fn translate_request(&self, request: &TranslateRequest) -> Result<TranslateResponse, AppError> {
        self.translate_entries_with_progress(&request.subtitles, &request.target_lang, |_, _| {})
            .await
    }

    /// Translate entries, reporting `(completed, total)` after each one
    pub async fn translate_entries_with_progress<F>(
        &self,
        entries: &[SubtitleEntry],
        target_lang: &str,
        progress: F,
    ) -> Result<TranslateResponse, AppError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let outcome = self
            .translator
            .translate_batch_with_progress(entries, target_lang, progress)
            .await?;

        Ok(TranslateResponse {
            subtitles: outcome.entries,
            errors: outcome.failures,
        })
    }
}
