/*!
 * Error types for the subtrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * The caller-visible taxonomy is `ErrorKind`: every `AppError` maps onto exactly
 * one kind so a client can tell "your request was malformed" apart from
 * "the translation provider is unavailable".
 */

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Message from the provider
        message: String,
        /// Seconds the provider asked us to wait, if it said so
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The call did not complete within the configured per-call timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Short, stable name of the failure used in per-entry error lists
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestFailed(_) => "RequestFailed",
            Self::ParseError(_) => "InvalidResponse",
            Self::ApiError { .. } => "Api",
            Self::ConnectionError(_) => "Connection",
            Self::RateLimitExceeded { .. } => "RateLimited",
            Self::AuthenticationError(_) => "Authentication",
            Self::Timeout(_) => "Timeout",
        }
    }

    /// Whether repeating the same call later can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitExceeded { .. } | Self::ConnectionError(_) | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Delay requested by the provider before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after_secs: Some(secs), .. } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// Errors that can occur while ingesting a subtitle file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// No file payload was supplied at all
    #[error("No file uploaded")]
    MissingInput,

    /// The payload is not valid UTF-8 text
    #[error("Subtitle file is not valid UTF-8: {0}")]
    InvalidEncoding(String),

    /// The content does not follow the subtitle grammar
    #[error("Malformed subtitle at line {line}: {message}")]
    Malformed {
        /// 1-based line number where parsing stopped
        line: usize,
        /// What was expected or found
        message: String,
    },
}

/// Malformed translate-request shape
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One entry that could not be translated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryFailure {
    /// Id of the failed entry
    pub id: u64,
    /// Position of the entry in the submitted sequence
    pub index: usize,
    /// Provider failure kind, see [`ProviderError::kind`]
    pub kind: String,
    /// Human-readable cause
    pub message: String,
}

impl EntryFailure {
    pub fn new(id: u64, index: usize, error: &ProviderError) -> Self {
        Self {
            id,
            index,
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry {} (position {}): {}", self.id, self.index + 1, self.message)
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// The batch was rejected before any provider call
    #[error("Invalid translation request: {0}")]
    Validation(#[from] ValidationError),

    /// The provider failed for the listed entries
    #[error("Translation provider failed for {}", describe_failures(.failures))]
    Provider {
        /// Every entry that caused the failure, ordered by position
        failures: Vec<EntryFailure>,
    },
}

fn describe_failures(failures: &[EntryFailure]) -> String {
    failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ")
}

/// Caller-visible error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "MissingInputError")]
    MissingInput,
    #[serde(rename = "ParseError")]
    Parse,
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "TranslationProviderError")]
    TranslationProvider,
    #[serde(rename = "InternalError")]
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingInput => "MissingInputError",
            Self::Parse => "ParseError",
            Self::Validation => "ValidationError",
            Self::TranslationProvider => "TranslationProviderError",
            Self::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// No file / missing payload
    #[error("{0}")]
    MissingInput(String),

    /// Subtitle content present but unparsable
    #[error("Failed to parse subtitle file: {0}")]
    Parse(SubtitleError),

    /// Malformed translate request
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Provider failure for one or more entries
    #[error("{0}")]
    TranslationProvider(TranslationError),

    /// Any other error
    #[error("Unexpected error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInput(_) => ErrorKind::MissingInput,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Validation(_) => ErrorKind::Validation,
            Self::TranslationProvider(_) => ErrorKind::TranslationProvider,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Entries responsible for a provider error, empty for every other kind
    pub fn failures(&self) -> &[EntryFailure] {
        match self {
            Self::TranslationProvider(TranslationError::Provider { failures }) => failures,
            _ => &[],
        }
    }
}

impl From<SubtitleError> for AppError {
    fn from(error: SubtitleError) -> Self {
        match error {
            SubtitleError::MissingInput => Self::MissingInput(error.to_string()),
            other => Self::Parse(other),
        }
    }
}

impl From<TranslationError> for AppError {
    fn from(error: TranslationError) -> Self {
        match error {
            TranslationError::Validation(e) => Self::Validation(e),
            provider => Self::TranslationProvider(provider),
        }
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Internal(error.to_string())
    }
}
