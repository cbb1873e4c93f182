/*!
 * # subtrans - subtitle parsing and batch translation
 *
 * A Rust library and service that parses subtitle files into timed entries and
 * translates them concurrently while keeping every translation attached to its
 * own entry.
 *
 * ## Features
 *
 * - Parse SubRip (.srt) files into entries with stable 1-based ids
 * - Translate entries through pluggable providers:
 *   - Google Translate public endpoint
 *   - Ollama (local LLM)
 * - Bounded concurrency with order-preserving re-assembly
 * - Best-effort or fail-fast handling of per-entry failures
 * - Per-call timeout, retry with backoff, rate limiting and optional caching
 * - HTTP service (axum) and CLI front-ends
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Entry data model, SRT parsing and rendering
 * - `translation`: Batch translation orchestration:
 *   - `translation::batch`: Concurrent fan-out/fan-in
 *   - `translation::cache`: Caching mechanisms for translations
 *   - `translation::concurrency`: Provider profiles
 *   - `translation::rate_limit`: Outbound rate limiting
 * - `providers`: Client implementations for translation backends
 * - `app_controller`: Parse and translate operations shared by the front-ends
 * - `server`: HTTP routes and handlers
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod server;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, ParseResponse, TranslateRequest, TranslateResponse};
pub use errors::{AppError, ErrorKind, ProviderError, SubtitleError, TranslationError, ValidationError};
pub use language_utils::{language_name, normalize_to_part2t};
pub use subtitle_processor::{SubtitleEntry, SubtitleIngestor};
pub use translation::{BatchOptions, BatchOutcome, BatchTranslator, FailurePolicy};
