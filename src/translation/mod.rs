/*!
 * Batch translation of subtitle entries.
 *
 * This module contains the orchestration that sends subtitle entries to a
 * translation provider. It is split into several submodules:
 *
 * - `batch`: Concurrent fan-out/fan-in with order-preserving re-assembly
 * - `cache`: Content-addressed caching of translations
 * - `concurrency`: Per-provider concurrency and rate defaults
 * - `rate_limit`: Process-wide outbound request limiter
 */

// Re-export main types for easier usage
pub use self::batch::{BatchOptions, BatchOutcome, BatchTranslator, FailurePolicy};
pub use self::cache::TranslationCache;
pub use self::concurrency::ProviderProfile;
pub use self::rate_limit::RateLimiter;

// Submodules
pub mod batch;
pub mod cache;
pub mod concurrency;
pub mod rate_limit;
