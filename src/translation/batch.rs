/*!
 * Batch translation processing.
 *
 * This module fans a sequence of subtitle entries out to a provider, one call
 * per entry with bounded concurrency, and collects the answers back in the
 * order of the input regardless of completion order.
 *
 * Each call goes through the same policy:
 * - content-addressed cache lookup (when enabled)
 * - outbound rate limiter (when configured)
 * - per-call timeout
 * - retry with exponential backoff for retryable failures, waiting at most
 *   the per-call timeout between attempts
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::app_config::TranslationConfig;
use crate::errors::{EntryFailure, ProviderError, TranslationError, ValidationError};
use crate::providers::Provider;
use crate::subtitle_processor::SubtitleEntry;

use super::cache::TranslationCache;
use super::concurrency::ProviderProfile;
use super::rate_limit::RateLimiter;

/// What the batch does when one entry cannot be translated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep going; failed entries stay untranslated and are reported
    #[default]
    BestEffort,
    /// Abort on the first failure and cancel the calls still in flight
    FailFast,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BestEffort => write!(f, "best_effort"),
            Self::FailFast => write!(f, "fail_fast"),
        }
    }
}

/// Call policy for a batch
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum number of provider calls in flight
    pub max_concurrent_requests: usize,
    /// Timeout of a single provider call
    pub request_timeout: Duration,
    /// Retries after the first attempt for retryable failures
    pub retry_count: u32,
    /// Base backoff, doubled on each retry
    pub retry_backoff_ms: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            request_timeout: Duration::from_secs(30),
            retry_count: 2,
            retry_backoff_ms: 500,
            failure_policy: FailurePolicy::BestEffort,
        }
    }
}

impl BatchOptions {
    /// Options for the active provider of a translation config
    pub fn from_config(config: &TranslationConfig) -> Self {
        let profile = ProviderProfile::for_provider(config.provider);
        Self {
            max_concurrent_requests: profile.effective_concurrent_requests(config.get_concurrent_requests()),
            request_timeout: Duration::from_secs(config.get_timeout_secs()),
            retry_count: config.common.retry_count,
            retry_backoff_ms: config.common.retry_backoff_ms,
            failure_policy: config.common.failure_policy,
        }
    }

    /// Longest wait allowed between two attempts, the per-call timeout
    pub fn max_retry_delay(&self) -> Duration {
        self.request_timeout
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

/// Result of a batch that was not aborted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Entries in input order, translated where the call succeeded
    pub entries: Vec<SubtitleEntry>,
    /// Failed entries ordered by position, always empty under fail-fast
    pub failures: Vec<EntryFailure>,
}

impl BatchOutcome {
    /// Whether every entry was translated
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Batch translator for processing subtitle entries concurrently
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    /// The translation provider to use
    provider: Arc<dyn Provider>,

    /// Call policy
    options: BatchOptions,

    /// Shared translation cache
    cache: TranslationCache,

    /// Process-wide outbound limiter
    limiter: Option<Arc<RateLimiter>>,
}

impl BatchTranslator {
    /// Create a new batch translator without cache or rate limit
    pub fn new(provider: Arc<dyn Provider>, options: BatchOptions) -> Self {
        Self {
            provider,
            options,
            cache: TranslationCache::disabled(),
            limiter: None,
        }
    }

    /// Create a batch translator configured for the active provider
    pub fn from_config(provider: Arc<dyn Provider>, config: &TranslationConfig) -> Self {
        let cache = TranslationCache::new(config.common.cache_enabled, config.common.cache_capacity);

        let translator = Self::new(provider, BatchOptions::from_config(config)).with_cache(cache);
        match config.get_rate_limit() {
            Some(rpm) => translator.with_rate_limiter(Arc::new(RateLimiter::new(rpm))),
            None => translator,
        }
    }

    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Translate every entry of a batch into `target_language`
    pub async fn translate_batch(
        &self,
        entries: &[SubtitleEntry],
        target_language: &str,
    ) -> Result<BatchOutcome, TranslationError> {
        self.translate_batch_with_progress(entries, target_language, |_, _| {}).await
    }

    /// Translate a batch, calling `progress(completed, total)` after each entry
    pub async fn translate_batch_with_progress<F>(
        &self,
        entries: &[SubtitleEntry],
        target_language: &str,
        progress: F,
    ) -> Result<BatchOutcome, TranslationError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let target = target_language.trim();
        if target.is_empty() {
            return Err(ValidationError::new("targetLang must be a non-empty language code").into());
        }

        let total = entries.len();
        if total == 0 {
            return Ok(BatchOutcome::default());
        }

        let concurrency = self.options.max_concurrent_requests.max(1);
        info!(
            "Translating {} entries to '{}' with {} (concurrency {}, {})",
            total,
            target,
            self.provider.name(),
            concurrency,
            self.options.failure_policy
        );
        let start_time = Instant::now();

        let completed = AtomicUsize::new(0);
        let completed = &completed;
        let progress = &progress;

        let mut results = stream::iter(0..total)
            .map(move |index| async move {
                let result = self.translate_entry(&entries[index], target).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress(done, total);
                (index, result)
            })
            .buffer_unordered(concurrency);

        // Slots are filled by position, never by arrival order
        let mut slots: Vec<Option<String>> = vec![None; total];
        let mut failures = Vec::new();

        while let Some((index, result)) = results.next().await {
            match result {
                Ok(translated) => slots[index] = Some(translated),
                Err(e) => {
                    let failure = EntryFailure::new(entries[index].id, index, &e);
                    if self.options.failure_policy == FailurePolicy::FailFast {
                        // Dropping the stream cancels the calls still in flight
                        error!("Aborting batch: {}", failure);
                        return Err(TranslationError::Provider { failures: vec![failure] });
                    }
                    warn!("Failed to translate {}", failure);
                    failures.push(failure);
                }
            }
        }

        failures.sort_by_key(|f| f.index);

        let translated_entries = entries
            .iter()
            .zip(slots)
            .map(|(entry, slot)| entry.with_translation(slot.unwrap_or_default()))
            .collect();

        info!(
            "Batch finished in {:?}: {} translated, {} failed",
            start_time.elapsed(),
            total - failures.len(),
            failures.len()
        );

        Ok(BatchOutcome {
            entries: translated_entries,
            failures,
        })
    }

    /// Translate one entry's text, skipping the provider for blank text
    async fn translate_entry(&self, entry: &SubtitleEntry, target_language: &str) -> Result<String, ProviderError> {
        if entry.original_text.trim().is_empty() {
            return Ok(String::new());
        }

        if let Some(cached) = self.cache.get(&entry.original_text, target_language) {
            return Ok(cached);
        }

        let translated = self.call_with_retry(&entry.original_text, target_language).await?;
        debug!("Entry {} translated", entry.id);

        self.cache.store(&entry.original_text, target_language, &translated);
        Ok(translated)
    }

    /// One provider call under the timeout, repeated for retryable failures
    async fn call_with_retry(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let mut attempt = 0;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }

            let result = match timeout(self.options.request_timeout, self.provider.translate(text, target_language)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(self.options.request_timeout)),
            };

            match result {
                Ok(translated) => return Ok(translated),
                Err(e) if e.is_retryable() && attempt < self.options.retry_count => {
                    attempt += 1;
                    let delay = match e.retry_after() {
                        Some(requested) if requested > self.options.max_retry_delay() => {
                            warn!(
                                "{} asked to wait {:?}, more than the {:?} allowed, giving up",
                                self.provider.name(),
                                requested,
                                self.options.max_retry_delay()
                            );
                            return Err(e);
                        }
                        Some(requested) => requested,
                        None => self.options.backoff_delay(attempt).min(self.options.max_retry_delay()),
                    };
                    warn!(
                        "{} call failed ({}), retry {}/{} in {:?}",
                        self.provider.name(),
                        e,
                        attempt,
                        self.options.retry_count,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
