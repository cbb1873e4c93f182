/*!
 * Mock provider implementation for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::intermittent(n)` - Fails every n-th request
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::slow(ms)` - Succeeds after a delay (timeout testing)
 *
 * Per-text overrides make it possible to fail or delay one specific entry,
 * and random delays shuffle the completion order of concurrent calls.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::Provider;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every `(text, target_language)` received, in call order
    calls: Arc<Mutex<Vec<(String, String)>>>,
    /// Fixed translations by source text
    dictionary: HashMap<String, String>,
    /// Errors forced for specific source texts
    failures: HashMap<String, ProviderError>,
    /// Delays forced for specific source texts
    delays: HashMap<String, Duration>,
    /// Upper bound for a random per-call delay
    random_delay_ms: Option<u64>,
    /// Calls currently in flight and the observed maximum
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            dictionary: HashMap::new(),
            failures: HashMap::new(),
            delays: HashMap::new(),
            random_delay_ms: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that answers after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Use fixed translations for the given source texts
    pub fn with_translations(mut self, pairs: &[(&str, &str)]) -> Self {
        for (source, target) in pairs {
            self.dictionary.insert(source.to_string(), target.to_string());
        }
        self
    }

    /// Fail every call whose source text is `text`
    pub fn fail_on(mut self, text: &str, error: ProviderError) -> Self {
        self.failures.insert(text.to_string(), error);
        self
    }

    /// Delay every call whose source text is `text`
    pub fn delay_on(mut self, text: &str, delay_ms: u64) -> Self {
        self.delays.insert(text.to_string(), Duration::from_millis(delay_ms));
        self
    }

    /// Sleep a random 0..=max_ms before answering each call
    pub fn with_random_delays(mut self, max_ms: u64) -> Self {
        self.random_delay_ms = Some(max_ms);
        self
    }

    /// Number of calls received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the calls received so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    /// Calls currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Deterministic translation used when no dictionary entry exists
    pub fn default_translation(text: &str, target_language: &str) -> String {
        format!("[{}] {}", target_language, text)
    }

    fn delay_for(&self, text: &str) -> Duration {
        if let Some(delay) = self.delays.get(text) {
            return *delay;
        }
        if let Some(max_ms) = self.random_delay_ms {
            return Duration::from_millis(rand::rng().random_range(0..=max_ms));
        }
        match self.behavior {
            MockBehavior::Slow { delay_ms } => Duration::from_millis(delay_ms),
            _ => Duration::ZERO,
        }
    }

    async fn answer(&self, count: usize, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let delay = self.delay_for(text);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.get(text) {
            return Err(error.clone());
        }

        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),
            MockBehavior::Intermittent { fail_every } if count % fail_every == fail_every - 1 => {
                Err(ProviderError::ApiError {
                    message: format!("Simulated intermittent failure (request #{})", count + 1),
                    status_code: 503,
                })
            }
            _ => Ok(self
                .dictionary
                .get(text)
                .cloned()
                .unwrap_or_else(|| Self::default_translation(text, target_language))),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push((text.to_string(), target_language.to_string()));

        let _guard = InFlightGuard::enter(&self.in_flight, &self.max_in_flight);
        self.answer(count, text, target_language).await
    }
}

/// Counts a call as in flight until dropped, including when the caller
/// abandons the future on a timeout or a cancelled batch
struct InFlightGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(in_flight: &'a AtomicUsize, max_in_flight: &AtomicUsize) -> Self {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { in_flight }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
