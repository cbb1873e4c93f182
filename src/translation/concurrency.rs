/*!
 * Provider-specific concurrency tuning.
 *
 * This module provides default concurrency settings based on provider
 * characteristics such as rate limits and where the provider runs.
 */

use crate::app_config::TranslationProvider;

/// Provider-specific concurrency profile with tuned defaults
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    /// Maximum concurrent requests
    pub max_concurrent_requests: usize,
    /// Target requests per minute (for rate limiting)
    pub target_rpm: Option<u32>,
}

impl ProviderProfile {
    /// Get the default profile for a given provider
    pub fn for_provider(provider: TranslationProvider) -> Self {
        match provider {
            TranslationProvider::Google => Self {
                // Public endpoint, throttles aggressive clients with 429
                max_concurrent_requests: 5,
                target_rpm: Some(300),
            },
            TranslationProvider::Ollama => Self {
                // Local model, bounded by the machine not by quotas
                max_concurrent_requests: 4,
                target_rpm: None,
            },
        }
    }

    /// Get effective concurrent requests, respecting any user override
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> usize {
        user_override
            .filter(|n| *n > 0)
            .unwrap_or(self.max_concurrent_requests)
    }
}
