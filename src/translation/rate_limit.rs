/*!
 * Outbound rate limiting for provider calls.
 *
 * A single token bucket is shared by every batch in the process, so the
 * requests-per-minute budget of a provider holds across concurrent HTTP
 * requests and not only within one batch.
 */

use log::debug;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Token bucket refilled continuously
#[derive(Debug)]
struct TokenBucket {
    /// Maximum tokens (burst size)
    max_tokens: f64,
    /// Current tokens
    tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    /// Last refill time
    last_refill: Instant,
}

impl TokenBucket {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            max_tokens,
            tokens: max_tokens,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    /// Take a token, or return how long until one is available
    fn try_consume(&mut self) -> Result<(), Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_rate))
        }
    }
}

/// Requests-per-minute limiter for outbound provider calls
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    requests_per_minute: u32,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_minute` calls.
    ///
    /// The burst size is a tenth of the per-minute budget (at least one), so a
    /// fresh process does not fire a whole minute's worth of calls at once.
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        let burst = (rpm / 10).max(1) as f64;
        Self {
            bucket: Mutex::new(TokenBucket::new(burst, rpm as f64 / 60.0)),
            requests_per_minute: rpm,
        }
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }

    /// Take a token without waiting
    pub fn try_acquire(&self) -> bool {
        self.bucket.lock().try_consume().is_ok()
    }

    /// Wait until a token is available and take it
    pub async fn acquire(&self) {
        loop {
            // The guard must be released before sleeping
            let wait = match self.bucket.lock().try_consume() {
                Ok(()) => return,
                Err(wait) => wait,
            };
            debug!("Rate limit reached ({} rpm), waiting {:?}", self.requests_per_minute, wait);
            tokio::time::sleep(wait).await;
        }
    }
}
