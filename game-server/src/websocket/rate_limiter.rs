use std::time::{Duration, Instant};

/// Token bucket for inbound socket messages
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_every: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        // Subscribers mostly send heartbeats
        Self::with_limits(20, Duration::from_secs(1))
    }

    pub fn with_limits(max_tokens: u32, refill_every: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_every,
            last_refill: Instant::now(),
        }
    }

    pub fn check(&mut self) -> bool {
        self.refill();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    pub fn remaining(&mut self) -> u32 {
        self.refill();
        self.tokens
    }

    fn refill(&mut self) {
        let elapsed = self.last_refill.elapsed();
        let step = self.refill_every.as_millis().max(1);
        let earned = (elapsed.as_millis() / step) as u32;

        if earned > 0 {
            self.tokens = self.tokens.saturating_add(earned).min(self.max_tokens);
            self.last_refill = Instant::now();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
