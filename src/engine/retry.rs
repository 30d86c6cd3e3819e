// src/engine/retry.rs

//! Per-item retry budget with exponential backoff.

use std::time::Duration;

use rand::Rng;

use crate::models::{CrawlerConfig, WorkItem};

/// Exponential backoff with proportional jitter.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_ms: u64,
    max_ms: u64,
    jitter_percent: u64,
}

impl ExponentialBackoff {
    pub const fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            jitter_percent: 10,
        }
    }

    pub fn with_jitter(mut self, jitter_percent: u64) -> Self {
        self.jitter_percent = jitter_percent;
        self
    }

    /// Delay before attempt number `attempt + 1`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential_delay = self
            .base_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(20)));
        let capped_delay = exponential_delay.min(self.max_ms);
        let jitter = if self.jitter_percent > 0 && capped_delay > 0 {
            let spread = capped_delay.saturating_mul(self.jitter_percent) / 100;
            rand::rng().random_range(0..=spread)
        } else {
            0
        };
        Duration::from_millis(capped_delay.saturating_add(jitter))
    }
}

/// What to do with an item whose fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-enqueue `item` after waiting `delay`.
    Retry { item: WorkItem, delay: Duration },
    /// Budget exhausted.
    GiveUp,
}

/// Fixed retry budget per URL. All retry state travels with the item.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: ExponentialBackoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: ExponentialBackoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.max_retries,
            ExponentialBackoff::new(config.retry_base_delay_ms, config.retry_max_delay_ms),
        )
    }

    /// Any failed attempt is retried while budget remains.
    pub fn decide(&self, item: &WorkItem) -> RetryDecision {
        if item.retry_count >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            item: item.retried(),
            delay: self.backoff.delay(item.retry_count),
        }
    }
}
