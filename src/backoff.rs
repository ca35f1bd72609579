//! Requeue backoff for failed reconciliation passes.
//!
//! Reconcilers never retry internally; a failed pass is handed back to the
//! controller, whose error policy asks this module how long to wait before
//! the next pass. Delays grow exponentially per consecutive failure of the
//! same object and carry jitter so that many failing objects do not requeue
//! in lockstep.

use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tracing::debug;

/// Longest requeue delay handed to the controller, whatever the configuration
pub const MAX_REQUEUE_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Exponential backoff configuration
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound for the delay
    pub max_delay: Duration,
    /// Multiplier applied per consecutive failure
    pub backoff_multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(300),
            backoff_multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Delay before the next pass after `failures` consecutive failures,
    /// without jitter. `failures` starts at 1.
    ///
    /// Never exceeds `max_delay` or [`MAX_REQUEUE_DELAY`].
    pub fn delay_for(&self, failures: u32) -> Duration {
        let cap = self.max_delay.min(MAX_REQUEUE_DELAY);
        let exponent = failures.saturating_sub(1).min(64) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).map_or(cap, |delay| delay.min(cap))
    }
}

/// Apply 0.5x to 1.5x jitter to a delay
pub fn jittered(delay: Duration) -> Duration {
    let jitter = rand::thread_rng().gen_range(0.5..1.5);
    Duration::try_from_secs_f64(delay.as_secs_f64() * jitter).unwrap_or(delay)
}

/// Tracks consecutive failures per object key
#[derive(Debug, Default)]
pub struct FailureTracker {
    config: BackoffConfig,
    failures: DashMap<String, u32>,
}

impl FailureTracker {
    /// Create a tracker with the given backoff configuration
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: DashMap::new(),
        }
    }

    /// Record a failed pass for `key` and return the jittered requeue delay
    pub fn record_failure(&self, key: &str) -> Duration {
        let failures = {
            let mut entry = self.failures.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };
        let delay = jittered(self.config.delay_for(failures));
        debug!(
            key = %key,
            failures,
            delay_ms = delay.as_millis() as u64,
            "requeueing after failure"
        );
        delay
    }

    /// Forget failures of `key` after a successful pass
    pub fn reset(&self, key: &str) {
        self.failures.remove(key);
    }

    /// Consecutive failures currently recorded for `key`
    pub fn failures(&self, key: &str) -> u32 {
        self.failures.get(key).map(|f| *f).unwrap_or(0)
    }
}
