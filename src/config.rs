//! Controller configuration
//!
//! Parsed from CLI flags with environment variable fallbacks.

use std::time::Duration;

use clap::Args;

use crate::backoff::BackoffConfig;

/// Configuration for the ObjectSet controllers
#[derive(Args, Clone, Debug)]
pub struct ControllerConfig {
    /// Only watch ObjectSets in this namespace (all namespaces when unset)
    #[arg(long, env = "OBJECTSET_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Requeue interval after a successful pass, in seconds
    #[arg(long, env = "OBJECTSET_REQUEUE_INTERVAL_SECS", default_value = "60")]
    pub requeue_interval_secs: u64,

    /// Requeue delay after the first failed pass, in milliseconds
    #[arg(long, env = "OBJECTSET_BACKOFF_INITIAL_MS", default_value = "500")]
    pub backoff_initial_ms: u64,

    /// Upper bound for the requeue delay after failed passes, in seconds
    #[arg(long, env = "OBJECTSET_BACKOFF_MAX_SECS", default_value = "300")]
    pub backoff_max_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            requeue_interval_secs: 60,
            backoff_initial_ms: 500,
            backoff_max_secs: 300,
        }
    }
}

impl ControllerConfig {
    /// Requeue interval after a successful pass
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs)
    }

    /// Backoff configuration for the error policy
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(self.backoff_initial_ms),
            max_delay: Duration::from_secs(self.backoff_max_secs),
            ..Default::default()
        }
    }
}
