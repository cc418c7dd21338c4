// src/crawl/config.rs
// =============================================================================
// Knobs for one crawl run, plus the checks we run before starting.
//
// The two policy enums make the crawl's behavior under pressure explicit:
// - AdmissionPolicy: what happens to a new child page when every
//   concurrency token is taken
// - ParentPolicy: which parent is recorded when several pages link to the
//   same URL
// =============================================================================

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_SINK_CAPACITY: usize = 1000;
// Far below tokio's semaphore limit; more parallel fetches than this is a typo
pub const MAX_CONCURRENCY: usize = 4096;

// What to do with a child page when the limiter is saturated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdmissionPolicy {
    /// Queue the child and wait for a token. Every reachable page within
    /// max_depth gets fetched.
    #[default]
    Block,
    /// Try to take a token when the child is found; drop the child if none
    /// is free. The link is still reported, but its page is never fetched.
    DropWhenSaturated,
}

// Which parent wins when a URL is reported more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParentPolicy {
    /// The first report to reach the collector is kept
    #[default]
    FirstWins,
    /// Every report overwrites the previous parent
    LastWins,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// How many link hops to follow. 0 = fetch nothing, 1 = only the seed.
    pub max_depth: usize,
    /// Maximum number of pages being fetched at the same time
    pub concurrency: usize,
    /// Per-request timeout handed to the fetcher
    pub fetch_timeout: Duration,
    pub admission: AdmissionPolicy,
    pub parent_policy: ParentPolicy,
    /// Capacity of the frontier queue between pages and the dispatcher
    pub queue_capacity: usize,
    /// Capacity of the channel feeding the link collector
    pub sink_capacity: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            admission: AdmissionPolicy::default(),
            parent_policy: ParentPolicy::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            sink_capacity: DEFAULT_SINK_CAPACITY,
        }
    }
}

impl CrawlConfig {
    pub fn new(max_depth: usize, concurrency: usize) -> Self {
        Self {
            max_depth,
            concurrency,
            ..Self::default()
        }
    }

    pub fn with_admission(mut self, admission: AdmissionPolicy) -> Self {
        self.admission = admission;
        self
    }

    pub fn with_parent_policy(mut self, parent_policy: ParentPolicy) -> Self {
        self.parent_policy = parent_policy;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::ConcurrencyTooHigh(self.concurrency));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("queue"));
        }
        if self.sink_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("sink"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

// Seeds are taken as-is (no normalization); only emptiness is rejected
pub fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    if seed.trim().is_empty() {
        return Err(ConfigError::EmptySeed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CrawlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.admission, AdmissionPolicy::Block);
        assert_eq!(config.parent_policy, ParentPolicy::FirstWins);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = CrawlConfig::new(2, 0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));
    }

    #[test]
    fn test_absurd_concurrency_rejected() {
        let config = CrawlConfig::new(2, MAX_CONCURRENCY + 1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ConcurrencyTooHigh(MAX_CONCURRENCY + 1))
        );
        assert!(CrawlConfig::new(2, MAX_CONCURRENCY).validate().is_ok());
    }

    #[test]
    fn test_zero_capacities_rejected() {
        let mut config = CrawlConfig::default();
        config.sink_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity("sink")));

        let mut config = CrawlConfig::default();
        config.queue_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity("queue")));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = CrawlConfig::default().with_fetch_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn test_blank_seed_rejected() {
        assert_eq!(validate_seed(""), Err(ConfigError::EmptySeed));
        assert_eq!(validate_seed("   "), Err(ConfigError::EmptySeed));
        assert!(validate_seed("https://example.com").is_ok());
    }
}
