//! SDK Configuration

use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the ClinicCore client SDK
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL for the ClinicCore admin API
    pub base_url: String,

    /// Request timeout for regular calls
    pub timeout: Duration,

    /// Shorter deadline for dashboard aggregate calls; on expiry those
    /// calls fall back to cached values
    pub aggregate_timeout: Duration,

    /// Staleness bound for cached dashboard aggregates
    pub cache_ttl: Duration,

    /// Fixed backoff applied before the single retry of a safe method
    pub retry_delay: Duration,

    /// User agent string
    pub user_agent: String,

    /// Feature toggles consulted by the UI shell
    pub feature_flags: HashMap<String, bool>,
}

impl Config {
    /// Create a new configuration with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            aggregate_timeout: Duration::from_secs(8),
            cache_ttl: Duration::from_secs(3600),
            retry_delay: Duration::from_millis(250),
            user_agent: format!("ClinicCore-Rust-SDK/{}", env!("CARGO_PKG_VERSION")),
            feature_flags: HashMap::new(),
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the deadline for dashboard aggregate calls
    pub fn with_aggregate_timeout(mut self, timeout: Duration) -> Self {
        self.aggregate_timeout = timeout;
        self
    }

    /// Set the cache staleness bound
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the fixed retry backoff for safe methods
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set custom user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Toggle a named feature
    pub fn with_feature(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.feature_flags.insert(name.into(), enabled);
        self
    }

    /// Check a feature toggle (absent flags are off)
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.feature_flags.get(name).copied().unwrap_or(false)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("http://localhost:5000/api")
    }
}
