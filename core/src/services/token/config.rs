//! Configuration for the token lifecycle manager

use chrono::Duration;
use conn_shared::TokenConfig;

/// Lifetimes and limits used by `TokenLifecycleManager`
#[derive(Debug, Clone)]
pub struct TokenLifecycleConfig {
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
    /// How long expired records are kept before cleanup deletes them
    pub cleanup_retention: Duration,
    /// Attempts made when a generated token id collides with a stored one
    pub max_issue_attempts: u32,
}

impl Default for TokenLifecycleConfig {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            cleanup_retention: Duration::zero(),
            max_issue_attempts: 3,
        }
    }
}

impl TokenLifecycleConfig {
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn with_cleanup_retention(mut self, retention: Duration) -> Self {
        self.cleanup_retention = retention;
        self
    }
}

impl From<&TokenConfig> for TokenLifecycleConfig {
    fn from(config: &TokenConfig) -> Self {
        Self {
            access_ttl: Duration::seconds(config.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_secs),
            cleanup_retention: Duration::seconds(config.cleanup_retention_secs),
            max_issue_attempts: config.max_issue_attempts.max(1),
        }
    }
}
