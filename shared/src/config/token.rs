//! Token lifetime and cleanup configuration

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default development signing secret
const DEFAULT_JWT_SECRET: &str = "development-secret-please-change-in-production";

/// Token issuance, rotation and cleanup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// JWT secret key for signing tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// JWT issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Access token lifetime in seconds
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,

    /// How often the cleanup worker runs (in seconds)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// How long expired records are kept before deletion (in seconds)
    #[serde(default)]
    pub cleanup_retention_secs: i64,

    /// Whether the cleanup worker is started
    #[serde(default = "default_true")]
    pub cleanup_enabled: bool,

    /// Attempts made to insert a record before an id collision is reported
    #[serde(default = "default_max_issue_attempts")]
    pub max_issue_attempts: u32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            issuer: default_issuer(),
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
            cleanup_interval_secs: default_cleanup_interval(),
            cleanup_retention_secs: 0,
            cleanup_enabled: true,
            max_issue_attempts: default_max_issue_attempts(),
        }
    }
}

impl TokenConfig {
    /// Set access token lifetime in minutes
    pub fn with_access_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_token_ttl_secs = minutes * 60;
        self
    }

    /// Set refresh token lifetime in days
    pub fn with_refresh_ttl_days(mut self, days: i64) -> Self {
        self.refresh_token_ttl_secs = days * 86400;
        self
    }

    /// Check if using default secret (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Validate the lifetime contract: access tokens never outlive refresh tokens
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_ttl_secs <= 0 {
            return Err(ConfigError::invalid(
                "token.access_token_ttl_secs",
                "must be positive",
            ));
        }
        if self.refresh_token_ttl_secs <= 0 {
            return Err(ConfigError::invalid(
                "token.refresh_token_ttl_secs",
                "must be positive",
            ));
        }
        if self.access_token_ttl_secs > self.refresh_token_ttl_secs {
            return Err(ConfigError::invalid(
                "token.access_token_ttl_secs",
                format!(
                    "access TTL ({}s) must not exceed refresh TTL ({}s)",
                    self.access_token_ttl_secs, self.refresh_token_ttl_secs
                ),
            ));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "token.cleanup_interval_secs",
                "must be positive",
            ));
        }
        if self.cleanup_retention_secs < 0 {
            return Err(ConfigError::invalid(
                "token.cleanup_retention_secs",
                "must not be negative",
            ));
        }
        if self.max_issue_attempts == 0 {
            return Err(ConfigError::invalid(
                "token.max_issue_attempts",
                "at least one attempt is required",
            ));
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::invalid("token.jwt_secret", "must not be empty"));
        }
        Ok(())
    }
}

fn default_jwt_secret() -> String {
    String::from(DEFAULT_JWT_SECRET)
}

fn default_issuer() -> String {
    String::from("connection-auth")
}

fn default_access_ttl() -> i64 {
    900 // 15 minutes
}

fn default_refresh_ttl() -> i64 {
    604800 // 7 days
}

fn default_cleanup_interval() -> u64 {
    3600 // hourly
}

fn default_max_issue_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}
