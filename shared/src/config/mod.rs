//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `token` - Access/refresh token lifetimes and cleanup policy
//! - `messaging` - Command bus topics, timeouts and sweep cadence
//! - `database` - Refresh token store connection settings
//! - `environment` - Environment detection and logging configuration

pub mod database;
pub mod environment;
pub mod messaging;
pub mod token;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

// Re-export commonly used types
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use messaging::MessagingConfig;
pub use token::TokenConfig;

/// Prefix of environment variables overriding configuration (`CONN__TOKEN__ISSUER`)
pub const ENV_PREFIX: &str = "CONN";

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Token lifetimes and cleanup
    #[serde(default)]
    pub token: TokenConfig,

    /// Command bus configuration
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Refresh token store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create configuration for an environment with built-in defaults
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            logging: LoggingConfig::for_environment(environment),
            ..Default::default()
        }
    }

    /// Load configuration for the environment named by `ENVIRONMENT`
    ///
    /// Sources, lowest priority first: built-in defaults, the optional
    /// `config.<environment>.toml` file, then `CONN__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_for(Environment::from_env())
    }

    /// Load and validate configuration for a specific environment
    pub fn load_for(environment: Environment) -> Result<Self, ConfigError> {
        let logging = LoggingConfig::for_environment(environment);

        let settings = config::Config::builder()
            .set_default("environment", environment.to_string())?
            .set_default("logging.level", logging.level.clone())?
            .set_default("logging.format", format!("{:?}", logging.format).to_lowercase())?
            .add_source(config::File::with_name(environment.config_file()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section, reporting the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.token.validate()?;
        self.messaging.validate()?;
        self.database.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_app_config_is_valid() {
        let config = AppConfig::for_environment(Environment::Production);
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.level, "warn");
        assert!(!config.database.is_configured());
    }

    #[test]
    fn test_validate_reports_token_contract_violation() {
        let mut config = AppConfig::default();
        config.token.access_token_ttl_secs = config.token.refresh_token_ttl_secs + 1;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "token.access_token_ttl_secs"));
    }

    #[test]
    fn test_load_for_without_files_uses_defaults() {
        let config = AppConfig::load_for(Environment::Staging).unwrap();
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.messaging.command_topic, "auth.commands");
    }

    #[test]
    fn test_deserialize_sections_independently() {
        let json = r#"{
            "messaging": { "service_name": "device-service", "command_topic": "auth.commands" }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.messaging.service_name, "device-service");
        assert_eq!(config.messaging.response_topic, "auth.responses");
        assert_eq!(config.token.max_issue_attempts, 3);
    }
}
