//! Tracing subscriber setup for node binaries

use conn_shared::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::InfrastructureError;

/// Filter from `RUST_LOG`, falling back to the configured level
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, InfrastructureError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            InfrastructureError::Config(format!("invalid log level '{}': {}", config.level, e))
        }),
    }
}

/// Install the global tracing subscriber
///
/// Fails if the level directive does not parse or a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).try_init(),
    };

    result.map_err(|e| InfrastructureError::Telemetry(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_config_error() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: String::from("conn_core=loud"),
            format: LogFormat::Compact,
        };

        assert!(matches!(env_filter(&config), Err(InfrastructureError::Config(_))));
    }

    #[test]
    fn test_filter_directives_accepted() {
        let config = LoggingConfig {
            level: String::from("conn_core=debug,info"),
            format: LogFormat::Json,
        };

        assert!(env_filter(&config).is_ok());
    }
}
