//! Shared error types and error codes

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration source could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A value was loaded but violates a configuration contract
    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    /// Create an `Invalid` error for the given field
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes placed in the `error` field of failed command responses
pub mod error_codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const DUPLICATE: &str = "DUPLICATE";
    pub const INVALID: &str = "INVALID";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const TRANSPORT_FAILURE: &str = "TRANSPORT_FAILURE";
    pub const REJECTED: &str = "REJECTED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const UNSUPPORTED_COMMAND: &str = "UNSUPPORTED_COMMAND";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_error_message() {
        let error = ConfigError::invalid("token.access_token_ttl_secs", "must be positive");
        let message = error.to_string();
        assert!(message.contains("token.access_token_ttl_secs"));
        assert!(message.contains("must be positive"));
    }
}
