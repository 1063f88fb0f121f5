//! Value objects representing immutable domain concepts.

pub mod auth_commands;

// Re-export commonly used types
pub use auth_commands::{
    ClientUid, HealthStatus, TokenCommand, TokenKind, TokenValidation, AUTH_COMMANDS_TOPIC,
    AUTH_RESPONSES_TOPIC, COMMAND_EXTRACT_CLIENT_UID, COMMAND_HEALTH_CHECK,
    COMMAND_VALIDATE_TOKEN,
};
