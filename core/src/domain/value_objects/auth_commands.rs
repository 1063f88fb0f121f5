//! Auth domain commands carried on the command bus and their payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic auth commands are published on
pub const AUTH_COMMANDS_TOPIC: &str = "auth.commands";

/// Topic auth responses are published on
pub const AUTH_RESPONSES_TOPIC: &str = "auth.responses";

/// Validate an access token and report its owner
pub const COMMAND_VALIDATE_TOKEN: &str = "VALIDATE_TOKEN";

/// Extract the client id from a token
pub const COMMAND_EXTRACT_CLIENT_UID: &str = "EXTRACT_CLIENT_UID";

/// Liveness probe
pub const COMMAND_HEALTH_CHECK: &str = "HEALTH_CHECK";

/// Which kind of token a command refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Payload of `VALIDATE_TOKEN` and `EXTRACT_CLIENT_UID`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCommand {
    pub token: String,
    pub token_type: TokenKind,
}

impl TokenCommand {
    pub fn access(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: TokenKind::Access,
        }
    }
}

/// Result of `VALIDATE_TOKEN`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    pub valid: bool,
    pub client_id: Uuid,
    pub token_type: TokenKind,
}

/// Result of `EXTRACT_CLIENT_UID`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientUid {
    pub client_id: Uuid,
}

/// Result of `HEALTH_CHECK`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    pub fn ok(service: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            status: String::from("OK"),
            service: service.into(),
            timestamp,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_wire_names() {
        let json = serde_json::to_string(&TokenCommand::access("abc")).unwrap();
        assert!(json.contains(r#""token_type":"ACCESS""#));

        let parsed: TokenCommand =
            serde_json::from_str(r#"{"token":"x","token_type":"REFRESH"}"#).unwrap();
        assert_eq!(parsed.token_type, TokenKind::Refresh);
    }

    #[test]
    fn test_health_status() {
        let status = HealthStatus::ok("auth-service", Utc::now());
        assert!(status.is_ok());
        assert_eq!(status.service, "auth-service");
    }
}
