//! Auth commands on the command bus: the handler answering them on the auth
//! node and the typed client other services call them with.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::domain::entities::envelope::CommandEnvelope;
use crate::domain::value_objects::auth_commands::{
    ClientUid, HealthStatus, TokenCommand, TokenKind, TokenValidation,
    COMMAND_EXTRACT_CLIENT_UID, COMMAND_HEALTH_CHECK, COMMAND_VALIDATE_TOKEN,
};
use crate::errors::{CommandError, DomainError, TokenError};
use crate::repositories::RefreshTokenStore;
use crate::services::token::TokenLifecycleManager;

use super::bus::CommandBus;
use super::dispatcher::CommandDispatcher;
use super::responder::{CommandHandler, CommandResponder};

fn to_data<T: Serialize>(value: &T) -> Result<Value, DomainError> {
    serde_json::to_value(value).map_err(|e| DomainError::Internal {
        message: format!("failed to encode response: {}", e),
    })
}

/// Answers `VALIDATE_TOKEN`, `EXTRACT_CLIENT_UID` and `HEALTH_CHECK`
pub struct AuthCommandHandler<S: RefreshTokenStore> {
    manager: Arc<TokenLifecycleManager<S>>,
    service_name: String,
}

impl<S: RefreshTokenStore + 'static> AuthCommandHandler<S> {
    pub fn new(manager: Arc<TokenLifecycleManager<S>>, service_name: impl Into<String>) -> Self {
        Self {
            manager,
            service_name: service_name.into(),
        }
    }

    /// Register this handler for every auth command type
    pub fn install<B: CommandBus + 'static>(self: Arc<Self>, responder: CommandResponder<B>) -> CommandResponder<B> {
        responder
            .with_handler(COMMAND_VALIDATE_TOKEN, self.clone())
            .with_handler(COMMAND_EXTRACT_CLIENT_UID, self.clone())
            .with_handler(COMMAND_HEALTH_CHECK, self)
    }

    /// Client id owning a token that is currently usable
    async fn authenticate(&self, command: &TokenCommand) -> Result<Uuid, TokenError> {
        match command.token_type {
            TokenKind::Access => Ok(self.manager.validate_access(&command.token)?.client_id),
            TokenKind::Refresh => {
                let record = self.manager.resolve_refresh(&command.token).await?;
                if !record.is_active_at(self.manager.now()) {
                    return Err(TokenError::invalid(record.id, "refresh token is not active"));
                }
                Ok(record.client_id)
            }
        }
    }
}

fn token_command(command: &CommandEnvelope) -> Result<TokenCommand, CommandError> {
    serde_json::from_value(command.payload.clone())
        .map_err(|e| CommandError::invalid(&command.correlation_id, format!("malformed payload: {}", e)))
}

#[async_trait]
impl<S: RefreshTokenStore + 'static> CommandHandler for AuthCommandHandler<S> {
    async fn handle(&self, command: &CommandEnvelope) -> Result<Value, DomainError> {
        match command.command_type.as_str() {
            COMMAND_VALIDATE_TOKEN => {
                let request = token_command(command)?;
                let client_id = self.authenticate(&request).await?;
                debug!(client_id = %client_id, "Token validated");
                to_data(&TokenValidation {
                    valid: true,
                    client_id,
                    token_type: request.token_type,
                })
            }
            COMMAND_EXTRACT_CLIENT_UID => {
                let request = token_command(command)?;
                let client_id = self.authenticate(&request).await?;
                to_data(&ClientUid { client_id })
            }
            COMMAND_HEALTH_CHECK => to_data(&HealthStatus::ok(self.service_name.as_str(), self.manager.now())),
            other => Err(CommandError::invalid(other, "unsupported command").into()),
        }
    }
}

/// Typed caller for the auth commands
pub struct AuthCommandClient<B: CommandBus + 'static> {
    dispatcher: Arc<CommandDispatcher<B>>,
}

impl<B: CommandBus + 'static> AuthCommandClient<B> {
    pub fn new(dispatcher: Arc<CommandDispatcher<B>>) -> Self {
        Self { dispatcher }
    }

    async fn call<T: DeserializeOwned>(&self, command_type: &str, payload: Value) -> Result<T, CommandError> {
        let data = self.dispatcher.send_default(command_type, payload).await?;
        serde_json::from_value(data)
            .map_err(|e| CommandError::invalid(command_type, format!("malformed response: {}", e)))
    }

    fn token_payload(command_type: &str, token: &str) -> Result<Value, CommandError> {
        serde_json::to_value(TokenCommand::access(token))
            .map_err(|e| CommandError::invalid(command_type, e.to_string()))
    }

    /// Ask the auth service whether an access token is valid
    pub async fn validate_token(&self, token: &str) -> Result<TokenValidation, CommandError> {
        let payload = Self::token_payload(COMMAND_VALIDATE_TOKEN, token)?;
        self.call(COMMAND_VALIDATE_TOKEN, payload).await
    }

    /// Client id an access token was issued to
    pub async fn extract_client_uid(&self, token: &str) -> Result<Uuid, CommandError> {
        let payload = Self::token_payload(COMMAND_EXTRACT_CLIENT_UID, token)?;
        let uid: ClientUid = self.call(COMMAND_EXTRACT_CLIENT_UID, payload).await?;
        Ok(uid.client_id)
    }

    pub async fn health_check(&self) -> Result<HealthStatus, CommandError> {
        self.call(COMMAND_HEALTH_CHECK, Value::Object(Default::default())).await
    }
}
