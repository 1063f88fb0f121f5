//! Service side of the command protocol
//!
//! Listens on a command topic, routes each command to the handler registered
//! for its type and publishes the outcome to the command's reply topic under
//! the same correlation id. Every command is answered on its own task, so a
//! slow handler never holds up the commands behind it.
//!
//! The responder keeps only a weak reference to its bus. The bus owns the
//! subscription, and through it the responder, so dropping the last handle to
//! the bus tears both down.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Utc;
use conn_shared::error_codes;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::entities::envelope::{CommandEnvelope, CommandResponse, Envelope};
use crate::errors::{CommandError, DomainError};

use super::bus::{CommandBus, EnvelopeHandler};

/// Handles one or more command types
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Produce the `data` of a successful response, or the error to report
    async fn handle(&self, command: &CommandEnvelope) -> Result<Value, DomainError>;
}

/// Answers commands published on a topic
pub struct CommandResponder<B: CommandBus + 'static> {
    bus: Weak<B>,
    service_name: String,
    command_topic: String,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl<B: CommandBus + 'static> CommandResponder<B> {
    pub fn new(bus: Arc<B>, service_name: impl Into<String>, command_topic: impl Into<String>) -> Self {
        Self {
            bus: Arc::downgrade(&bus),
            service_name: service_name.into(),
            command_topic: command_topic.into(),
            handlers: HashMap::new(),
        }
    }

    /// Route commands of `command_type` to `handler`
    pub fn with_handler(mut self, command_type: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        self.handlers.insert(command_type.into(), handler);
        self
    }

    /// Command types with a registered handler
    pub fn command_types(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Subscribe to the command topic
    pub async fn start(self) -> Result<Arc<Self>, CommandError> {
        let bus = self
            .bus
            .upgrade()
            .ok_or_else(|| CommandError::transport(&self.command_topic, "command bus dropped"))?;

        let responder = Arc::new(self);
        let listener = Arc::new(CommandListener {
            responder: Arc::clone(&responder),
        });
        bus.subscribe(&responder.command_topic, listener).await?;

        info!(
            service = %responder.service_name,
            topic = %responder.command_topic,
            command_types = ?responder.command_types(),
            "Command responder started"
        );

        Ok(responder)
    }

    /// Build the response to a command, or `None` if it cannot be answered
    pub async fn respond(&self, command: &CommandEnvelope) -> Option<CommandResponse> {
        if !command.expects_reply() {
            warn!(
                event_id = %command.event_id,
                command_type = %command.command_type,
                "Dropping command without reply address"
            );
            return None;
        }

        let event_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let handler = match self.handlers.get(&command.command_type) {
            Some(handler) => handler,
            None => {
                warn!(command_type = %command.command_type, "Unknown command type");
                return Some(CommandResponse::failure(
                    event_id,
                    command.correlation_id.as_str(),
                    command.command_type.as_str(),
                    self.service_name.as_str(),
                    now,
                    format!("{}: {}", error_codes::UNSUPPORTED_COMMAND, command.command_type),
                ));
            }
        };

        let response = match handler.handle(command).await {
            Ok(data) => CommandResponse::success(
                event_id,
                command.correlation_id.as_str(),
                command.command_type.as_str(),
                self.service_name.as_str(),
                now,
                data,
            ),
            Err(e) => {
                warn!(
                    correlation_id = %command.correlation_id,
                    command_type = %command.command_type,
                    error = %e,
                    "Command handler failed"
                );
                CommandResponse::failure(
                    event_id,
                    command.correlation_id.as_str(),
                    command.command_type.as_str(),
                    self.service_name.as_str(),
                    now,
                    format!("{}: {}", e.code(), e),
                )
            }
        };

        Some(response)
    }

    /// Answer a command and publish the response to its reply topic
    pub async fn answer(&self, command: CommandEnvelope) {
        let response = match self.respond(&command).await {
            Some(response) => response,
            None => return,
        };

        let bus = match self.bus.upgrade() {
            Some(bus) => bus,
            None => {
                warn!(
                    correlation_id = %command.correlation_id,
                    "Command bus dropped, discarding response"
                );
                return;
            }
        };

        if let Err(e) = bus.publish(&command.reply_topic, response.into()).await {
            error!(
                correlation_id = %command.correlation_id,
                reply_topic = %command.reply_topic,
                error = %e,
                "Failed to publish command response"
            );
        }
    }
}

/// Subscription on the command topic; hands each command to its own task
struct CommandListener<B: CommandBus + 'static> {
    responder: Arc<CommandResponder<B>>,
}

#[async_trait]
impl<B: CommandBus + 'static> EnvelopeHandler for CommandListener<B> {
    async fn handle(&self, envelope: Envelope) {
        let command = match envelope {
            Envelope::Command(command) => command,
            Envelope::Response(response) => {
                debug!(event_id = %response.event_id, "Ignoring response on command topic");
                return;
            }
        };

        let responder = Arc::clone(&self.responder);
        tokio::spawn(async move { responder.answer(command).await });
    }
}
