//! Outgoing commands and the reply listener
//!
//! `send` turns an asynchronous bus round trip into a single awaitable call.
//! The reply side is one subscriber on this node's reply topic that hands each
//! response to the `CorrelationRouter` and returns immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use conn_shared::MessagingConfig;
use serde_json::Value;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::entities::envelope::{CommandEnvelope, Envelope};
use crate::errors::CommandError;

use super::bus::{CommandBus, EnvelopeHandler};
use super::router::{CorrelationRouter, SweeperHandle};

/// Addressing and timing used by a `CommandDispatcher`
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Written into `source_service` of every command
    pub service_name: String,
    /// Topic commands are published on
    pub command_topic: String,
    /// Topic this node listens on for responses
    pub reply_topic: String,
    /// Timeout used by `send_default`
    pub default_timeout: Duration,
    /// How often pending calls are checked against their deadline
    pub sweep_interval: Duration,
    /// How long finished correlation ids are remembered
    pub tombstone_ttl: Duration,
}

impl From<&MessagingConfig> for DispatcherConfig {
    fn from(config: &MessagingConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            command_topic: config.command_topic.clone(),
            reply_topic: config.resolve_reply_topic(),
            default_timeout: config.default_command_timeout(),
            sweep_interval: config.sweep_interval(),
            tombstone_ttl: config.tombstone_ttl(),
        }
    }
}

/// Publishes commands and waits for their correlated responses
pub struct CommandDispatcher<B: CommandBus + 'static> {
    bus: Arc<B>,
    router: Arc<CorrelationRouter>,
    config: DispatcherConfig,
}

impl<B: CommandBus + 'static> CommandDispatcher<B> {
    pub fn new(bus: Arc<B>, config: DispatcherConfig) -> Self {
        let router = Arc::new(CorrelationRouter::new(config.tombstone_ttl));
        Self { bus, router, config }
    }

    pub fn router(&self) -> &Arc<CorrelationRouter> {
        &self.router
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Subscribe the reply listener and start the timeout sweeper
    ///
    /// Must be called once before `send`; without the sweeper no call ever
    /// times out.
    pub async fn start(&self) -> Result<SweeperHandle, CommandError> {
        let listener = Arc::new(ReplyListener {
            router: Arc::clone(&self.router),
        });
        self.bus.subscribe(&self.config.reply_topic, listener).await?;

        info!(
            service = %self.config.service_name,
            reply_topic = %self.config.reply_topic,
            "Command dispatcher listening for responses"
        );

        Ok(self.router.spawn_sweeper(self.config.sweep_interval))
    }

    /// Send a command and wait for its response
    ///
    /// # Returns
    /// * `Ok(Value)` - `data` of a successful response
    /// * `Err(CommandError)` - kind `Timeout` if no response arrived in time,
    ///   `Rejected` if the handler answered with a failure, `Transport` if
    ///   publishing failed
    pub async fn send(
        &self,
        command_type: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, CommandError> {
        let correlation_id = Uuid::new_v4().to_string();
        let pending = self.router.register(correlation_id.as_str(), timeout)?;

        let command = CommandEnvelope::new(
            Uuid::new_v4().to_string(),
            correlation_id.as_str(),
            command_type,
            self.config.service_name.as_str(),
            self.config.reply_topic.as_str(),
            Utc::now(),
            payload,
        );

        if let Err(e) = self.bus.publish(&self.config.command_topic, command.into()).await {
            error!(
                correlation_id = %correlation_id,
                command_type = %command_type,
                error = %e,
                "Failed to publish command"
            );
            self.router.fail(&correlation_id, e.clone());
            return Err(e);
        }

        debug!(
            correlation_id = %correlation_id,
            command_type = %command_type,
            topic = %self.config.command_topic,
            "Command published"
        );

        pending.wait().await
    }

    /// `send` with the configured default timeout
    pub async fn send_default(&self, command_type: &str, payload: Value) -> Result<Value, CommandError> {
        self.send(command_type, payload, self.config.default_timeout).await
    }
}

/// Feeds responses from the reply topic into the router
pub struct ReplyListener {
    router: Arc<CorrelationRouter>,
}

impl ReplyListener {
    pub fn new(router: Arc<CorrelationRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl EnvelopeHandler for ReplyListener {
    async fn handle(&self, envelope: Envelope) {
        let response = match envelope {
            Envelope::Response(response) => response,
            Envelope::Command(command) => {
                debug!(event_id = %command.event_id, "Ignoring command on reply topic");
                return;
            }
        };

        if response.success {
            self.router
                .resolve(&response.correlation_id, response.data.unwrap_or(Value::Null));
        } else {
            let message = response.error.unwrap_or_else(|| String::from("unspecified error"));
            let error = CommandError::rejected(&response.correlation_id, message);
            self.router.fail(&response.correlation_id, error);
        }
    }
}
