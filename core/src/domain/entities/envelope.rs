//! Bus envelopes: the addressed, timestamped wrappers placed on a topic.
//!
//! Envelopes are flat records. Every factory takes all of its fields, including
//! ids and timestamps, so nothing random happens inside a constructor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command addressed to a remote service that expects a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Unique per envelope
    pub event_id: String,

    /// Unique per logical request, copied into the response
    pub correlation_id: String,

    /// Discriminator used by the receiver to pick a handler
    pub command_type: String,

    /// Service that published the command
    pub source_service: String,

    /// Topic the response must be published on
    pub reply_topic: String,

    /// Instant of creation
    pub timestamp: DateTime<Utc>,

    /// Opaque domain data
    pub payload: Value,
}

impl CommandEnvelope {
    pub fn new(
        event_id: impl Into<String>,
        correlation_id: impl Into<String>,
        command_type: impl Into<String>,
        source_service: impl Into<String>,
        reply_topic: impl Into<String>,
        timestamp: DateTime<Utc>,
        payload: Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            correlation_id: correlation_id.into(),
            command_type: command_type.into(),
            source_service: source_service.into(),
            reply_topic: reply_topic.into(),
            timestamp,
            payload,
        }
    }

    /// Whether the command carries an address a response can be sent to
    pub fn expects_reply(&self) -> bool {
        !self.reply_topic.trim().is_empty() && !self.correlation_id.trim().is_empty()
    }
}

/// The answer to a `CommandEnvelope`, matched by `correlation_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Unique per envelope
    pub event_id: String,

    /// Correlation id of the command being answered
    pub correlation_id: String,

    /// Discriminator of the response (the answered command type)
    pub event_type: String,

    /// Service that handled the command
    pub source_service: String,

    /// Instant of creation
    pub timestamp: DateTime<Utc>,

    /// Whether the command was handled successfully
    pub success: bool,

    /// Result payload on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error description on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    /// Creates a successful response
    pub fn success(
        event_id: impl Into<String>,
        correlation_id: impl Into<String>,
        event_type: impl Into<String>,
        source_service: impl Into<String>,
        timestamp: DateTime<Utc>,
        data: Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            correlation_id: correlation_id.into(),
            event_type: event_type.into(),
            source_service: source_service.into(),
            timestamp,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Creates a failed response
    pub fn failure(
        event_id: impl Into<String>,
        correlation_id: impl Into<String>,
        event_type: impl Into<String>,
        source_service: impl Into<String>,
        timestamp: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            correlation_id: correlation_id.into(),
            event_type: event_type.into(),
            source_service: source_service.into(),
            timestamp,
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// What travels on a topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Envelope {
    Command(CommandEnvelope),
    Response(CommandResponse),
}

impl Envelope {
    pub fn event_id(&self) -> &str {
        match self {
            Envelope::Command(command) => &command.event_id,
            Envelope::Response(response) => &response.event_id,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Envelope::Command(command) => &command.correlation_id,
            Envelope::Response(response) => &response.correlation_id,
        }
    }

    /// Command type or response event type
    pub fn type_name(&self) -> &str {
        match self {
            Envelope::Command(command) => &command.command_type,
            Envelope::Response(response) => &response.event_type,
        }
    }
}

impl From<CommandEnvelope> for Envelope {
    fn from(command: CommandEnvelope) -> Self {
        Envelope::Command(command)
    }
}

impl From<CommandResponse> for Envelope {
    fn from(response: CommandResponse) -> Self {
        Envelope::Response(response)
    }
}
