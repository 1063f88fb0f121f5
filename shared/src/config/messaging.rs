//! Command bus and correlation configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::errors::ConfigError;

/// Configuration for publishing commands and correlating their responses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagingConfig {
    /// Name stamped into `source_service` of every outgoing envelope
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Topic commands are published on
    #[serde(default = "default_command_topic")]
    pub command_topic: String,

    /// Topic responses are expected on
    #[serde(default = "default_response_topic")]
    pub response_topic: String,

    /// Suffix the response topic with a per-process id
    #[serde(default)]
    pub per_instance_reply_topic: bool,

    /// Timeout applied by `send_default` (in milliseconds)
    #[serde(default = "default_command_timeout")]
    pub default_command_timeout_ms: u64,

    /// How often pending calls are checked for expired deadlines (in milliseconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,

    /// How long finished correlation ids are remembered (in milliseconds)
    #[serde(default = "default_tombstone_ttl")]
    pub tombstone_ttl_ms: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            command_topic: default_command_topic(),
            response_topic: default_response_topic(),
            per_instance_reply_topic: false,
            default_command_timeout_ms: default_command_timeout(),
            sweep_interval_ms: default_sweep_interval(),
            tombstone_ttl_ms: default_tombstone_ttl(),
        }
    }
}

impl MessagingConfig {
    /// Create a configuration for a service addressing one command domain
    pub fn new(
        service_name: impl Into<String>,
        command_topic: impl Into<String>,
        response_topic: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            command_topic: command_topic.into(),
            response_topic: response_topic.into(),
            ..Default::default()
        }
    }

    /// Set the default command timeout
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_command_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the pending-call sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn default_command_timeout(&self) -> Duration {
        Duration::from_millis(self.default_command_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn tombstone_ttl(&self) -> Duration {
        Duration::from_millis(self.tombstone_ttl_ms)
    }

    /// Resolve the topic this process listens on for responses
    ///
    /// With `per_instance_reply_topic` every call returns a fresh
    /// `<response_topic>.<uuid>` name, so resolve it once at startup.
    pub fn resolve_reply_topic(&self) -> String {
        if self.per_instance_reply_topic {
            format!("{}.{}", self.response_topic, Uuid::new_v4())
        } else {
            self.response_topic.clone()
        }
    }

    /// Validate topic names and timing contract
    ///
    /// The sweep must run at least ten times per default timeout so a timeout is
    /// detected within 10% of its deadline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::invalid("messaging.service_name", "must not be empty"));
        }
        if self.command_topic.trim().is_empty() {
            return Err(ConfigError::invalid("messaging.command_topic", "must not be empty"));
        }
        if self.response_topic.trim().is_empty() {
            return Err(ConfigError::invalid("messaging.response_topic", "must not be empty"));
        }
        if self.default_command_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "messaging.default_command_timeout_ms",
                "must be positive",
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::invalid("messaging.sweep_interval_ms", "must be positive"));
        }
        if self.sweep_interval_ms.saturating_mul(10) > self.default_command_timeout_ms {
            return Err(ConfigError::invalid(
                "messaging.sweep_interval_ms",
                format!(
                    "sweep interval ({}ms) must be at most a tenth of the default timeout ({}ms)",
                    self.sweep_interval_ms, self.default_command_timeout_ms
                ),
            ));
        }
        Ok(())
    }
}

fn default_service_name() -> String {
    String::from("auth-service")
}

fn default_command_topic() -> String {
    String::from("auth.commands")
}

fn default_response_topic() -> String {
    String::from("auth.responses")
}

fn default_command_timeout() -> u64 {
    30_000
}

fn default_sweep_interval() -> u64 {
    500
}

fn default_tombstone_ttl() -> u64 {
    300_000 // 5 minutes
}
