
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::envelope::Envelope;
use crate::errors::CommandError;
use crate::services::messaging::{CommandBus, DispatcherConfig, EnvelopeHandler};

pub(crate) const COMMAND_TOPIC: &str = "auth.commands";
pub(crate) const REPLY_TOPIC: &str = "auth.responses";

pub(crate) fn dispatcher_config() -> DispatcherConfig {
    DispatcherConfig {
        service_name: String::from("device-service"),
        command_topic: String::from(COMMAND_TOPIC),
        reply_topic: String::from(REPLY_TOPIC),
        default_timeout: Duration::from_secs(2),
        sweep_interval: Duration::from_millis(100),
        tombstone_ttl: Duration::from_secs(60),
    }
}

/// Bus that records what is published and delivers nothing
#[derive(Default)]
pub(crate) struct RecordingBus {
    pub published: Mutex<Vec<(String, Envelope)>>,
    pub subscriptions: Mutex<Vec<String>>,
}

impl RecordingBus {
    pub fn published(&self) -> Vec<(String, Envelope)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandBus for RecordingBus {
    async fn publish(&self, topic: &str, envelope: Envelope) -> Result<(), CommandError> {
        self.published.lock().unwrap().push((topic.to_string(), envelope));
        Ok(())
    }

    async fn subscribe(&self, topic: &str, _handler: Arc<dyn EnvelopeHandler>) -> Result<(), CommandError> {
        self.subscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }
}

/// Bus whose publish always fails
pub(crate) struct FailingBus;

#[async_trait]
impl CommandBus for FailingBus {
    async fn publish(&self, topic: &str, _envelope: Envelope) -> Result<(), CommandError> {
        Err(CommandError::transport(topic, "broker unavailable"))
    }

    async fn subscribe(&self, _topic: &str, _handler: Arc<dyn EnvelopeHandler>) -> Result<(), CommandError> {
        Ok(())
    }
}

/// In-process bus delivering each envelope to subscribers on spawned tasks
#[derive(Default)]
pub(crate) struct LoopbackBus {
    subscribers: Mutex<HashMap<String, Vec<Arc<dyn EnvelopeHandler>>>>,
}

#[async_trait]
impl CommandBus for LoopbackBus {
    async fn publish(&self, topic: &str, envelope: Envelope) -> Result<(), CommandError> {
        let handlers = self
            .subscribers
            .lock()
            .unwrap()
            .get(topic)
            .cloned()
            .unwrap_or_default();

        for handler in handlers {
            let envelope = envelope.clone();
            tokio::spawn(async move { handler.handle(envelope).await });
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: Arc<dyn EnvelopeHandler>) -> Result<(), CommandError> {
        self.subscribers
            .lock()
            .unwrap()
            .entry(topic.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }
}
