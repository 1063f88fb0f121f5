//! In-process implementation of `CommandBus`
//!
//! Each subscription owns an unbounded channel drained by its own task, so a
//! publisher never waits on a handler and a slow handler only delays its own
//! subscription. Envelopes published on a topic nobody listens to are lost,
//! as they would be on a broker without consumers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use conn_core::domain::entities::envelope::Envelope;
use conn_core::errors::CommandError;
use conn_core::services::messaging::{CommandBus, EnvelopeHandler};

struct Subscription {
    sender: mpsc::UnboundedSender<Envelope>,
    task: JoinHandle<()>,
}

/// Topic-addressed bus living inside one process
#[derive(Default)]
pub struct InMemoryCommandBus {
    topics: RwLock<HashMap<String, Vec<Subscription>>>,
}

impl InMemoryCommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on `topic`
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map(|subs| subs.iter().filter(|s| !s.sender.is_closed()).count())
            .unwrap_or(0)
    }

    /// Stop every subscription task
    pub async fn shutdown(&self) {
        let mut topics = self.topics.write().await;
        for (_, subscriptions) in topics.drain() {
            for subscription in subscriptions {
                subscription.task.abort();
            }
        }
    }
}

#[async_trait]
impl CommandBus for InMemoryCommandBus {
    async fn publish(&self, topic: &str, envelope: Envelope) -> Result<(), CommandError> {
        let topics = self.topics.read().await;

        let subscriptions = match topics.get(topic) {
            Some(subscriptions) if !subscriptions.is_empty() => subscriptions,
            _ => {
                debug!(topic = %topic, event_id = %envelope.event_id(), "No subscribers, envelope dropped");
                return Ok(());
            }
        };

        let mut delivered = 0;
        for subscription in subscriptions {
            if subscription.sender.send(envelope.clone()).is_ok() {
                delivered += 1;
            }
        }

        if delivered == 0 {
            return Err(CommandError::transport(topic, "all subscribers are closed"));
        }

        debug!(
            topic = %topic,
            event_id = %envelope.event_id(),
            correlation_id = %envelope.correlation_id(),
            delivered,
            "Envelope published"
        );
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Result<(), CommandError> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Envelope>();
        let topic_name = topic.to_string();

        let task = tokio::spawn(async move {
            while let Some(envelope) = receiver.recv().await {
                handler.handle(envelope).await;
            }
            warn!(topic = %topic_name, "Subscription closed");
        });

        self.topics
            .write()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(Subscription { sender, task });

        debug!(topic = %topic, "Subscribed");
        Ok(())
    }
}

impl Drop for InMemoryCommandBus {
    fn drop(&mut self) {
        for subscriptions in self.topics.get_mut().values() {
            for subscription in subscriptions {
                subscription.task.abort();
            }
        }
    }
}
