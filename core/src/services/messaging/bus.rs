//! Publish/subscribe transport interface

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entities::envelope::Envelope;
use crate::errors::CommandError;

/// Receives envelopes delivered on a subscribed topic
///
/// Implementations must return promptly: a handler runs on the bus delivery
/// path and must never wait for a caller.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    async fn handle(&self, envelope: Envelope);
}

/// Named-topic pub/sub transport
#[async_trait]
pub trait CommandBus: Send + Sync {
    /// Publish an envelope on `topic`
    ///
    /// # Returns
    /// * `Err(CommandError)` - kind `Transport` if the envelope could not be handed to the bus
    async fn publish(&self, topic: &str, envelope: Envelope) -> Result<(), CommandError>;

    /// Deliver every envelope later published on `topic` to `handler`
    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Result<(), CommandError>;
}
