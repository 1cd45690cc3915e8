//! # NATS Event Publisher
//!
//! Publishes each event as JSON on `{prefix}.{EventName}`.

use crate::application::ports::{EventPublisher, PublishError};
use crate::domain::events::{DomainEvent, OfferEvent};
use async_trait::async_trait;

/// Default subject prefix.
pub const DEFAULT_SUBJECT_PREFIX: &str = "offers.events";

/// Event publisher backed by a NATS connection.
#[derive(Debug, Clone)]
pub struct NatsEventPublisher {
    client: async_nats::Client,
    prefix: String,
}

impl NatsEventPublisher {
    /// Connects to the NATS server at `url`.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Transport` if the connection fails.
    pub async fn connect(url: &str, prefix: Option<String>) -> Result<Self, PublishError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| PublishError::Transport(format!("NATS connect failed: {e}")))?;
        Ok(Self::from_client(client, prefix))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(client: async_nats::Client, prefix: Option<String>) -> Self {
        Self {
            client,
            prefix: prefix.unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string()),
        }
    }

    fn subject(&self, event: &OfferEvent) -> String {
        format!("{}.{}", self.prefix, event.event_name())
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, event: &OfferEvent) -> Result<(), PublishError> {
        let payload =
            serde_json::to_vec(event).map_err(|e| PublishError::Serialization(e.to_string()))?;
        self.client
            .publish(self.subject(event), payload.into())
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}
