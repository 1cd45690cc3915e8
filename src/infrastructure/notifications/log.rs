//! Notifier that only logs.

use crate::application::ports::{Notification, Notifier, NotifierError};
use async_trait::async_trait;

/// Logs every notification at `info` and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Creates a log notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError> {
        tracing::info!(
            recipient = %notification.recipient,
            kind = %notification.kind,
            offer_id = %notification.offer_id,
            property_id = %notification.property_id,
            "notification"
        );
        Ok(())
    }
}
