//! # Webhook Notifier
//!
//! Posts each [`Notification`] as a JSON body to a configured URL.

use crate::application::ports::{Notification, Notifier, NotifierError};
use crate::infrastructure::http_client::{HttpClient, HttpError, HttpResult};
use async_trait::async_trait;

/// Delivers notifications to an HTTP webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: HttpClient,
    url: String,
}

impl WebhookNotifier {
    /// Creates a notifier posting to `url`, optionally with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::Configuration` if the client cannot be built.
    pub fn new(url: impl Into<String>, token: Option<&str>, timeout_ms: u64) -> HttpResult<Self> {
        let client = match token {
            Some(token) => HttpClient::with_bearer(timeout_ms, token)?,
            None => HttpClient::new(timeout_ms)?,
        };
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Returns the target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError> {
        self.client
            .post_json(&self.url, notification)
            .await
            .map_err(|e| match e {
                HttpError::Status { status, .. } => NotifierError::Rejected { status },
                other => NotifierError::Delivery(other.to_string()),
            })
    }
}
