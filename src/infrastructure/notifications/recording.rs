//! # Recording Notifier
//!
//! Keeps every delivered notification in memory. Can be switched to fail
//! so tests can check that delivery failures never surface to callers.

use crate::application::ports::{Notification, Notifier, NotifierError};
use crate::domain::value_objects::UserId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory notifier for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following delivery fail (`true`) or succeed.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a copy of everything delivered so far, oldest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Returns the notifications delivered to `recipient`.
    #[must_use]
    pub fn notifications_for(&self, recipient: &UserId) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| &n.recipient == recipient)
            .cloned()
            .collect()
    }

    /// Returns the number of delivered notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    /// Returns true if nothing was delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }

    /// Forgets everything recorded.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifierError::Delivery("recording notifier set to fail".to_string()));
        }
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}
