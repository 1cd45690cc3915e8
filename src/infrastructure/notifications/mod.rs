//! # Notifier Adapters
//!
//! Implementations of [`Notifier`](crate::application::ports::Notifier).
//!
//! - [`LogNotifier`]: writes each notification to the tracing log
//! - [`WebhookNotifier`]: posts notifications as JSON to a webhook
//! - [`RecordingNotifier`]: keeps notifications in memory for assertions

pub mod log;
pub mod recording;
pub mod webhook;

pub use log::LogNotifier;
pub use recording::RecordingNotifier;
pub use webhook::WebhookNotifier;
