//! # Event Publisher Adapters
//!
//! Implementations of [`EventPublisher`](crate::application::ports::EventPublisher).
//!
//! - [`TracingEventPublisher`]: logs each event as structured fields
//! - [`RecordingEventPublisher`]: keeps events in memory for assertions
//! - `NatsEventPublisher`: JSON events on NATS subjects (feature `nats`)

#[cfg(feature = "nats")]
pub mod nats;
pub mod recording;
pub mod tracing_publisher;

#[cfg(feature = "nats")]
pub use nats::NatsEventPublisher;
pub use recording::RecordingEventPublisher;
pub use tracing_publisher::TracingEventPublisher;
