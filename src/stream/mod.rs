//! Live telemetry ingestion over server-sent events.
//!
//! [`open`] starts a background task that connects, decodes each message into
//! a [`crate::model::Frame`] and hands the samples to a [`SampleHandler`].
//! Dropped connections are retried with exponential backoff.

mod backoff;
mod client;
mod sse;


pub use backoff::ReconnectPolicy;
pub use client::{
    ConnectionState, SampleHandler, StreamOptions, StreamStats, Subscription, open,
};
pub use sse::{EventParser, MAX_EVENT_BYTES, MAX_LINE_BYTES, SseEvent};
