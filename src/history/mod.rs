//! Bounded-range queries against the historical telemetry endpoint.

mod client;


pub use client::{HistoryClient, HistoryOptions, RangeReport};
