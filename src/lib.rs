//! Core library for the `h2scope` CLI.
//!
//! This crate ingests live telemetry from a hydrogen electrolysis plant
//! backend over server-sent events, keeps a bounded recent-history window per
//! metric, queries historical ranges, and computes summary statistics. The
//! primary user-facing interface is the `h2scope` command-line application.
pub mod args;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod shutdown;
pub mod stats;
pub mod store;
pub mod stream;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;
