//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{Cli, Command, HistoryArgs, LiveArgs};
pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_EVENTS_PATH, DEFAULT_HISTORICAL_PATH, DEFAULT_HISTORY_SPAN,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_URL,
};
pub use types::{OutputFormat, PositiveUsize};

pub(crate) use parsers::{parse_duration_arg, parse_timestamp};
