use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::args::{Cli, PositiveUsize, parse_duration_arg, parse_timestamp};
use crate::catalog::MetricKind;
use crate::config::apply_config;
use crate::config::types::ConfigFile;
use crate::error::{AppError, AppResult};
use crate::model::{Frame, Sample, decode_samples};
use crate::stream::{EventParser, SseEvent};

thread_local! {
    static BASE_MATCHES: ArgMatches = Cli::command().get_matches_from(["h2scope", "live"]);
}

/// Parses a duration argument (e.g. `10s`, `500ms`).
///
/// # Errors
///
/// Returns an error when the duration is invalid.
pub fn parse_duration_arg_input(input: &str) -> AppResult<Duration> {
    parse_duration_arg(input).map_err(AppError::from)
}

/// Parses an RFC 3339 timestamp.
///
/// # Errors
///
/// Returns an error when the timestamp is invalid.
pub fn parse_timestamp_input(input: &str) -> AppResult<DateTime<Utc>> {
    parse_timestamp(input).map_err(AppError::from)
}

/// Parses a metric kind from a CLI or wire name.
///
/// # Errors
///
/// Returns an error when the name is unknown.
pub fn parse_metric_kind_input(input: &str) -> AppResult<MetricKind> {
    input.parse::<MetricKind>().map_err(AppError::from)
}

/// Parses a positive usize string value.
///
/// # Errors
///
/// Returns an error when the value is invalid or zero.
pub fn parse_positive_usize_input(input: &str) -> AppResult<usize> {
    let value: PositiveUsize = input.parse()?;
    Ok(value.get())
}

/// Feeds `data` to a fresh SSE parser in chunks of `chunk_len` bytes.
#[must_use]
pub fn parse_sse_input(data: &[u8], chunk_len: usize) -> Vec<SseEvent> {
    let mut parser = EventParser::new();
    let mut events = Vec::new();
    for chunk in data.chunks(chunk_len.max(1)) {
        events.extend(parser.feed(chunk).into_iter().filter_map(Result::ok));
    }
    events
}

/// Decodes one stream frame.
///
/// # Errors
///
/// Returns an error when the frame is malformed.
pub fn decode_frame_input(input: &str) -> AppResult<Frame> {
    Frame::decode(input).map_err(AppError::from)
}

/// Decodes a historical response body.
///
/// # Errors
///
/// Returns an error when the body is not an array of valid samples.
pub fn decode_history_input(input: &[u8]) -> AppResult<Vec<Sample>> {
    decode_samples(input).map_err(AppError::from)
}

/// Parses TOML config and applies it to defaults.
///
/// # Errors
///
/// Returns an error when parsing or validation fails.
pub fn apply_config_from_toml(input: &str) -> AppResult<()> {
    let config: ConfigFile = toml::from_str(input).map_err(|err| {
        AppError::config(crate::error::ConfigError::ParseToml {
            path: "<fuzz>".into(),
            source: err,
        })
    })?;
    apply_config_to_defaults(&config)
}

/// Parses JSON config and applies it to defaults.
///
/// # Errors
///
/// Returns an error when parsing or validation fails.
pub fn apply_config_from_json(input: &[u8]) -> AppResult<()> {
    let config: ConfigFile = serde_json::from_slice(input)?;
    apply_config_to_defaults(&config)
}

/// Loads a config file from disk to exercise extension handling.
///
/// # Errors
///
/// Returns an error when the config file cannot be read or parsed.
pub fn load_config_file_input(path: &std::path::Path) -> AppResult<()> {
    crate::config::load_config_file(path).map(|_config| ())
}

fn apply_config_to_defaults(config: &ConfigFile) -> AppResult<()> {
    BASE_MATCHES.with(|matches| {
        let mut args = Cli::from_arg_matches(matches)?;
        apply_config(&mut args, matches, config)
    })
}
