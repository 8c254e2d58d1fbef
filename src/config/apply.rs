use std::num::NonZeroU32;
use std::time::Duration;

use clap::ArgMatches;
use clap::parser::ValueSource;
use url::Url;

use crate::args::{Cli, Command, PositiveUsize};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};
use crate::stream::ReconnectPolicy;

use super::types::{ConfigFile, DurationValue, ReconnectConfig};

/// Applies configuration values to CLI arguments. Flags given on the command
/// line win over config values.
///
/// # Errors
///
/// Returns an error when config values are invalid.
pub fn apply_config(args: &mut Cli, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    if !is_cli(matches, "server_url")
        && let Some(server_url) = config.server_url.as_deref()
    {
        args.server_url = validate_server_url(server_url)?;
    }

    if let Some(path) = config.events_path.clone() {
        args.events_path = path;
    }

    if let Some(path) = config.historical_path.clone() {
        args.historical_path = path;
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = duration_field(timeout, "connect_timeout")?;
    }

    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.request_timeout.as_ref()
    {
        args.request_timeout = duration_field(timeout, "request_timeout")?;
    }

    if !is_cli(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    if let Some(capacity) = config.window_capacity {
        let window = ensure_positive_usize(capacity, "window_capacity")?;
        if let Command::Live(live) = &mut args.command
            && !matches
                .subcommand_matches("live")
                .is_some_and(|live_matches| is_cli(live_matches, "window"))
        {
            live.window = window;
        }
    }

    if let Some(reconnect) = config.reconnect.as_ref() {
        args.reconnect = apply_reconnect(&args.reconnect, reconnect)?;
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn validate_server_url(value: &str) -> AppResult<String> {
    Url::parse(value).map_err(|err| {
        AppError::config(ConfigError::InvalidServerUrl {
            source: ValidationError::InvalidServerUrl {
                url: value.to_owned(),
                source: err,
            },
        })
    })?;
    Ok(value.to_owned())
}

fn duration_field(value: &DurationValue, field: &str) -> AppResult<Duration> {
    value.to_duration().map_err(|err| {
        AppError::config(ConfigError::InvalidDuration {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn apply_reconnect(base: &ReconnectPolicy, config: &ReconnectConfig) -> AppResult<ReconnectPolicy> {
    let mut policy = base.clone();
    if let Some(initial) = config.initial_delay.as_ref() {
        policy.initial_delay = duration_field(initial, "reconnect.initial_delay")?;
    }
    if let Some(max) = config.max_delay.as_ref() {
        policy.max_delay = duration_field(max, "reconnect.max_delay")?;
    }
    if policy.max_delay < policy.initial_delay {
        return Err(AppError::config(ConfigError::ReconnectDelayOrder));
    }
    if let Some(multiplier) = config.multiplier {
        if multiplier == 0 {
            return Err(AppError::config(ConfigError::FieldMustBePositive {
                field: "reconnect.multiplier".to_owned(),
                source: ValidationError::ValueTooSmall { min: 1 },
            }));
        }
        policy.multiplier = multiplier;
    }
    if let Some(max_attempts) = config.max_attempts {
        policy.max_attempts = NonZeroU32::new(max_attempts);
    }
    if let Some(jitter) = config.jitter {
        policy.jitter = jitter;
    }
    Ok(policy)
}
