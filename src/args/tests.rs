use super::cli::join_server_url;
use super::parsers::parse_bool_env;
use super::*;
use crate::catalog::MetricKind;
use crate::error::{AppError, AppResult, ValidationError};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::time::Duration;

fn parse(args: &[&str]) -> AppResult<Cli> {
    Cli::try_parse_from(args.iter().copied()).map_err(AppError::from)
}

fn at(text: &str) -> AppResult<DateTime<Utc>> {
    Ok(parse_timestamp(text)?)
}

#[test]
fn parse_live_defaults() -> AppResult<()> {
    let cli = parse(&["h2scope", "live"])?;
    if cli.server_url != DEFAULT_SERVER_URL {
        return Err(AppError::validation("Unexpected default server"));
    }
    match cli.command {
        Command::Live(live) => {
            if live.window.get() != 60 {
                return Err(AppError::validation("Unexpected default window"));
            }
            if live.interval != Duration::from_secs(5) || live.duration.is_some() {
                return Err(AppError::validation("Unexpected live timing defaults"));
            }
            if !live.kinds.is_empty() || live.format != OutputFormat::Text {
                return Err(AppError::validation("Unexpected live defaults"));
            }
            Ok(())
        }
        Command::History(_) => Err(AppError::validation("Expected live subcommand")),
    }
}

#[test]
fn parse_live_kinds_accept_cli_and_wire_names() -> AppResult<()> {
    let cli = parse(&[
        "h2scope",
        "live",
        "--kind",
        "temperature",
        "-k",
        "HydrogenProductionRate",
        "--window",
        "10",
        "--format",
        "json",
    ])?;
    match cli.command {
        Command::Live(live) => {
            if live.kinds != vec![MetricKind::Temperature, MetricKind::HydrogenProductionRate] {
                return Err(AppError::validation(format!("Unexpected kinds: {:?}", live.kinds)));
            }
            if live.window.get() != 10 || live.format != OutputFormat::Json {
                return Err(AppError::validation("Unexpected live options"));
            }
            Ok(())
        }
        Command::History(_) => Err(AppError::validation("Expected live subcommand")),
    }
}

#[test]
fn parse_live_rejects_zero_window() -> AppResult<()> {
    if parse(&["h2scope", "live", "--window", "0"]).is_ok() {
        return Err(AppError::validation("Expected zero window to be rejected"));
    }
    Ok(())
}

#[test]
fn parse_history_with_global_flags_after_subcommand() -> AppResult<()> {
    let cli = parse(&[
        "h2scope",
        "history",
        "--kind",
        "efficiency",
        "--start",
        "2025-01-02T03:00:00+01:00",
        "--server",
        "http://plant:9000",
        "-v",
    ])?;
    if cli.server_url != "http://plant:9000" || !cli.verbose {
        return Err(AppError::validation("Global flags not applied"));
    }
    match cli.command {
        Command::History(history) => {
            if history.kind != MetricKind::Efficiency {
                return Err(AppError::validation("Unexpected history kind"));
            }
            if history.start != Some(at("2025-01-02T02:00:00Z")?) {
                return Err(AppError::validation("Start not normalized to UTC"));
            }
            Ok(())
        }
        Command::Live(_) => Err(AppError::validation("Expected history subcommand")),
    }
}

#[test]
fn parse_history_requires_kind() -> AppResult<()> {
    if parse(&["h2scope", "history"]).is_ok() {
        return Err(AppError::validation("Expected missing --kind to fail"));
    }
    Ok(())
}

fn history_args(cli: Cli) -> AppResult<HistoryArgs> {
    match cli.command {
        Command::History(history) => Ok(history),
        Command::Live(_) => Err(AppError::validation("Expected history subcommand")),
    }
}

#[test]
fn resolve_range_defaults_to_last_hour() -> AppResult<()> {
    let history = history_args(parse(&["h2scope", "history", "-k", "temperature"])?)?;
    let now = at("2025-01-02T12:00:00Z")?;
    let (start, end) = history.resolve_range(now)?;
    if start != at("2025-01-02T11:00:00Z")? || end != now {
        return Err(AppError::validation(format!("Unexpected range {} .. {}", start, end)));
    }
    Ok(())
}

#[test]
fn resolve_range_uses_last_span() -> AppResult<()> {
    let history = history_args(parse(&[
        "h2scope",
        "history",
        "-k",
        "temperature",
        "--last",
        "15m",
    ])?)?;
    let now = at("2025-01-02T12:00:00Z")?;
    let (start, _) = history.resolve_range(now)?;
    if start != at("2025-01-02T11:45:00Z")? {
        return Err(AppError::validation(format!("Unexpected start {}", start)));
    }
    Ok(())
}

#[test]
fn resolve_range_rejects_last_with_bounds() -> AppResult<()> {
    let history = history_args(parse(&[
        "h2scope",
        "history",
        "-k",
        "temperature",
        "--last",
        "15m",
        "--end",
        "2025-01-02T12:00:00Z",
    ])?)?;
    match history.resolve_range(Utc::now()) {
        Err(AppError::Validation(ValidationError::LastWithExplicitRange)) => Ok(()),
        other => Err(AppError::validation(format!("Unexpected result: {:?}", other))),
    }
}

#[test]
fn parse_duration_arg_units() -> AppResult<()> {
    let cases = [
        ("250ms", Duration::from_millis(250)),
        ("7", Duration::from_secs(7)),
        ("3s", Duration::from_secs(3)),
        ("2m", Duration::from_secs(120)),
        ("1h", Duration::from_secs(3600)),
    ];
    for (input, expected) in cases {
        if parse_duration_arg(input)? != expected {
            return Err(AppError::validation(format!("Unexpected duration for {}", input)));
        }
    }
    Ok(())
}

#[test]
fn parse_duration_arg_rejects_bad_input() -> AppResult<()> {
    match parse_duration_arg("0s") {
        Err(ValidationError::DurationZero) => {}
        other => return Err(AppError::validation(format!("Unexpected result: {:?}", other))),
    }
    match parse_duration_arg("5d") {
        Err(ValidationError::InvalidDurationUnit { unit }) if unit == "d" => {}
        other => return Err(AppError::validation(format!("Unexpected result: {:?}", other))),
    }
    match parse_duration_arg("soon") {
        Err(ValidationError::InvalidDurationFormat { .. }) => Ok(()),
        other => Err(AppError::validation(format!("Unexpected result: {:?}", other))),
    }
}

#[test]
fn parse_timestamp_rejects_non_rfc3339() -> AppResult<()> {
    match parse_timestamp("2025-01-02 03:00") {
        Err(ValidationError::InvalidTimestamp { .. }) => Ok(()),
        other => Err(AppError::validation(format!("Unexpected result: {:?}", other))),
    }
}

#[test]
fn parse_bool_env_values() -> AppResult<()> {
    if !parse_bool_env("Yes")? || parse_bool_env("off")? {
        return Err(AppError::validation("Unexpected boolean parse"));
    }
    if parse_bool_env("maybe").is_ok() {
        return Err(AppError::validation("Expected invalid boolean"));
    }
    Ok(())
}

#[test]
fn positive_usize_rejects_zero() -> AppResult<()> {
    match "0".parse::<PositiveUsize>() {
        Err(ValidationError::ValueTooSmall { min: 1 }) => Ok(()),
        other => Err(AppError::validation(format!("Unexpected result: {:?}", other))),
    }
}

#[test]
fn events_url_joins_server_and_path() -> AppResult<()> {
    let cli = parse(&["h2scope", "live", "--server", "http://plant.local:9000"])?;
    let url = cli.events_url()?;
    if url.as_str() != "http://plant.local:9000/events" {
        return Err(AppError::validation(format!("Unexpected events url: {}", url)));
    }
    match join_server_url("plant.local", "/events") {
        Err(AppError::Validation(ValidationError::InvalidServerUrl { .. })) => Ok(()),
        other => Err(AppError::validation(format!("Unexpected result: {:?}", other))),
    }
}

#[test]
fn stream_and_history_options_follow_flags() -> AppResult<()> {
    let cli = parse(&[
        "h2scope",
        "history",
        "-k",
        "temperature",
        "--connect-timeout",
        "750ms",
        "--request-timeout",
        "30s",
    ])?;
    let stream = cli.stream_options();
    let history = cli.history_options();
    if stream.connect_timeout != Duration::from_millis(750)
        || history.request_timeout != Duration::from_secs(30)
        || history.historical_path != DEFAULT_HISTORICAL_PATH
    {
        return Err(AppError::validation("Options do not follow flags"));
    }
    Ok(())
}
