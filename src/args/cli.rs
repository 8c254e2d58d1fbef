use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::time::Duration;
use url::Url;

use crate::catalog::MetricKind;
use crate::error::{AppError, AppResult, ValidationError};
use crate::history::HistoryOptions;
use crate::stream::{ReconnectPolicy, StreamOptions};

use super::defaults::{
    DEFAULT_EVENTS_PATH, DEFAULT_HISTORICAL_PATH, DEFAULT_HISTORY_SPAN, DEFAULT_SERVER_URL,
};
use super::parsers::{parse_bool_env, parse_duration_arg, parse_positive_usize, parse_timestamp};
use super::types::{OutputFormat, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Live and historical telemetry viewer for a hydrogen electrolysis plant backend."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file (TOML/JSON). Defaults to ./h2scope.toml or ./h2scope.json if present.
    #[arg(long, global = true, help_heading = "Common Options")]
    pub config: Option<String>,

    /// Base URL of the telemetry backend
    #[arg(
        long = "server",
        short = 's',
        global = true,
        default_value = DEFAULT_SERVER_URL,
        help_heading = "Common Options"
    )]
    pub server_url: String,

    /// Connection timeout (supports ms/s/m/h)
    #[arg(long = "connect-timeout", global = true, default_value = "5s", value_parser = parse_duration_arg)]
    pub connect_timeout: Duration,

    /// Historical request timeout (supports ms/s/m/h)
    #[arg(long = "request-timeout", global = true, default_value = "10s", value_parser = parse_duration_arg)]
    pub request_timeout: Duration,

    /// Enable verbose logging (sets log level to debug unless overridden by H2SCOPE_LOG/RUST_LOG)
    #[arg(long, short = 'v', global = true, help_heading = "Common Options")]
    pub verbose: bool,

    /// Disable color output
    #[arg(long = "no-color", global = true, env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,

    #[arg(skip = DEFAULT_EVENTS_PATH.to_owned())]
    pub events_path: String,

    #[arg(skip = DEFAULT_HISTORICAL_PATH.to_owned())]
    pub historical_path: String,

    #[arg(skip)]
    pub reconnect: ReconnectPolicy,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Follow the live stream and print per-metric window summaries
    Live(LiveArgs),
    /// Fetch a historical range for one metric and summarize it
    History(HistoryArgs),
}

#[derive(Debug, Args, Clone)]
pub struct LiveArgs {
    /// Samples kept per metric
    #[arg(long = "window", default_value = "60", value_parser = parse_positive_usize)]
    pub window: PositiveUsize,

    /// How often to print summaries (supports ms/s/m/h)
    #[arg(long, default_value = "5s", value_parser = parse_duration_arg)]
    pub interval: Duration,

    /// Stop after this long (supports ms/s/m/h); runs until interrupted otherwise
    #[arg(long, value_parser = parse_duration_arg)]
    pub duration: Option<Duration>,

    /// Metric to show (repeatable); all metrics when omitted
    #[arg(long = "kind", short = 'k', value_enum, ignore_case = true)]
    pub kinds: Vec<MetricKind>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args, Clone)]
pub struct HistoryArgs {
    /// Metric to query
    #[arg(long = "kind", short = 'k', value_enum, ignore_case = true)]
    pub kind: MetricKind,

    /// Range start (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    pub start: Option<DateTime<Utc>>,

    /// Range end (RFC 3339); defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    pub end: Option<DateTime<Utc>>,

    /// Query the trailing span up to now instead of --start/--end (supports ms/s/m/h)
    #[arg(long, value_parser = parse_duration_arg)]
    pub last: Option<Duration>,

    /// Also print every sample, not only the summary
    #[arg(long)]
    pub raw: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Cli {
    /// Absolute URL of the stream endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error when the server URL or events path is invalid.
    pub fn events_url(&self) -> AppResult<Url> {
        join_server_url(&self.server_url, &self.events_path)
    }

    #[must_use]
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            connect_timeout: self.connect_timeout,
            reconnect: self.reconnect.clone(),
        }
    }

    #[must_use]
    pub fn history_options(&self) -> HistoryOptions {
        HistoryOptions {
            historical_path: self.historical_path.clone(),
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

impl HistoryArgs {
    /// Resolves the query bounds against `now`.
    ///
    /// `--last` spans back from now. Otherwise a missing end is `now` and a
    /// missing start is one hour before the end.
    ///
    /// # Errors
    ///
    /// Returns an error when `--last` is combined with explicit bounds or a
    /// span cannot be subtracted from the end.
    pub fn resolve_range(&self, now: DateTime<Utc>) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
        if let Some(last) = self.last {
            if self.start.is_some() || self.end.is_some() {
                return Err(AppError::validation(ValidationError::LastWithExplicitRange));
            }
            return Ok((span_back(now, last)?, now));
        }
        let end = self.end.unwrap_or(now);
        let start = match self.start {
            Some(start) => start,
            None => span_back(end, DEFAULT_HISTORY_SPAN)?,
        };
        Ok((start, end))
    }
}

fn span_back(end: DateTime<Utc>, span: Duration) -> AppResult<DateTime<Utc>> {
    chrono::Duration::from_std(span)
        .ok()
        .and_then(|delta| end.checked_sub_signed(delta))
        .ok_or_else(|| AppError::validation(ValidationError::DurationOverflow))
}

pub(crate) fn join_server_url(server_url: &str, path: &str) -> AppResult<Url> {
    Url::parse(server_url)
        .and_then(|base| base.join(path))
        .map_err(|err| {
            AppError::validation(ValidationError::InvalidServerUrl {
                url: server_url.to_owned(),
                source: err,
            })
        })
}
