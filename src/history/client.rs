use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::catalog::MetricKind;
use crate::error::QueryError;
use crate::model::{Sample, decode_samples};
use crate::stats::{Statistics, summarize};

const DEFAULT_HISTORICAL_PATH: &str = "/historical";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest error body text carried into [`QueryError::Request`].
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct HistoryOptions {
    pub historical_path: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            historical_path: DEFAULT_HISTORICAL_PATH.to_owned(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Samples of one metric over a closed time range, with their statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeReport {
    pub kind: MetricKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub samples: Vec<Sample>,
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for `GET /historical?type=&start=&end=`.
///
/// Each call is a single request: no retry, no caching, and a response with
/// any invalid element fails as a whole.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl HistoryClient {
    /// # Errors
    ///
    /// Returns an error when the base URL or historical path is invalid, or
    /// the HTTP client cannot be built.
    pub fn new(base_url: &str, options: &HistoryOptions) -> Result<Self, QueryError> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(&options.historical_path))
            .map_err(|source| QueryError::InvalidUrl {
                url: base_url.to_owned(),
                source,
            })?;
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|source| QueryError::BuildClient { source })?;
        Ok(Self { client, endpoint })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Builds the request URL for an inclusive `[start, end]` range.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidRange`] when `start` is after `end`.
    pub fn request_url(
        &self,
        kind: MetricKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Url, QueryError> {
        if start > end {
            return Err(QueryError::InvalidRange { start, end });
        }
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("type", kind.wire_id())
            .append_pair("start", &format_timestamp(start))
            .append_pair("end", &format_timestamp(end));
        Ok(url)
    }

    /// Fetches every sample of `kind` in `[start, end]`, in service order.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Request`] for non-2xx responses,
    /// [`QueryError::Decode`] for bodies that are not an array of valid
    /// samples and [`QueryError::Transport`] when the request itself fails.
    pub async fn fetch_range(
        &self,
        kind: MetricKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, QueryError> {
        let url = self.request_url(kind, start, end)?;
        debug!("Historical query {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| QueryError::Transport { source })?;
        let status = response.status();
        if !status.is_success() {
            // An unreadable error body still reports the status.
            let body = response.bytes().await.unwrap_or_default();
            return Err(QueryError::Request {
                status,
                message: error_message(status, &body),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| QueryError::Transport { source })?;
        let samples = decode_samples(&body)?;
        debug!("Historical query returned {} {} samples", samples.len(), kind);
        Ok(samples)
    }

    /// Fetches the trailing `span` up to now.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::SpanOutOfRange`] when `span` cannot be
    /// subtracted from the current time, otherwise as [`Self::fetch_range`].
    pub async fn fetch_last(
        &self,
        kind: MetricKind,
        span: Duration,
    ) -> Result<Vec<Sample>, QueryError> {
        let (start, end) = trailing_range(Utc::now(), span)?;
        self.fetch_range(kind, start, end).await
    }

    /// Fetches `[start, end]` and summarizes it.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::fetch_range`].
    pub async fn summarize_range(
        &self,
        kind: MetricKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RangeReport, QueryError> {
        let samples = self.fetch_range(kind, start, end).await?;
        let statistics = summarize(&samples);
        Ok(RangeReport {
            kind,
            start,
            end,
            samples,
            statistics,
        })
    }
}

/// `[end - span, end]`.
pub(crate) fn trailing_range(
    end: DateTime<Utc>,
    span: Duration,
) -> Result<(DateTime<Utc>, DateTime<Utc>), QueryError> {
    let span = chrono::Duration::from_std(span).map_err(|_err| QueryError::SpanOutOfRange)?;
    let start = end
        .checked_sub_signed(span)
        .ok_or(QueryError::SpanOutOfRange)?;
    Ok((start, end))
}

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Text for a failed response: the `error` field of a JSON body, the raw
/// body, or the status reason, in that order.
pub(crate) fn error_message(status: StatusCode, body: &[u8]) -> String {
    let reason = || {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_owned()
    };
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        let message = parsed.error.trim();
        return if message.is_empty() {
            reason()
        } else {
            truncate(message)
        };
    }
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        reason()
    } else {
        truncate(trimmed)
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}
