use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use thiserror::Error;

use super::DecodeError;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid query endpoint '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to build HTTP client: {source}")]
    BuildClient {
        #[source]
        source: reqwest::Error,
    },
    #[error("Query range start {start} is after end {end}.")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("Query span is out of range.")]
    SpanOutOfRange,
    #[error("Historical request failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
    #[error("Historical query returned {status}: {message}")]
    Request { status: StatusCode, message: String },
    #[error("Failed to decode historical response: {source}")]
    Decode {
        #[from]
        source: DecodeError,
    },
}

impl QueryError {
    /// Response status for failed requests.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            QueryError::Request { status, .. } => Some(*status),
            QueryError::InvalidUrl { .. }
            | QueryError::BuildClient { .. }
            | QueryError::InvalidRange { .. }
            | QueryError::SpanOutOfRange
            | QueryError::Transport { .. }
            | QueryError::Decode { .. } => None,
        }
    }
}
