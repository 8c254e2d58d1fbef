use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Invalid stream endpoint '{url}': {source}")]
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
    #[error("Stream subscription must be opened inside a Tokio runtime.")]
    NoRuntime,
    #[error("Stream connect failed: {source}")]
    Connect {
        #[source]
        source: reqwest::Error,
    },
    #[error("Stream endpoint returned {status}.")]
    UnexpectedStatus { status: StatusCode },
    #[error("Stream body read failed: {source}")]
    Body {
        #[source]
        source: reqwest::Error,
    },
}
