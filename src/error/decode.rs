use thiserror::Error;

/// Raised when a stream frame or a historical response body does not match
/// the telemetry wire shape.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed JSON: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },
    #[error("Unknown metric kind '{value}'.")]
    UnknownMetricKind { value: String },
    #[error("Invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("Sample value must be finite, got {value}.")]
    NonFiniteValue { value: f64 },
    #[error("Sample {index} rejected: {source}")]
    InvalidSample {
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },
    #[error("Event line is not valid UTF-8: {source}")]
    InvalidUtf8 {
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("Event exceeds {limit} bytes.")]
    EventTooLarge { limit: usize },
}

impl From<serde_json::Error> for DecodeError {
    fn from(source: serde_json::Error) -> Self {
        DecodeError::Json { source }
    }
}
