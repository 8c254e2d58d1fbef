use std::time::Duration;

use serde::Deserialize;

use crate::args::parse_duration_arg;
use crate::error::ValidationError;

/// Contents of `h2scope.toml` / `h2scope.json`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(alias = "server")]
    pub server_url: Option<String>,
    pub events_path: Option<String>,
    pub historical_path: Option<String>,
    #[serde(alias = "window")]
    pub window_capacity: Option<usize>,
    pub connect_timeout: Option<DurationValue>,
    pub request_timeout: Option<DurationValue>,
    pub verbose: Option<bool>,
    pub no_color: Option<bool>,
    pub reconnect: Option<ReconnectConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReconnectConfig {
    pub initial_delay: Option<DurationValue>,
    pub max_delay: Option<DurationValue>,
    pub multiplier: Option<u32>,
    /// Zero or absent retries forever.
    pub max_attempts: Option<u32>,
    pub jitter: Option<bool>,
}

/// Integer seconds or a `ms/s/m/h` string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration_arg(text),
        }
    }
}
