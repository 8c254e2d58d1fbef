use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_EVENTS_PATH: &str = "/events";
pub const DEFAULT_HISTORICAL_PATH: &str = "/historical";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Range queried by `history` when no bounds are given.
pub const DEFAULT_HISTORY_SPAN: Duration = Duration::from_secs(60 * 60);
