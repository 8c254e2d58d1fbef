mod app;
mod config;
mod decode;
mod query;
mod stream;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use decode::DecodeError;
pub use query::QueryError;
pub use stream::StreamError;
pub use validation::ValidationError;
