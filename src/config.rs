pub use self::parser::{Config, DatabaseConfig, LoggingConfig, MetricsConfig, UrlsConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;
