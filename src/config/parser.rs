use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub urls: UrlsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_database_filename")]
    pub filename: Option<String>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            filename: default_database_filename(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> String {
        if let Some(ref url) = self.url {
            url.clone()
        } else if let Some(ref file) = self.filename {
            format!("sqlite://{}", file)
        } else {
            String::new()
        }
    }

    pub fn sqlite_path(&self) -> Option<String> {
        let url = self.connection_string();
        url.strip_prefix("sqlite://")
            .filter(|path| !path.is_empty())
            .map(ToOwned::to_owned)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(alias = "console", default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UrlsConfig {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Report the total including the sighting that triggered the notice.
    #[serde(default)]
    pub count_includes_current: bool,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for UrlsConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            command_prefix: default_command_prefix(),
            history_limit: default_history_limit(),
            count_includes_current: false,
            event_buffer: default_event_buffer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_bind_address")]
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            bind_address: default_metrics_bind_address(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let connection_string = self.database.connection_string();
        if connection_string.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "database connection string cannot be empty".to_string(),
            ));
        }

        if self.database.sqlite_path().is_none() {
            return Err(ConfigError::InvalidConfig(format!(
                "database.url must be a sqlite:// url, got {}",
                connection_string
            )));
        }

        if self.urls.command.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "urls.command cannot be empty".to_string(),
            ));
        }

        if self.urls.history_limit == 0 {
            return Err(ConfigError::InvalidConfig(
                "urls.history_limit must be at least 1".to_string(),
            ));
        }

        if self.urls.event_buffer == 0 {
            return Err(ConfigError::InvalidConfig(
                "urls.event_buffer must be at least 1".to_string(),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "metrics.port must be between 1 and 65535".to_string(),
            ));
        }

        Ok(())
    }

    /// Built-in defaults with environment overrides applied, for running
    /// without a config file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("URL_HISTORY_DATABASE_URL") {
            self.database.url = Some(value);
        }
        if let Some(value) = lookup("URL_HISTORY_LOG_LEVEL") {
            self.logging.level = value;
        }
    }
}

fn default_database_filename() -> Option<String> {
    Some("./history.db".to_string())
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_command() -> String {
    "urls".to_string()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_history_limit() -> u32 {
    5
}

fn default_event_buffer() -> usize {
    64
}

fn default_metrics_port() -> u16 {
    9001
}

fn default_metrics_bind_address() -> String {
    "127.0.0.1".to_string()
}
