use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_EVENT_BUFFER: usize = 1024;
const CONFIG_DIR: &str = "config";

/// Application configuration, layered: built-in defaults, then an optional
/// per-environment file under `config/`, then `APP_`-prefixed env vars.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default = "default_true")]
    pub auto_migrate: bool,

    /// Capacity of the in-process event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer_size: usize,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

impl AppConfig {
    /// Constructor used by tests and embedders that already know their values.
    pub fn new(database_url: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            database_url: database_url.into(),
            host: host.into(),
            port,
            environment: "test".to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            auto_migrate: true,
            event_buffer_size: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads configuration from defaults, `config/{environment}.toml` when
/// present, and `APP_*` environment variables.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment =
        std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .set_default("database_url", "sqlite://coupon_engine.db?mode=rwc")?
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", environment.clone())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?;

    let config_file = Path::new(CONFIG_DIR).join(format!("{}.toml", environment));
    if config_file.exists() {
        info!("loading configuration file {}", config_file.display());
        builder = builder.add_source(File::from(config_file));
    }

    builder
        .add_source(Environment::with_prefix("APP"))
        .build()?
        .try_deserialize()
}

/// Installs the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_fills_defaults() {
        let cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 18080);
        assert!(cfg.auto_migrate);
        assert_eq!(cfg.bind_address(), "127.0.0.1:18080");
        assert!(!cfg.is_production());
    }
}
