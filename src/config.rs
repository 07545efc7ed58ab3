use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use validator::Validate;

use crate::db::DbConfig;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";

/// Application configuration, layered from files and environment.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL.
    #[validate(length(min = 1, message = "database_url must not be empty"))]
    pub database_url: String,

    /// Default tracing filter level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deployment environment name.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log in JSON format (structured collectors).
    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Event channel capacity.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_event_buffer() -> usize {
    256
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Pool settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.database_url.clone(),
            max_connections: self.db_max_connections,
            min_connections: self.db_min_connections,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Loads application configuration.
///
/// Sources are layered in this order, later overriding earlier:
/// 1. built-in defaults
/// 2. `config/default.toml`
/// 3. `config/{env}.toml` selected by RUN_ENV or APP_ENV
/// 4. environment variables prefixed `APP_`
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("loading configuration for environment: {}", run_env);

    let mut builder = Config::builder()
        .set_default("database_url", "sqlite://automanage.db?mode=rwc")?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("environment", run_env.clone())?;

    if Path::new(CONFIG_DIR).exists() {
        builder = builder
            .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
            .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_env}")).required(false));
    }

    let settings = builder
        .add_source(Environment::with_prefix("APP"))
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Initializes tracing using the provided log level as the default filter.
/// An explicit RUST_LOG always wins.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("automanage_api={level}");
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}
