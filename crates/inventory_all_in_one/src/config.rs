use common::postgres::PostgresConfig;
use config::{Config, ConfigError, Environment};
use inventory_api::domain::ImportConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Name reported in every log line
    #[serde(default = "default_service_name")]
    pub service_name: String,

    // HTTP configuration
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Comma-separated path prefixes excluded from request logging
    #[serde(default = "default_http_ignored_paths")]
    pub http_ignored_paths: String,

    /// Comma-separated list of allowed origins, or "*" for any
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,

    /// Where devices are kept: "postgres" or "memory"
    #[serde(default = "default_storage_backend")]
    pub storage_backend: String,

    // PostgreSQL configuration
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    #[serde(default = "default_postgres_migrations_dir")]
    pub postgres_migrations_dir: String,

    #[serde(default = "default_postgres_goose_binary_path")]
    pub postgres_goose_binary_path: String,

    // Spreadsheet import
    /// Treat the first worksheet row as column titles
    #[serde(default)]
    pub import_skip_header_row: bool,

    /// Device type given to imported rows
    #[serde(default)]
    pub import_default_device_type: Option<String>,

    /// Number of events shown on a device page
    #[serde(default = "default_recent_events_limit")]
    pub recent_events_limit: i64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "inventory-all-in-one".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    3000
}

fn default_http_ignored_paths() -> String {
    "/health".to_string()
}

fn default_cors_allowed_origins() -> String {
    "*".to_string()
}

fn default_storage_backend() -> String {
    "postgres".to_string()
}

fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "inventory".to_string()
}

fn default_postgres_username() -> String {
    "inventory".to_string()
}

fn default_postgres_password() -> String {
    "inventory".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    5
}

fn default_postgres_migrations_dir() -> String {
    "/home/inventory/migrations/postgres".to_string()
}

fn default_postgres_goose_binary_path() -> String {
    "goose".to_string()
}

fn default_recent_events_limit() -> i64 {
    10
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("INVENTORY"))
            .build()?
            .try_deserialize()
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_database.clone(),
            username: self.postgres_username.clone(),
            password: self.postgres_password.clone(),
            max_pool_size: self.postgres_max_pool_size,
            migrations_dir: self.postgres_migrations_dir.clone(),
            goose_binary_path: self.postgres_goose_binary_path.clone(),
        }
    }

    pub fn import_config(&self) -> ImportConfig {
        ImportConfig {
            skip_header_row: self.import_skip_header_row,
            default_device_type: self
                .import_default_device_type
                .clone()
                .filter(|device_type| !device_type.trim().is_empty()),
        }
    }

    pub fn ignored_paths(&self) -> Vec<String> {
        self.http_ignored_paths
            .split(',')
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .collect()
    }
}
