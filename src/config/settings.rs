//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Public server address, used to build pagination links
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Page size limits
    pub pagination: PaginationSettings,

    /// Upload folders
    pub storage: StorageSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Public server address.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// "http" or "https"
    pub protocol: String,

    /// Host name clients reach the server on
    pub host: String,

    /// Port number
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

/// Page size configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationSettings {
    /// Page size when `take` is absent
    pub default_take: u32,

    /// Upper bound applied to `take`
    pub max_take: u32,
}

/// Upload folders.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Where uploads land before a post references them
    pub temp_dir: String,

    /// Root of the publicly served files
    pub public_dir: String,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the pagination limits are inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.protocol", "http")?
            .set_default("server.host", "localhost")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("pagination.default_take", 20)?
            .set_default("pagination.max_take", 100)?
            .set_default("storage.temp_dir", "public/temp")?
            .set_default("storage.public_dir", "public")?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__PAGINATION__MAX_TAKE=50 -> pagination.max_take = 50
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.protocol", std::env::var("SERVER_PROTOCOL").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.pagination.validate()?;
                settings.server.base_url()?;
                Ok(settings)
            })
    }
}

impl ServerSettings {
    /// `{protocol}://{host}:{port}/`, the root every `next` link hangs off.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&format!("{}://{}:{}/", self.protocol, self.host, self.port)).map_err(|e| {
            ConfigError::Message(format!(
                "Invalid server address {}://{}:{}: {}",
                self.protocol, self.host, self.port, e
            ))
        })
    }
}

impl PaginationSettings {
    /// `default_take` must be at least 1 and at most `max_take`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_take == 0 || self.default_take > self.max_take {
            return Err(ConfigError::Message(format!(
                "pagination.default_take must be between 1 and max_take ({}). Current value: {}",
                self.max_take, self.default_take
            )));
        }
        Ok(())
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_take: 20,
            max_take: 100,
        }
    }
}

impl DatabaseSettings {
    /// Get the connection URL.
    pub fn connection_url(&self) -> &str {
        &self.url
    }
}
