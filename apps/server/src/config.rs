//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                   | Default        |
//! |----------------------------|----------------|
//! | `TALLY_BIND_ADDR`          | `0.0.0.0`      |
//! | `TALLY_PORT`               | `8080`         |
//! | `TALLY_DB_PATH`            | `./tally.db`   |
//! | `TALLY_DB_MAX_CONNECTIONS` | `5`            |
//! | `JWT_SECRET`               | required       |
//! | `TALLY_TOTAL_POLICY`       | `trust`        |
//! | `TALLY_CORS_ALLOW_ANY`     | `false`        |

use std::env;
use std::path::PathBuf;

use tally_core::TotalPolicy;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Shared secret with the auth gate that mints bearer tokens
    pub jwt_secret: String,

    /// How client-computed sale totals are treated
    pub total_policy: TotalPolicy,

    /// Allow any origin (development with a separately served web client)
    pub cors_allow_any: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ServerConfig {
            bind_addr: lookup("TALLY_BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),

            port: lookup("TALLY_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TALLY_PORT".to_string()))?,

            database_path: lookup("TALLY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./tally.db")),

            db_max_connections: lookup("TALLY_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()))?,

            jwt_secret: lookup("JWT_SECRET")
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingRequired("JWT_SECRET".to_string()))?,

            total_policy: match lookup("TALLY_TOTAL_POLICY") {
                Some(value) => value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("TALLY_TOTAL_POLICY".to_string()))?,
                None => TotalPolicy::default(),
            },

            cors_allow_any: lookup("TALLY_CORS_ALLOW_ANY")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// `addr:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
