//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Directory where uploaded book files and cover images are stored,
    /// served back under `/uploads`.
    pub upload_dir: PathBuf,
    /// Origin allowed by CORS. `None` allows any origin (development).
    pub client_url: Option<String>,
    /// Upper bound on request bodies, which bounds book uploads.
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Upload Settings ---
        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let max_upload_bytes = match std::env::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => raw.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("MAX_UPLOAD_BYTES".to_string(), e.to_string())
            })?,
            Err(_) => 10 * 1024 * 1024,
        };

        let client_url = std::env::var("CLIENT_URL").ok();

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            upload_dir,
            client_url,
            max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-wide, so the whole flow lives in a
    // single test to avoid interference between parallel test threads.
    #[test]
    fn from_env_applies_defaults_and_requires_database_url() {
        std::env::remove_var("DATABASE_URL");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "DATABASE_URL"));

        std::env::set_var("DATABASE_URL", "postgres://localhost/bookbarter");
        std::env::remove_var("BIND_ADDRESS");
        std::env::remove_var("RUST_LOG");
        std::env::remove_var("UPLOAD_DIR");
        std::env::remove_var("MAX_UPLOAD_BYTES");
        std::env::remove_var("CLIENT_URL");

        let config = Config::from_env().expect("config should load with defaults");
        assert_eq!(config.bind_address.port(), 3001);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.client_url.is_none());

        std::env::set_var("MAX_UPLOAD_BYTES", "not-a-number");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v, _) if v == "MAX_UPLOAD_BYTES"));
        std::env::remove_var("MAX_UPLOAD_BYTES");
        std::env::remove_var("DATABASE_URL");
    }
}
