//! Configuration module for the org roster backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite file backing the entity store
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("ORG_DB_PATH")
            .unwrap_or_else(|_| "./data/org.sqlite".to_string())
            .into();

        let raw_addr = env::var("ORG_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = raw_addr.parse().map_err(|_| {
            AppError::BadRequest(format!("Invalid ORG_BIND_ADDR format: {}", raw_addr))
        })?;

        let log_level = env::var("ORG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("ORG_LOG_JSON")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases mutate process env, so they run in one test.
    #[test]
    fn test_config_from_env() {
        env::remove_var("ORG_DB_PATH");
        env::remove_var("ORG_BIND_ADDR");
        env::remove_var("ORG_LOG_LEVEL");
        env::remove_var("ORG_LOG_JSON");

        let config = Config::from_env().unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/org.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);

        env::set_var("ORG_BIND_ADDR", "not-an-address");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("ORG_BIND_ADDR"));

        env::set_var("ORG_BIND_ADDR", "0.0.0.0:9000");
        env::set_var("ORG_LOG_JSON", "true");
        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert!(config.log_json);

        env::remove_var("ORG_BIND_ADDR");
        env::remove_var("ORG_LOG_JSON");
    }
}
