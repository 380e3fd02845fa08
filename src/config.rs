//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (optional): PostgreSQL connection string. Without it the
///   service keeps its records in memory.
/// - `SEED_FILE` (optional): JSON file loaded into the in-memory store
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DB_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `STORE_TIMEOUT_MS` (optional): deadline of one store call, defaults to 2000
/// - `STORE_RETRY_ATTEMPTS` (optional): attempts per store call, defaults to 3
/// - `STORE_RETRY_BACKOFF_MS` (optional): base retry pause, defaults to 50
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default)]
    pub seed_file: Option<String>,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    #[serde(default = "default_store_retry_attempts")]
    pub store_retry_attempts: u32,

    #[serde(default = "default_store_retry_backoff_ms")]
    pub store_retry_backoff_ms: u64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_store_timeout_ms() -> u64 {
    2_000
}

fn default_store_retry_attempts() -> u32 {
    3
}

fn default_store_retry_backoff_ms() -> u64 {
    50
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first when present.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed into its
    /// expected type.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_has_a_default() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();

        assert!(config.database_url.is_none());
        assert!(config.seed_file.is_none());
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.store_timeout_ms, 2_000);
        assert_eq!(config.store_retry_attempts, 3);
        assert_eq!(config.store_retry_backoff_ms, 50);
    }

    #[test]
    fn reads_upper_case_variables() {
        let config: Config = envy::from_iter(vec![
            ("DATABASE_URL".to_string(), "postgres://localhost/bank".to_string()),
            ("SERVER_PORT".to_string(), "8080".to_string()),
            ("STORE_RETRY_ATTEMPTS".to_string(), "5".to_string()),
        ])
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/bank"));
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.store_retry_attempts, 5);
    }
}
