//! Configuration for the booking flow.
//!
//! Loaded from environment variables with sensible defaults; `.env` files
//! are honored for local development.

use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote cinema API settings.
    pub api: ApiConfig,
    /// Log level filter (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Remote cinema API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the cinema API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout: u64,
}

impl Config {
    /// Load configuration, reading a `.env` file first if present.
    #[must_use]
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Build configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig {
                base_url: env::var("CINEMA_API_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/api".to_string()),
                request_timeout: env::var("CINEMA_API_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
