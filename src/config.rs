//! Configuration management for the integrity client

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default service base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the verification service, without trailing slash
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Optional stored login, used by the CLI when flags are absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            credentials: CredentialsConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ClientConfig {
    /// Load from `INTEGRITY_*` environment variables.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("INTEGRITY_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(Error::Config("INTEGRITY_API_URL is empty".to_string()));
        }

        let timeout_secs = match env::var("INTEGRITY_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| {
                Error::Config(format!("INTEGRITY_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(ClientConfig {
            api: ApiConfig {
                base_url,
                timeout_secs,
            },
            credentials: CredentialsConfig {
                username: env::var("INTEGRITY_USERNAME").ok(),
                password: env::var("INTEGRITY_PASSWORD").ok(),
            },
        })
    }
}
