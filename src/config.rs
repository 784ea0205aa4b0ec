//! Runtime configuration read from the environment.
//!
//! Command-line flags take precedence; `main` layers them over what is
//! loaded here.

use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LOG_FILTER: &str = "leasehold=debug,tower_http=debug";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Database file (from LEASEHOLD_DATABASE). `None` means the platform
    /// data directory.
    pub database: Option<PathBuf>,
    /// Bind address (from LEASEHOLD_HOST)
    pub host: String,
    /// Bind port (from LEASEHOLD_PORT)
    pub port: u16,
    /// Allowed CORS origins (from LEASEHOLD_CORS_ORIGINS, comma-separated).
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
    /// Tracing filter directives (from RUST_LOG)
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("LEASEHOLD_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("LEASEHOLD_PORT is not a valid port: {:?}", raw))?,
            None => DEFAULT_PORT,
        };

        let cors_origins = lookup("LEASEHOLD_CORS_ORIGINS").map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        Ok(Self {
            database: lookup("LEASEHOLD_DATABASE").map(PathBuf::from),
            host: lookup("LEASEHOLD_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            cors_origins,
            log_filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}
