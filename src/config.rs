//! Runtime configuration from environment variables (`.env` is loaded by `main`)

use std::env;
use std::net::SocketAddr;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub database_max_connections: u32,
    /// Single display currency for prices
    pub currency: String,
    pub static_dir: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any key lookup, so tests do not touch the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = parse_or(&lookup, "BIND_ADDR", "0.0.0.0:8080")?;
        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", "5")?;

        Ok(Self {
            database_url,
            bind_addr,
            database_max_connections,
            currency: lookup("CURRENCY").unwrap_or_else(|| "USD".to_string()),
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "static".to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
{
    let value = lookup(name).unwrap_or_else(|| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
