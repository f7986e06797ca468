// ABOUTME: Server configuration loaded from environment variables
// ABOUTME: Covers bind address, database location, CORS origin and diagram retry budget

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::ParseIntError;

use prdsmith_core::constants::database_file;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 4100;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid host address: {0}")]
    InvalidHost(String),
    #[error("Invalid DIAGRAM_MAX_ATTEMPTS: {0} (must be at least 1)")]
    InvalidAttempts(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub cors_origin: String,
    pub diagram_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let port = port_str.trim().parse::<u16>()?;

        // Validate port is in valid range
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let host_str = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let host = host_str
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(host_str.clone()))?;

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| format!("sqlite:{}", database_file().display()));

        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string());

        let diagram_max_attempts = match env::var("DIAGRAM_MAX_ATTEMPTS") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(attempts) if attempts >= 1 => attempts,
                _ => return Err(ConfigError::InvalidAttempts(raw)),
            },
            Err(_) => prdsmith_prd::DEFAULT_DIAGRAM_ATTEMPTS,
        };

        Ok(Config {
            host,
            port,
            database_url,
            cors_origin,
            diagram_max_attempts,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
