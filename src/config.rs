//! Environment configuration.
//!
//! | Variable | Default | |
//! |---|---|---|
//! | `JWT_SECRET` | required | token signing secret |
//! | `HOST` | `0.0.0.0` | bind host |
//! | `PORT` | `3000` | bind port |
//! | `ADMIN_EMAIL`, `ADMIN_PASSWORD` | unset | seed an admin account at startup; both or neither |
//! | `CATALOG_FILE` | unset | JSON array of products loaded at startup |
//! | `CORS_ALLOWED_ORIGINS` | unset | comma-separated browser origins; unset disables CORS |
//!
//! A `.env` file in the working directory is read first, if present.
//! `RUST_LOG` is read by the tracing subscriber, not here.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingRequired(&'static str),

    #[error("failed to parse environment variable {name}: {reason}")]
    ParseError { name: &'static str, reason: String },

    #[error("invalid port: must be between 1 and 65535")]
    InvalidPort,

    #[error("invalid bind host {0:?}")]
    InvalidAddress(String),
}

#[derive(Debug)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: SecretString,
    pub admin: Option<AdminSeed>,
    pub catalog_file: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
}

/// Credentials for the admin account created at startup.
#[derive(Debug)]
pub struct AdminSeed {
    pub email: String,
    pub password: SecretString,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(|name| env::var(name).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingRequired("JWT_SECRET"))?;

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let host: IpAddr = host.parse().map_err(|_| ConfigError::InvalidAddress(host))?;

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::ParseError {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 3000,
        };

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password: password.into() }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingRequired("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::MissingRequired("ADMIN_EMAIL")),
        };

        let catalog_file = lookup("CATALOG_FILE").filter(|s| !s.is_empty()).map(PathBuf::from);

        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_owned())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            host,
            port,
            jwt_secret: jwt_secret.into(),
            admin,
            catalog_file,
            allowed_origins,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
