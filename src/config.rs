//! Configuration management for Upload Portal

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub session: SessionConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: PathBuf,
    /// Largest accepted request body, in bytes
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Secret the cookie signing key is derived from. A random key is used when absent.
    pub secret: Option<String>,
    pub ttl_secs: i64,
}

/// The default account created at startup
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    pub enabled: bool,
    pub username: String,
    pub password: String,
}

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATABASE_URL: &str = "sqlite:./app.db";
const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_UPLOAD_MAX_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;
const MAX_SESSION_TTL_SECS: i64 = 365 * 24 * 60 * 60;

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
            },
            uploads: UploadConfig {
                dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
                max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            },
            session: SessionConfig {
                secret: None,
                ttl_secs: DEFAULT_SESSION_TTL_SECS,
            },
            seed: SeedConfig {
                enabled: true,
                username: DEFAULT_ADMIN_USERNAME.to_string(),
                password: DEFAULT_ADMIN_PASSWORD.to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    ///
    /// A value that is present but unparsable is an error; only absent keys
    /// take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ttl_secs = parse_var(&lookup, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        if !(1..=MAX_SESSION_TTL_SECS).contains(&ttl_secs) {
            return Err(ConfigError::InvalidValue {
                key: "SESSION_TTL_SECS",
                value: ttl_secs.to_string(),
            });
        }

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_var(&lookup, "SERVER_PORT", DEFAULT_PORT)?,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            },
            uploads: UploadConfig {
                dir: lookup("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
                max_bytes: parse_var(&lookup, "UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES)?,
            },
            session: SessionConfig {
                secret: lookup("SESSION_SECRET").filter(|s| !s.is_empty()),
                ttl_secs,
            },
            seed: SeedConfig {
                enabled: parse_flag(&lookup, "SEED_ADMIN", true)?,
                username: lookup("ADMIN_USERNAME")
                    .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
                password: lookup("ADMIN_PASSWORD")
                    .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
            },
        })
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key, value }),
        },
        None => Ok(default),
    }
}
