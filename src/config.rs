//! Configuration management for eha
//!
//! Config is stored at ~/.config/eha/config.toml. Command line flags win over
//! the environment, which wins over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::enigma2::DEFAULT_REMOTE_ADDR;
use crate::event::DEFAULT_LOCAL_TIMEZONE;

/// Environment variable naming the receiver host
pub const REMOTE_ADDR_ENV: &str = "ENIGMA2_HTTP_API_HOST";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Receiver host, optionally with port
    pub remote_addr: Option<String>,
    /// IANA timezone of the receiver's clock (e.g. Europe/Berlin)
    pub timezone: Option<String>,
    /// Default denylist file
    pub blacklist: Option<PathBuf>,
    /// Directory for request dump files
    pub dump_requests: Option<PathBuf>,
}

impl Config {
    /// Get config file path (~/.config/eha/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("eha").join("config.toml"))
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Load config from an explicit file; unlike [`Config::load`] a missing
    /// or malformed file is an error
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Receiver host with fallback chain:
    /// 1. command line flag
    /// 2. environment variable ENIGMA2_HTTP_API_HOST
    /// 3. config file
    /// 4. enigma2.local
    pub fn remote_addr(&self, flag: Option<&str>) -> String {
        self.remote_addr_with(flag, std::env::var(REMOTE_ADDR_ENV).ok())
    }

    pub fn remote_addr_with(&self, flag: Option<&str>, env: Option<String>) -> String {
        flag.map(str::to_string)
            .or(env.filter(|v| !v.trim().is_empty()))
            .or_else(|| self.remote_addr.clone())
            .unwrap_or_else(|| DEFAULT_REMOTE_ADDR.to_string())
    }

    /// Receiver timezone, command line flag first
    pub fn timezone(&self, flag: Option<&str>) -> Result<Tz, ConfigError> {
        match flag.or(self.timezone.as_deref()) {
            Some(name) => parse_timezone(name),
            None => Ok(DEFAULT_LOCAL_TIMEZONE),
        }
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}
