// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime parsing
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Strongly typed log level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to `tracing::Level`
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Deployment environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Server configuration loaded from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Database connection URL
    pub database_url: String,
    /// Shared secret for verifying provider-issued tokens
    pub provider_secret: String,
    /// Maximum entries held by the validated-credential cache
    pub token_cache_size: usize,
    /// Directory for uploaded media files
    pub media_root: PathBuf,
    /// Deployment environment
    pub environment: Environment,
    /// Log level
    pub log_level: LogLevel,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error when a numeric variable fails to parse or when
    /// `GYMPULSE_PROVIDER_SECRET` is missing outside of development.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let environment =
            Environment::from_str_or_default(&env_var_or("GYMPULSE_ENV", "development")?);

        let provider_secret = match env::var("GYMPULSE_PROVIDER_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment.is_production() => {
                anyhow::bail!("GYMPULSE_PROVIDER_SECRET must be set in production")
            }
            _ => {
                warn!("GYMPULSE_PROVIDER_SECRET not set, using an insecure development secret");
                "gympulse-dev-secret".to_owned()
            }
        };

        Ok(Self {
            http_port: env_var_or("HTTP_PORT", "8081")?
                .parse()
                .context("Invalid HTTP_PORT value")?,
            database_url: env_var_or("DATABASE_URL", "sqlite:./data/gympulse.db")?,
            provider_secret,
            token_cache_size: env_var_or("TOKEN_CACHE_SIZE", "1024")?
                .parse()
                .context("Invalid TOKEN_CACHE_SIZE value")?,
            media_root: PathBuf::from(env_var_or("MEDIA_ROOT", "./data/media")?),
            environment,
            log_level: LogLevel::from_str_or_default(&env_var_or("LOG_LEVEL", "info")?),
        })
    }

    /// Human-readable configuration summary for startup logging
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Gympulse Server Configuration:\n\
             - HTTP Port: {}\n\
             - Database: {}\n\
             - Token Cache Size: {}\n\
             - Media Root: {}\n\
             - Environment: {}\n\
             - Log Level: {}",
            self.http_port,
            if self.database_url.contains(":memory:") {
                "SQLite (in-memory)"
            } else {
                "SQLite"
            },
            self.token_cache_size,
            self.media_root.display(),
            self.environment,
            self.log_level,
        )
    }
}

/// Get environment variable with a default fallback
fn env_var_or(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parsing_falls_back_to_info() {
        assert_eq!(LogLevel::from_str_or_default("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str_or_default("nonsense"), LogLevel::Info);
    }

    #[test]
    fn environment_parsing_accepts_short_forms() {
        assert_eq!(
            Environment::from_str_or_default("prod"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_str_or_default("test"),
            Environment::Testing
        );
        assert_eq!(Environment::from_str_or_default(""), Environment::Development);
    }
}
