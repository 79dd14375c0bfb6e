use dotenvy::dotenv;
use std::env;
use std::fmt;

use crate::errors::{AppError, Result};

/// Database URL that selects the in-process store instead of Postgres.
pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Test,
    Production,
}

impl AppEnv {
    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(AppError::config(format!("unknown APP_ENV '{}'", other))),
        }
    }

    fn default_database_url(self) -> Option<&'static str> {
        match self {
            Self::Development => Some("postgres://localhost:5432/authseal_dev"),
            Self::Test => Some("postgres://localhost:5432/authseal_test"),
            Self::Production => None,
        }
    }

    fn default_port(self) -> Option<u16> {
        match self {
            Self::Development | Self::Test => Some(3000),
            Self::Production => None,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub app_env: AppEnv,
    pub database_url: String,
    pub token_secret: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

// Hand-written so the secret never ends up in a log line.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_env", &self.app_env)
            .field("database_url", &self.database_url)
            .field("token_secret", &"[redacted]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = match lookup("APP_ENV") {
            Some(value) => AppEnv::parse(&value)?,
            None => AppEnv::Development,
        };

        let database_url = lookup("DATABASE_URL")
            .or_else(|| app_env.default_database_url().map(str::to_string))
            .ok_or_else(|| AppError::config("DATABASE_URL must be set in production"))?;

        let token_secret = lookup("TOKEN_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::config("TOKEN_SECRET must be set"))?;

        let port = match lookup("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| AppError::config("PORT must be a valid number"))?,
            None => app_env
                .default_port()
                .ok_or_else(|| AppError::config("PORT must be set in production"))?,
        };

        Ok(Self {
            app_env,
            database_url,
            token_secret,
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }

    // RUST_LOG filter for axum, tower and this crate
    pub fn rust_log(&self) -> String {
        let level = match self.log_level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" => "warn",
            "error" => "error",
            _ => "info",
        };
        format!("{level},axum={level},tower={level},tower_http={level},sqlx=warn,authseal={level}")
    }
}
