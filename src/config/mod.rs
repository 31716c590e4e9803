use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Longest token lifetime accepted from configuration (about ten years)
pub const MAX_TOKEN_LIFETIME_DAYS: i64 = 3650;

/// Startup configuration failures. Any of these stops the process before it binds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Token key not found (set TOKEN_KEY)")]
    MissingTokenKey,

    #[error("Connection string not found (set DATABASE_URL)")]
    MissingConnectionString,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("production") | Some("prod") | Some("Production") => Environment::Production,
            Some("staging") | Some("stage") | Some("Staging") => Environment::Staging,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub token_key: String,
    pub token_lifetime_days: i64,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup, so tests don't touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = Environment::parse(lookup("APP_ENV").as_deref());
        let token_key = first_present(&lookup, &["TOKEN_KEY", "TokenKey"])
            .ok_or(ConfigError::MissingTokenKey)?;
        let connection_string =
            first_present(&lookup, &["DATABASE_URL", "ConnectionStrings__DefaultConnection"])
                .ok_or(ConfigError::MissingConnectionString)?;

        // Set defaults based on environment, then override with specific env vars
        let mut config = Self::defaults(environment, token_key, connection_string);

        if let Some(v) = lookup("CORS_ORIGINS") {
            config.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("TOKEN_LIFETIME_DAYS") {
            let days: i64 = parse_value("TOKEN_LIFETIME_DAYS", &v)?;
            if !(1..=MAX_TOKEN_LIFETIME_DAYS).contains(&days) {
                return Err(ConfigError::InvalidValue {
                    key: "TOKEN_LIFETIME_DAYS",
                    value: v,
                });
            }
            config.security.token_lifetime_days = days;
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = parse_value("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("PORT") {
            config.api.port = parse_value("PORT", &v)?;
        }

        Ok(config)
    }

    fn defaults(environment: Environment, token_key: String, connection_string: String) -> Self {
        let max_connections = match environment {
            Environment::Production => 20,
            Environment::Staging => 10,
            Environment::Development => 5,
        };

        Self {
            environment,
            database: DatabaseConfig {
                connection_string,
                max_connections,
            },
            api: ApiConfig { port: 5000 },
            security: SecurityConfig {
                token_key,
                token_lifetime_days: 7,
                cors_origins: vec![
                    "http://localhost:4200".to_string(),
                    "https://localhost:4200".to_string(),
                ],
            },
        }
    }
}

/// First non-blank value among `keys`; later keys are legacy aliases.
fn first_present<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(*key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
