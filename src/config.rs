use std::env;

use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum StorageBackend {
    Mongo { uri: String, database_name: String },
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub storage: StorageBackend,
    pub jwt_secret: String,
    /// `None` means issued tokens never expire.
    pub token_ttl_hours: Option<i64>,
    pub bcrypt_cost: u32,
    pub bind_address: String,
    pub port: u16,
    pub frontend_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::from_filename("config.env").ok();
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match lookup("STORAGE_BACKEND").as_deref().unwrap_or("mongo") {
            "mongo" => StorageBackend::Mongo {
                uri: lookup("MONGO_URI").ok_or(ConfigError::Missing("MONGO_URI"))?,
                database_name: lookup("DATABASE_NAME").unwrap_or_else(|| "devtrack".to_string()),
            },
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let token_ttl_hours = match parse_or("TOKEN_TTL_HOURS", &lookup, 24i64)? {
            0 => None,
            hours if hours > 0 => Some(hours),
            hours => {
                return Err(ConfigError::Invalid {
                    key: "TOKEN_TTL_HOURS",
                    value: hours.to_string(),
                })
            }
        };

        let bcrypt_cost = parse_or("BCRYPT_COST", &lookup, bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        Ok(Self {
            storage,
            jwt_secret,
            token_ttl_hours,
            bcrypt_cost,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", &lookup, 5000u16)?,
            frontend_origin: lookup("FRONTEND_ORIGIN").filter(|s| !s.is_empty()),
        })
    }

    /// In-memory storage and the cheapest bcrypt cost, for tests and quick local runs.
    pub fn local(jwt_secret: &str) -> Self {
        Self {
            storage: StorageBackend::Memory,
            jwt_secret: jwt_secret.to_string(),
            token_ttl_hours: Some(24),
            bcrypt_cost: 4,
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
            frontend_origin: None,
        }
    }

    pub fn token_ttl(&self) -> Option<Duration> {
        self.token_ttl_hours.map(Duration::hours)
    }
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
