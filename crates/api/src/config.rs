//! Process configuration, read once from the environment at startup.
//!
//! | Variable                   | Default                      |
//! |----------------------------|------------------------------|
//! | `APP_ENV`                  | `development`                |
//! | `PORT`                     | `8000`                       |
//! | `STORE_BACKEND`            | `memory` (`memory`, `mongo`) |
//! | `MONGO_URI`                | `mongodb://localhost:27017`  |
//! | `MONGO_DATABASE`           | `crewdesk`                   |
//! | `JWT_SECRET`               | dev default (development)    |
//! | `TOKEN_EXPIRES_IN`         | `3600` seconds               |
//! | `REFRESH_TOKEN_EXPIRES_IN` | `7d`                         |
//! | `COOKIE_SECURE`            | `true` in production         |
//! | `CORS_ORIGINS`             | empty (any origin)           |
//! | `LOG_FORMAT`               | `json`                       |

use chrono::Duration;
use thiserror::Error;

use crewdesk_observability::LogFormat;

const DEV_JWT_SECRET: &str = "crewdesk-dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{0} must be set in production")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Mongo { uri: String, database: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub port: u16,
    pub store: StoreBackend,
    pub jwt_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub cookie_secure: bool,
    pub cors_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let env = match var("APP_ENV").as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "APP_ENV",
                    reason: format!("unknown environment `{other}`"),
                });
            }
        };

        let port = match var("PORT") {
            None => 8000,
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                reason: format!("`{raw}` is not a port number"),
            })?,
        };

        let store = match var("STORE_BACKEND").as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("mongo") | Some("mongodb") => StoreBackend::Mongo {
                uri: var("MONGO_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
                database: var("MONGO_DATABASE").unwrap_or_else(|| "crewdesk".to_string()),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STORE_BACKEND",
                    reason: format!("expected `memory` or `mongo`, got `{other}`"),
                });
            }
        };

        let jwt_secret = match (var("JWT_SECRET"), env) {
            (Some(secret), _) => secret,
            (None, Environment::Production) => return Err(ConfigError::Missing("JWT_SECRET")),
            (None, Environment::Development) => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let access_ttl = match var("TOKEN_EXPIRES_IN") {
            None => Duration::seconds(3600),
            Some(raw) => parse_duration("TOKEN_EXPIRES_IN", &raw)?,
        };
        let refresh_ttl = match var("REFRESH_TOKEN_EXPIRES_IN") {
            None => Duration::days(7),
            Some(raw) => parse_duration("REFRESH_TOKEN_EXPIRES_IN", &raw)?,
        };

        let cookie_secure = match var("COOKIE_SECURE") {
            None => env == Environment::Production,
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "COOKIE_SECURE",
                reason: format!("`{raw}` is not a boolean"),
            })?,
        };

        let cors_origins = var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let log_format = match var("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: "LOG_FORMAT",
                reason,
            })?,
        };

        Ok(Self {
            env,
            port,
            store,
            jwt_secret,
            access_ttl,
            refresh_ttl,
            cookie_secure,
            cors_origins,
            log_format,
        })
    }

    /// In-memory store, dev secret, defaults everywhere else.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            env: Environment::Development,
            port: 0,
            store: StoreBackend::Memory,
            jwt_secret: jwt_secret.into(),
            access_ttl: Duration::seconds(3600),
            refresh_ttl: Duration::days(7),
            cookie_secure: false,
            cors_origins: Vec::new(),
            log_format: LogFormat::default(),
        }
    }
}

/// `"7d"`, `"12h"`, `"15m"`, `"30s"` or a plain number of seconds.
fn parse_duration(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::Invalid {
        var,
        reason: format!("`{raw}` is not a duration"),
    };
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c)),
        _ => (raw, None),
    };
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }
    match unit {
        None | Some('s') => Ok(Duration::seconds(amount)),
        Some('m') => Ok(Duration::minutes(amount)),
        Some('h') => Ok(Duration::hours(amount)),
        Some('d') => Ok(Duration::days(amount)),
        Some(_) => Err(invalid()),
    }
}
