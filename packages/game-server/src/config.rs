use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use shared::services::challenge_service::DEFAULT_CHALLENGE_TTL_SECS;
use shared::services::matchmaking_service::{DEFAULT_QUEUE_TIMEOUT, DEFAULT_RATING_BAND};
use shared::services::session_registry::SweepPolicy;

const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;
const DEFAULT_MAX_LIVE_SESSIONS: usize = 10_000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "Missing environment variable {}", name),
            ConfigError::Invalid { name, value } => {
                write!(f, "Invalid value for {}: {:?}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Tables {
    pub games: String,
    pub users: String,
    pub challenges: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    DynamoDb(Tables),
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub storage: StorageBackend,
    pub matchmaking_timeout: Duration,
    pub rating_band: i32,
    pub challenge_ttl: chrono::Duration,
    pub session_idle: Duration,
    pub max_live_sessions: usize,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let storage = match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("dynamodb") => StorageBackend::DynamoDb(Tables {
                games: lookup("GAMES_TABLE").ok_or(ConfigError::Missing("GAMES_TABLE"))?,
                users: lookup("USERS_TABLE").ok_or(ConfigError::Missing("USERS_TABLE"))?,
                challenges: lookup("CHALLENGES_TABLE")
                    .ok_or(ConfigError::Missing("CHALLENGES_TABLE"))?,
            }),
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        Ok(Config {
            bind_addr: parse_or(&lookup, "BIND_ADDR", default_bind_addr)?,
            jwt_secret,
            storage,
            matchmaking_timeout: Duration::from_secs(parse_or(
                &lookup,
                "MATCHMAKING_TIMEOUT_SECS",
                || DEFAULT_QUEUE_TIMEOUT.as_secs(),
            )?),
            rating_band: parse_or(&lookup, "MATCHMAKING_RATING_BAND", || DEFAULT_RATING_BAND)?,
            challenge_ttl: chrono::Duration::seconds(parse_or(
                &lookup,
                "CHALLENGE_TTL_SECS",
                || DEFAULT_CHALLENGE_TTL_SECS,
            )?),
            session_idle: Duration::from_secs(parse_or(&lookup, "SESSION_IDLE_SECS", || {
                DEFAULT_SESSION_IDLE_SECS
            })?),
            max_live_sessions: parse_or(&lookup, "MAX_LIVE_SESSIONS", || {
                DEFAULT_MAX_LIVE_SESSIONS
            })?,
            sweep_interval: Duration::from_secs(parse_or(&lookup, "SWEEP_INTERVAL_SECS", || {
                DEFAULT_SWEEP_INTERVAL_SECS
            })?),
        })
    }

    /// Defaults with in-memory storage, for local runs and tests.
    pub fn in_memory(jwt_secret: &str) -> Self {
        Config {
            bind_addr: default_bind_addr(),
            jwt_secret: jwt_secret.to_string(),
            storage: StorageBackend::Memory,
            matchmaking_timeout: DEFAULT_QUEUE_TIMEOUT,
            rating_band: DEFAULT_RATING_BAND,
            challenge_ttl: chrono::Duration::seconds(DEFAULT_CHALLENGE_TTL_SECS),
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            max_live_sessions: DEFAULT_MAX_LIVE_SESSIONS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }

    pub fn sweep_policy(&self) -> SweepPolicy {
        SweepPolicy {
            idle_after: self.session_idle,
            max_sessions: self.max_live_sessions,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: impl FnOnce() -> T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default()),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_memory_backend_with_defaults() {
        let config =
            Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret"), ("STORAGE_BACKEND", "memory")]))
                .unwrap();

        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.matchmaking_timeout, Duration::from_secs(60));
        assert_eq!(config.rating_band, 200);
        assert_eq!(config.challenge_ttl, chrono::Duration::seconds(300));
        assert_eq!(config.sweep_policy().max_sessions, 10_000);
        assert_eq!(config, Config::in_memory("s3cret"));
    }

    #[test]
    fn test_dynamodb_requires_tables() {
        let result = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("GAMES_TABLE", "games")]));

        assert_eq!(result.unwrap_err(), ConfigError::Missing("USERS_TABLE"));
    }

    #[test]
    fn test_dynamodb_backend() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s"),
            ("STORAGE_BACKEND", "dynamodb"),
            ("GAMES_TABLE", "games"),
            ("USERS_TABLE", "users"),
            ("CHALLENGES_TABLE", "challenges"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("SESSION_IDLE_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(
            config.storage,
            StorageBackend::DynamoDb(Tables {
                games: "games".to_string(),
                users: "users".to_string(),
                challenges: "challenges".to_string(),
            })
        );
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.session_idle, Duration::from_secs(60));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            Config::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
        assert_eq!(
            Config::from_lookup(lookup(&[
                ("JWT_SECRET", "s"),
                ("STORAGE_BACKEND", "memory"),
                ("MAX_LIVE_SESSIONS", "lots"),
            ]))
            .unwrap_err(),
            ConfigError::Invalid {
                name: "MAX_LIVE_SESSIONS",
                value: "lots".to_string()
            }
        );
        assert!(matches!(
            Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("STORAGE_BACKEND", "redis")])),
            Err(ConfigError::Invalid { name: "STORAGE_BACKEND", .. })
        ));
    }
}
