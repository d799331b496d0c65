//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: invalid value '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Where audit events are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditSinkKind {
    /// Kept in process memory; backs `GET /audit/events`.
    #[default]
    Memory,
    /// One structured log line per event.
    Log,
    /// Redis Streams (`XADD`).
    Redis,
}

impl FromStr for AuditSinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(AuditSinkKind::Memory),
            "log" => Ok(AuditSinkKind::Log),
            "redis" => Ok(AuditSinkKind::Redis),
            _ => Err("expected one of: memory, log, redis".to_string()),
        }
    }
}

/// At most `max_requests` per `window` for one key. `max_requests == 0`
/// turns the limit off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: std::time::Duration,
}

impl RateLimit {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: std::time::Duration::from_secs(window_secs),
        }
    }

    pub const fn disabled() -> Self {
        Self::new(0, 1)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub token_ttl: Duration,
    pub clock_leeway: Duration,
    pub audit_queue_capacity: usize,
    pub audit_sink: AuditSinkKind,
    /// Set when `USE_PERSISTENT_STORES=true`.
    pub database_url: Option<String>,
    pub redis_url: String,
    /// Per client address, shared by register, login and refresh.
    pub auth_rate_limit: RateLimit,
    /// Per author.
    pub post_rate_limit: RateLimit,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("token_ttl", &self.token_ttl)
            .field("clock_leeway", &self.clock_leeway)
            .field("audit_queue_capacity", &self.audit_queue_capacity)
            .field("audit_sink", &self.audit_sink)
            .field("persistent", &self.database_url.is_some())
            .field("auth_rate_limit", &self.auth_rate_limit)
            .field("post_rate_limit", &self.post_rate_limit)
            .finish_non_exhaustive()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            token_ttl: Duration::minutes(15),
            clock_leeway: Duration::zero(),
            audit_queue_capacity: 1024,
            audit_sink: AuditSinkKind::Memory,
            database_url: None,
            redis_url: "redis://localhost:6379".to_string(),
            auth_rate_limit: RateLimit::new(5, 15 * 60),
            post_rate_limit: RateLimit::new(10, 60 * 60),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                defaults.jwt_secret
            }
        };

        let use_persistent = parse(&lookup, "USE_PERSISTENT_STORES")?.unwrap_or(false);
        let database_url = if use_persistent {
            Some(lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?)
        } else {
            None
        };

        let audit_sink = parse(&lookup, "AUDIT_SINK")?.unwrap_or(defaults.audit_sink);
        if audit_sink == AuditSinkKind::Redis && !cfg!(feature = "redis") {
            return Err(ConfigError::Invalid {
                key: "AUDIT_SINK",
                value: "redis".to_string(),
                reason: "built without the redis feature".to_string(),
            });
        }

        let audit_queue_capacity: usize = parse(&lookup, "AUDIT_QUEUE_CAPACITY")?.unwrap_or(defaults.audit_queue_capacity);
        if audit_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "AUDIT_QUEUE_CAPACITY",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            jwt_secret,
            bind_addr: parse(&lookup, "BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            token_ttl: parse::<u32>(&lookup, "TOKEN_TTL_SECS")?
                .map(|s| Duration::seconds(i64::from(s)))
                .unwrap_or(defaults.token_ttl),
            clock_leeway: parse::<u32>(&lookup, "CLOCK_LEEWAY_SECS")?
                .map(|s| Duration::seconds(i64::from(s)))
                .unwrap_or(defaults.clock_leeway),
            audit_queue_capacity,
            audit_sink,
            database_url,
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            auth_rate_limit: rate_limit(&lookup, "AUTH_RATE_LIMIT", "AUTH_RATE_WINDOW_SECS", defaults.auth_rate_limit)?,
            post_rate_limit: rate_limit(&lookup, "POST_RATE_LIMIT", "POST_RATE_WINDOW_SECS", defaults.post_rate_limit)?,
        })
    }
}

fn rate_limit(
    lookup: &impl Fn(&str) -> Option<String>,
    count_key: &'static str,
    window_key: &'static str,
    default: RateLimit,
) -> Result<RateLimit, ConfigError> {
    let max_requests = parse::<u32>(lookup, count_key)?.unwrap_or(default.max_requests);
    let window = match parse::<u64>(lookup, window_key)? {
        None => default.window,
        Some(0) => {
            return Err(ConfigError::Invalid {
                key: window_key,
                value: "0".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        Some(secs) => std::time::Duration::from_secs(secs),
    };
    Ok(RateLimit { max_requests, window })
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
