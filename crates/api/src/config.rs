use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Credentials of an administrator created at startup if missing.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL. Without one, content lives in memory.
    pub database_url: Option<String>,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// Minimum database connections in the pool.
    pub db_min_connections: u32,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Lifetime of issued tokens, in seconds.
    pub jwt_ttl_secs: i64,
    /// How often the live-update poller looks for new items.
    pub live_poll_interval: Duration,
    /// Interval between SSE heartbeat comments.
    pub live_heartbeat: Duration,
    /// Events buffered per live subscriber before it counts as disconnected.
    pub live_subscriber_buffer: usize,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Optional JSON file of definitions and documents loaded at startup.
    pub seed_path: Option<PathBuf>,
    pub admin: Option<AdminBootstrap>,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3030,
            database_url: None,
            db_max_connections: 20,
            db_min_connections: 5,
            jwt_secret: "dev-secret-change-me-in-production".to_string(),
            jwt_ttl_secs: 86_400,
            live_poll_interval: Duration::from_millis(3_000),
            live_heartbeat: Duration::from_secs(20),
            live_subscriber_buffer: 64,
            max_body_bytes: 2 * 1024 * 1024,
            seed_path: None,
            admin: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let admin = match (text("ADMIN_USERNAME"), text("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminBootstrap { username, password }),
            _ => None,
        };

        Ok(Self {
            host: text("HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "PORT", defaults.port, "a valid u16")?,
            database_url: text("DATABASE_URL"),
            db_max_connections: parse(
                &lookup,
                "DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
                "a valid u32",
            )?,
            db_min_connections: parse(
                &lookup,
                "DB_MIN_CONNECTIONS",
                defaults.db_min_connections,
                "a valid u32",
            )?,
            jwt_secret: text("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_ttl_secs: parse(&lookup, "JWT_TTL_SECS", defaults.jwt_ttl_secs, "a number of seconds")?,
            live_poll_interval: Duration::from_millis(parse(
                &lookup,
                "LIVE_POLL_INTERVAL_MS",
                3_000,
                "a number of milliseconds",
            )?),
            live_heartbeat: Duration::from_secs(parse(
                &lookup,
                "LIVE_HEARTBEAT_SECS",
                20,
                "a number of seconds",
            )?),
            live_subscriber_buffer: parse(
                &lookup,
                "LIVE_SUBSCRIBER_BUFFER",
                defaults.live_subscriber_buffer,
                "a valid usize",
            )?,
            max_body_bytes: parse(&lookup, "MAX_BODY_BYTES", defaults.max_body_bytes, "a valid usize")?,
            seed_path: text("SEED_PATH").map(PathBuf::from),
            admin,
            log_level: text("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected,
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3030);
        assert!(config.database_url.is_none());
        assert_eq!(config.live_poll_interval, Duration::from_millis(3_000));
        assert_eq!(config.live_heartbeat, Duration::from_secs(20));
        assert!(config.admin.is_none());
        assert_eq!(config.addr(), "0.0.0.0:3030");
    }

    #[test]
    fn overrides_and_admin() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/content"),
            ("ADMIN_USERNAME", "root"),
            ("ADMIN_PASSWORD", "pw"),
            ("LIVE_POLL_INTERVAL_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/content"));
        assert_eq!(config.admin.unwrap().username, "root");
        assert_eq!(config.live_poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn bad_number_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err.to_string(), "PORT must be a valid u16, got \"eighty\"");
    }
}
