//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub rooms: RoomConfig,
    pub liveness: LivenessConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(ConfigError::InvalidValue("APP_ENV", other.to_string())),
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Admission token configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Cookie consulted when no `Authorization` header is sent
    pub cookie_name: String,
}

/// Per-room session tuning
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Bound of each session's outbound queue
    pub outbound_capacity: usize,
    /// Upper bound on a single transport write
    pub write_timeout_ms: u64,
}

impl RoomConfig {
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: default_outbound_capacity(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

/// Liveness probe configuration
#[derive(Debug, Clone)]
pub struct LivenessConfig {
    pub interval_secs: u64,
}

impl LivenessConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_liveness_interval(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "relay".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_cookie_name() -> String {
    "token".to_string()
}

fn default_outbound_capacity() -> usize {
    64
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

fn default_liveness_interval() -> u64 {
    15
}

impl RelayConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Returns an error if required values are missing or malformed
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let outbound_capacity = parse_or(&lookup, "ROOM_OUTBOUND_CAPACITY", default_outbound_capacity)?;
        if outbound_capacity == 0 {
            return Err(ConfigError::InvalidValue("ROOM_OUTBOUND_CAPACITY", "0".to_string()));
        }

        let write_timeout_ms =
            parse_or(&lookup, "SESSION_WRITE_TIMEOUT_MS", default_write_timeout_ms)?;
        if write_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("SESSION_WRITE_TIMEOUT_MS", "0".to_string()));
        }

        let interval_secs = parse_or(&lookup, "LIVENESS_INTERVAL_SECS", default_liveness_interval)?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidValue("LIVENESS_INTERVAL_SECS", "0".to_string()));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .map(|s| s.parse::<Environment>())
                    .transpose()?
                    .unwrap_or_default(),
            },
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(default_host),
                port: parse_required(&lookup, "PORT")?,
            },
            jwt: JwtConfig {
                secret: lookup("JWT_SECRET").ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
                cookie_name: lookup("AUTH_COOKIE_NAME").unwrap_or_else(default_cookie_name),
            },
            rooms: RoomConfig {
                outbound_capacity,
                write_timeout_ms,
            },
            liveness: LivenessConfig { interval_secs },
        })
    }
}

fn parse_required<F, T>(lookup: &F, key: &'static str) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key).ok_or(ConfigError::MissingVar(key))?;
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key, raw))
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: fn() -> T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default()),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
