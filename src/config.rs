/*
 * Responsibility
 * - Load settings from the environment (.env is honoured via dotenvy)
 * - Validate them up front: a gateway with a broken config must not start
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::gate::IdentityHeaderPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub database_url: String,
    pub database_max_connections: u32,

    pub upstream_url: Url,
    pub upstream_timeout: Duration,

    pub basic_username: String,
    pub basic_password: String,
    pub identity_headers: IdentityHeaderPolicy,
    pub lookup_timeout: Duration,

    pub request_body_limit_bytes: usize,
    pub request_timeout: Duration,
}

// Keep credentials and the database URL out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("upstream_url", &self.upstream_url.as_str())
            .field("identity_headers", &self.identity_headers)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = env_or("PORT", 3000)?;

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let database_max_connections = positive(
            "DATABASE_MAX_CONNECTIONS",
            env_or("DATABASE_MAX_CONNECTIONS", 10u32)?,
        )?;

        let upstream_url = std::env::var("UPSTREAM_URL")
            .map_err(|_| ConfigError::Missing("UPSTREAM_URL"))?;
        let upstream_url = parse_upstream_url(&upstream_url)?;

        let upstream_timeout = Duration::from_secs(positive(
            "UPSTREAM_TIMEOUT_SECS",
            env_or("UPSTREAM_TIMEOUT_SECS", 30u64)?,
        )?);

        let basic_username =
            std::env::var("GATE_BASIC_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let basic_password =
            std::env::var("GATE_BASIC_PASSWORD").unwrap_or_else(|_| "admin".to_string());
        if basic_username.is_empty() || basic_username.contains(':') {
            return Err(ConfigError::Invalid("GATE_BASIC_USERNAME"));
        }

        let identity_headers = match std::env::var("GATE_IDENTITY_HEADERS") {
            Ok(v) => IdentityHeaderPolicy::from_str(&v)
                .map_err(|_| ConfigError::Invalid("GATE_IDENTITY_HEADERS"))?,
            Err(_) => IdentityHeaderPolicy::default(),
        };

        let lookup_timeout = Duration::from_millis(positive(
            "GATE_LOOKUP_TIMEOUT_MS",
            env_or("GATE_LOOKUP_TIMEOUT_MS", 2000u64)?,
        )?);

        let request_body_limit_bytes = positive(
            "REQUEST_BODY_LIMIT_BYTES",
            env_or("REQUEST_BODY_LIMIT_BYTES", 1024 * 1024usize)?,
        )?;
        let request_timeout = Duration::from_secs(positive(
            "REQUEST_TIMEOUT_SECS",
            env_or("REQUEST_TIMEOUT_SECS", 30u64)?,
        )?);

        Ok(Self {
            addr,
            app_env,
            database_url,
            database_max_connections,
            upstream_url,
            upstream_timeout,
            basic_username,
            basic_password,
            identity_headers,
            lookup_timeout,
            request_body_limit_bytes,
            request_timeout,
        })
    }
}

/// Unset falls back to `default`; set but unparsable fails startup.
fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    parse_value(key, std::env::var(key).ok().as_deref(), default)
}

fn parse_value<T: FromStr>(
    key: &'static str,
    raw: Option<&str>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse::<T>().map_err(|_| ConfigError::Invalid(key)),
    }
}

fn positive<T: PartialEq + Default>(key: &'static str, value: T) -> Result<T, ConfigError> {
    if value == T::default() {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}

fn parse_upstream_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid("UPSTREAM_URL"))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(ConfigError::Invalid("UPSTREAM_URL")),
    }
}
