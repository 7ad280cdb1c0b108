/*
 * Responsibility
 * - Load settings from the environment (.env first, via dotenvy)
 * - Validate them: an unparsable value fails startup
 */
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::middleware::ForbiddenLogLevel;
use crate::middleware::http::TransportLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
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

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub algorithm: String,
    pub keys_dir: PathBuf,
    pub public_keys_dir: Option<PathBuf>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_seconds: u64,
    pub resolve_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub build: String,
    pub auth: AuthConfig,
    pub forbidden_log_level: ForbiddenLogLevel,
    pub transport: TransportLimits,
    pub shutdown_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port: u16 = parse_or(&var, "PORT", 3000)?;
        let addr = SocketAddr::from_str(&format!("0.0.0.0:{port}"))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));
        let build = var("APP_BUILD").unwrap_or_else(|| "develop".to_string());

        let auth = AuthConfig {
            algorithm: var("AUTH_ALGORITHM").unwrap_or_else(|| "RS256".to_string()),
            keys_dir: var("AUTH_KEYS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("keys")),
            public_keys_dir: var("AUTH_PUBLIC_KEYS_DIR").map(PathBuf::from),
            issuer: var("AUTH_ISSUER"),
            audience: var("AUTH_AUDIENCE"),
            leeway_seconds: parse_or(&var, "AUTH_LEEWAY_SECONDS", 0)?,
            resolve_timeout: Duration::from_millis(parse_or(
                &var,
                "AUTH_KEY_RESOLVE_TIMEOUT_MS",
                2000,
            )?),
        };

        let forbidden_log_level = parse_or(&var, "FORBIDDEN_LOG_LEVEL", ForbiddenLogLevel::Warn)?;

        let transport = TransportLimits {
            request_timeout: Duration::from_secs(parse_or(&var, "REQUEST_TIMEOUT_SECONDS", 30)?),
            body_limit_bytes: parse_or(&var, "REQUEST_BODY_LIMIT_BYTES", 1024 * 1024)?,
        };

        let shutdown_timeout = Duration::from_secs(parse_or(&var, "SHUTDOWN_TIMEOUT_SECONDS", 20)?);

        Ok(Self {
            addr,
            app_env,
            build,
            auth,
            forbidden_log_level,
            transport,
            shutdown_timeout,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}
