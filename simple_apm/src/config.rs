//! Central configuration for the simple_apm crate
//!
//! Everything is read once at startup. Invalid values are reported as
//! [`ConfigError`] so the process can refuse to start instead of failing
//! on the first request.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use http::uri::PathAndQuery;
use thiserror::Error;
use url::Url;

/// Name of the session cookie issued by the gateway
pub const SESSION_COOKIE_NAME: &str = "MRHSession";

/// Static body served by the denial (hangup) route
pub const HANGUP_BODY: &str = "Evil page...";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PROXIED_SERVICE: &str = "http://localhost:8081";
pub const DEFAULT_COOKIE_TTL_SECS: u64 = 360;
/// Keeps `now + ttl` well inside the representable timestamp range
pub const MAX_COOKIE_TTL_SECS: u64 = i32::MAX as u64;
pub const DEFAULT_CONFIRM_PATH: &str = "/my.policy";
pub const DEFAULT_DENIED_PATH: &str = "/vdesk/hangup.php3";

pub const ENV_PORT: &str = "SIMPLE_APM_PORT";
pub const ENV_PROXIED_SERVICE: &str = "SIMPLE_APM_PROXIED_SERVICE";
pub const ENV_COOKIE_TTL: &str = "SIMPLE_APM_COOKIE_TTL";
pub const ENV_CONFIRM_POLICY: &str = "SIMPLE_APM_CONFIRM_POLICY";
pub const ENV_CONFIRM_PATH: &str = "SIMPLE_APM_CONFIRM_PATH";
pub const ENV_DENIED_PATH: &str = "SIMPLE_APM_DENIED_PATH";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// What the confirmation step does with a valid token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Leave the token alive until it expires naturally.
    #[default]
    Keep,
    /// Delete the token and issue a fresh one with the same target.
    Rotate,
}

impl FromStr for ConfirmPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep" => Ok(ConfirmPolicy::Keep),
            "rotate" => Ok(ConfirmPolicy::Rotate),
            other => Err(format!("expected 'keep' or 'rotate', got '{other}'")),
        }
    }
}

impl fmt::Display for ConfirmPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmPolicy::Keep => f.write_str("keep"),
            ConfirmPolicy::Rotate => f.write_str("rotate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub port: u16,
    /// Base URL of the protected backend
    pub proxied_service: Url,
    pub cookie_ttl_secs: u64,
    pub confirm_policy: ConfirmPolicy,
    pub confirm_path: String,
    pub denied_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            proxied_service: Url::parse(DEFAULT_PROXIED_SERVICE)
                .unwrap_or_else(|_| unreachable!("default backend URL is well-formed")),
            cookie_ttl_secs: DEFAULT_COOKIE_TTL_SECS,
            confirm_policy: ConfirmPolicy::default(),
            confirm_path: DEFAULT_CONFIRM_PATH.to_string(),
            denied_path: DEFAULT_DENIED_PATH.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Reads the `SIMPLE_APM_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parses configuration from any key lookup. Unset and empty values fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(value) = get(ENV_PORT) {
            config.port = value
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid(ENV_PORT, &value, e.to_string()))?;
        }

        if let Some(value) = get(ENV_PROXIED_SERVICE) {
            config.proxied_service = parse_backend_url(&value)?;
        }

        if let Some(value) = get(ENV_COOKIE_TTL) {
            let ttl: u64 = value.parse().map_err(|e: std::num::ParseIntError| {
                invalid(ENV_COOKIE_TTL, &value, e.to_string())
            })?;
            if ttl == 0 || ttl > MAX_COOKIE_TTL_SECS {
                return Err(invalid(
                    ENV_COOKIE_TTL,
                    &value,
                    format!("must be between 1 and {MAX_COOKIE_TTL_SECS} seconds"),
                ));
            }
            config.cookie_ttl_secs = ttl;
        }

        if let Some(value) = get(ENV_CONFIRM_POLICY) {
            config.confirm_policy = value
                .parse()
                .map_err(|reason| invalid(ENV_CONFIRM_POLICY, &value, reason))?;
        }

        if let Some(value) = get(ENV_CONFIRM_PATH) {
            config.confirm_path = parse_route(ENV_CONFIRM_PATH, &value)?;
        }

        if let Some(value) = get(ENV_DENIED_PATH) {
            config.denied_path = parse_route(ENV_DENIED_PATH, &value)?;
        }

        if config.confirm_path == config.denied_path {
            return Err(invalid(
                ENV_DENIED_PATH,
                &config.denied_path,
                "must differ from the confirmation path".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn cookie_ttl(&self) -> Duration {
        Duration::seconds(self.cookie_ttl_secs as i64)
    }
}

fn invalid(name: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason,
    }
}

fn parse_backend_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| invalid(ENV_PROXIED_SERVICE, value, e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(invalid(
            ENV_PROXIED_SERVICE,
            value,
            "missing host".to_string(),
        )),
        scheme => Err(invalid(
            ENV_PROXIED_SERVICE,
            value,
            format!("unsupported scheme '{scheme}'"),
        )),
    }
}

/// Characters the router would read as captures or wildcards
const ROUTE_SYNTAX: [char; 4] = [':', '*', '{', '}'];

fn parse_route(name: &'static str, value: &str) -> Result<String, ConfigError> {
    if !value.starts_with('/') || value.starts_with("//") || value == "/" {
        return Err(invalid(
            name,
            value,
            "must be an absolute path other than '/'".to_string(),
        ));
    }
    if value.contains(ROUTE_SYNTAX) {
        return Err(invalid(
            name,
            value,
            "must not contain ':', '*', '{' or '}'".to_string(),
        ));
    }
    match value.parse::<PathAndQuery>() {
        Ok(parsed) if parsed.query().is_none() && parsed.path() == value => Ok(value.to_string()),
        _ => Err(invalid(
            name,
            value,
            "must be a plain URI path without query or fragment".to_string(),
        )),
    }
}
