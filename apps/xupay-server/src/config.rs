// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, default values and the typed configuration
//! loaded from them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 secret for access tokens | dev secret (warns) |
//! | `TOKEN_TTL_SECS` | Access token lifetime | `3600` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `XUPAY_USE_MOCKS` | Default clients are in-memory mocks | `false` |
//! | `USER_SERVICE_URL` | Base URL of the user service | `http://localhost:8081` |
//! | `PAYMENT_SERVICE_URL` | Base URL of the payment service | `http://localhost:8082` |
//! | `REQUEST_TIMEOUT_SECS` | HTTP client request timeout | `30` |
//! | `IDEMPOTENCY_CACHE_CAPACITY` | Hot idempotency cache entries | `10000` |
//! | `IDEMPOTENCY_CACHE_TTL_SECS` | Hot idempotency cache TTL | `86400` |
//! | `FRAUD_BLOCKLIST` | Comma-separated user IDs or client IPs whose transfers are blocked | empty |
//! | `SEED_DEMO_DATA` | Seed demo users and wallets at startup | `false` |

use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use thiserror::Error;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const TOKEN_TTL_SECS_ENV: &str = "TOKEN_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const USE_MOCKS_ENV: &str = "XUPAY_USE_MOCKS";
pub const USER_SERVICE_URL_ENV: &str = "USER_SERVICE_URL";
pub const PAYMENT_SERVICE_URL_ENV: &str = "PAYMENT_SERVICE_URL";
pub const REQUEST_TIMEOUT_SECS_ENV: &str = "REQUEST_TIMEOUT_SECS";
pub const IDEMPOTENCY_CACHE_CAPACITY_ENV: &str = "IDEMPOTENCY_CACHE_CAPACITY";
pub const IDEMPOTENCY_CACHE_TTL_SECS_ENV: &str = "IDEMPOTENCY_CACHE_TTL_SECS";
pub const FRAUD_BLOCKLIST_ENV: &str = "FRAUD_BLOCKLIST";
pub const SEED_DEMO_DATA_ENV: &str = "SEED_DEMO_DATA";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
pub const DEFAULT_USER_SERVICE_URL: &str = "http://localhost:8081";
pub const DEFAULT_PAYMENT_SERVICE_URL: &str = "http://localhost:8082";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_IDEMPOTENCY_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_IDEMPOTENCY_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Secret used when `JWT_SECRET` is unset. Only suitable for local runs.
pub const DEV_JWT_SECRET: &str = "xupay-dev-secret-change-me";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match env::var(LOG_FORMAT_ENV).as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Settings for the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub idempotency_cache_capacity: usize,
    pub idempotency_cache_ttl: Duration,
    /// Sender IDs or client IPs whose transfers are always blocked by fraud rules.
    pub fraud_blocklist: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            idempotency_cache_capacity: DEFAULT_IDEMPOTENCY_CACHE_CAPACITY,
            idempotency_cache_ttl: Duration::from_secs(DEFAULT_IDEMPOTENCY_CACHE_TTL_SECS),
            fraud_blocklist: Vec::new(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub log_format: LogFormat,
    pub store: StoreConfig,
    pub seed_demo_data: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var(HOST_ENV).unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port: u16 = parse_env(PORT_ENV, "port number", DEFAULT_PORT)?;
        let bind_addr = SocketAddr::from_str(&format!("{host}:{port}")).map_err(|_| {
            ConfigError::Invalid {
                name: HOST_ENV,
                expected: "bind address",
                value: host.clone(),
            }
        })?;

        let jwt_secret = match env::var(JWT_SECRET_ENV) {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                tracing::warn!("{JWT_SECRET_ENV} not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            token_ttl: Duration::from_secs(parse_env(
                TOKEN_TTL_SECS_ENV,
                "number of seconds",
                DEFAULT_TOKEN_TTL_SECS,
            )?),
            log_format: LogFormat::from_env(),
            store: StoreConfig {
                idempotency_cache_capacity: parse_env(
                    IDEMPOTENCY_CACHE_CAPACITY_ENV,
                    "cache capacity",
                    DEFAULT_IDEMPOTENCY_CACHE_CAPACITY,
                )?,
                idempotency_cache_ttl: Duration::from_secs(parse_env(
                    IDEMPOTENCY_CACHE_TTL_SECS_ENV,
                    "number of seconds",
                    DEFAULT_IDEMPOTENCY_CACHE_TTL_SECS,
                )?),
                fraud_blocklist: parse_list(env::var(FRAUD_BLOCKLIST_ENV).ok().as_deref()),
            },
            seed_demo_data: parse_flag(env::var(SEED_DEMO_DATA_ENV).ok().as_deref()),
        })
    }
}

/// Settings used to build the default service clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub use_mocks: bool,
    pub user_service_url: String,
    pub payment_service_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            use_mocks: false,
            user_service_url: DEFAULT_USER_SERVICE_URL.to_string(),
            payment_service_url: DEFAULT_PAYMENT_SERVICE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            use_mocks: parse_flag(env::var(USE_MOCKS_ENV).ok().as_deref()),
            user_service_url: env::var(USER_SERVICE_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_USER_SERVICE_URL.to_string()),
            payment_service_url: env::var(PAYMENT_SERVICE_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_PAYMENT_SERVICE_URL.to_string()),
            request_timeout: Duration::from_secs(parse_env(
                REQUEST_TIMEOUT_SECS_ENV,
                "number of seconds",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        })
    }
}

fn parse_env<T: FromStr>(name: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_value(name, expected, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &'static str, expected: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: raw.to_string(),
    })
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_accepts_common_truthy_values() {
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some(" YES ")));
        assert!(parse_flag(Some("1")));
        assert!(!parse_flag(Some("false")));
        assert!(!parse_flag(Some("")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn parse_list_skips_blanks() {
        assert_eq!(parse_list(Some("a, b,,c ")), vec!["a", "b", "c"]);
        assert!(parse_list(None).is_empty());
    }

    #[test]
    fn parse_value_reports_variable_name() {
        let err = parse_value::<u16>(PORT_ENV, "port number", "eighty").unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"PORT must be a valid port number, got "eighty""#
        );
        assert_eq!(parse_value::<u16>(PORT_ENV, "port number", " 8080 "), Ok(8080));
    }

    #[test]
    fn client_config_defaults() {
        let config = ClientConfig::default();
        assert!(!config.use_mocks);
        assert_eq!(config.user_service_url, "http://localhost:8081");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
