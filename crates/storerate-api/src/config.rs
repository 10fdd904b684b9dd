//! Server configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use storerate_core::retry::RetryPolicy;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::AppError;

/// Everything the composition root needs to start the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    pub retry: RetryPolicy,
    pub run_migrations: bool,
    pub otlp_endpoint: Option<String>,
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw:?}"))),
        None => Ok(default),
    }
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Config("DATABASE_URL must be set".to_owned()))?;

        let max_attempts: u32 = parse_or(&lookup, "STORAGE_RETRY_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(AppError::Config(
                "STORAGE_RETRY_ATTEMPTS must be at least 1".to_owned(),
            ));
        }
        let backoff_ms: u64 = parse_or(&lookup, "STORAGE_RETRY_BACKOFF_MS", 50)?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse_or(&lookup, "PORT", 3000)?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                5,
            )?),
            cors_allowed_origins,
            retry: RetryPolicy {
                max_attempts,
                backoff: Duration::from_millis(backoff_ms),
            },
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", true)?,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.trim().is_empty()),
        })
    }

    /// The address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| AppError::Config(format!("HOST has an invalid value: {:?}", self.host)))
    }

    /// CORS policy: permissive when no origins are configured.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an origin is not a valid header value.
    pub fn cors_layer(&self) -> Result<CorsLayer, AppError> {
        if self.cors_allowed_origins.is_empty() {
            return Ok(CorsLayer::permissive());
        }
        let origins = self
            .cors_allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| {
                    AppError::Config(format!("CORS_ALLOWED_ORIGINS has an invalid origin: {origin:?}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any))
    }
}
