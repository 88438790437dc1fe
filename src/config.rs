use std::env;
use anyhow::{bail, Context, Result};

use crate::auth::MIN_TOKEN_LEN;

/// Default cap on kvman request bodies, large enough for a full export
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Which key-value store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Spanner,
}

/// Spanner connection settings, only present for the spanner backend
#[derive(Debug, Clone)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth_token: String,
    pub backend: StoreBackend,
    pub spanner: Option<SpannerConfig>,
    pub max_body_bytes: usize,
    pub service_port: u16,
    pub service_host: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_token = lookup("KVMAN_AUTH_TOKEN")
            .context("KVMAN_AUTH_TOKEN environment variable is required")?;
        if auth_token.chars().count() < MIN_TOKEN_LEN {
            bail!("KVMAN_AUTH_TOKEN must be at least {} characters", MIN_TOKEN_LEN);
        }

        let backend = match lookup("KV_BACKEND").as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("spanner") => StoreBackend::Spanner,
            Some(other) => bail!("KV_BACKEND must be 'memory' or 'spanner', got '{}'", other),
        };

        let spanner = match backend {
            StoreBackend::Memory => None,
            StoreBackend::Spanner => Some(SpannerConfig {
                emulator_host: lookup("SPANNER_EMULATOR_HOST"),
                project: lookup("SPANNER_PROJECT")
                    .context("SPANNER_PROJECT environment variable is required")?,
                instance: lookup("SPANNER_INSTANCE")
                    .context("SPANNER_INSTANCE environment variable is required")?,
                database: lookup("SPANNER_DATABASE")
                    .context("SPANNER_DATABASE environment variable is required")?,
            }),
        };

        let max_body_bytes = match lookup("KVMAN_MAX_BODY_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .context("KVMAN_MAX_BODY_BYTES must be a byte count")?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let service_port = lookup("SERVICE_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = lookup("SERVICE_HOST")
            .unwrap_or_else(|| "0.0.0.0".to_string());

        Ok(Config {
            auth_token,
            backend,
            spanner,
            max_body_bytes,
            service_port,
            service_host,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Store backend: {:?}", self.backend);
        if let Some(spanner) = &self.spanner {
            tracing::info!("  Spanner emulator: {}",
                spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
            tracing::info!("  Spanner project: {}", spanner.project);
            tracing::info!("  Spanner instance: {}", spanner.instance);
            tracing::info!("  Spanner database: {}", spanner.database);
        }
        tracing::info!("  Max request body: {} bytes", self.max_body_bytes);
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}
