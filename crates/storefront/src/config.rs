//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; only required when `STOREFRONT_STORE=postgres`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_STORE` - `postgres` or `memory` (default: postgres)
//! - `STOREFRONT_SEED_FILE` - YAML catalog loaded into the memory store at startup
//! - `STOREFRONT_BRAND_MATCH` - `exact` or `contains` (default: exact)
//! - `STOREFRONT_POPULAR_LIMIT` - Number of popular products (default: 6)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::models::BrandMatch;
use crate::services::catalog::DEFAULT_POPULAR_LIMIT;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where catalog, carts and orders are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Postgres,
    /// In-process store, for local demos. Data is lost on restart.
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    pub store: StoreKind,
    /// Seed loaded into the memory store at startup
    pub seed_file: Option<PathBuf>,
    /// How the `brand` catalog filter compares names
    pub brand_match: BrandMatch,
    /// Number of products returned by the popular listing
    pub popular_limit: i64,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let store: StoreKind = env.parse_or("STOREFRONT_STORE", "postgres")?;
        let database_url = match env.database_url("STOREFRONT_DATABASE_URL") {
            Some(url) => Some(url),
            None if store == StoreKind::Postgres => {
                return Err(ConfigError::MissingEnvVar(
                    "STOREFRONT_DATABASE_URL".to_string(),
                ));
            }
            None => None,
        };

        let base_url = env.required("STOREFRONT_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let popular_limit: i64 = env.parse_or(
            "STOREFRONT_POPULAR_LIMIT",
            &DEFAULT_POPULAR_LIMIT.to_string(),
        )?;
        if popular_limit < 1 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_POPULAR_LIMIT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host: env.parse_or("STOREFRONT_HOST", "127.0.0.1")?,
            port: env.parse_or("STOREFRONT_PORT", "3000")?,
            base_url,
            store,
            seed_file: env.optional("STOREFRONT_SEED_FILE").map(PathBuf::from),
            brand_match: env.parse_or("STOREFRONT_BRAND_MATCH", "exact")?,
            popular_limit,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parse_or("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: env.parse_or("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Parse a variable, using `default` when it is unset.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.optional(key).unwrap_or_else(|| default.to_string());
        value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
    fn database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("STOREFRONT_DATABASE_URL", "postgres://localhost/furnish"),
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
        ])
        .unwrap();

        assert_eq!(config.store, StoreKind::Postgres);
        assert_eq!(config.brand_match, BrandMatch::Exact);
        assert_eq!(config.popular_limit, 6);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(!config.secure_cookies());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_database_url_falls_back_to_generic_var() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fly/furnish"),
            ("STOREFRONT_BASE_URL", "https://furnish.example"),
        ])
        .unwrap();

        let url = config.database_url.as_ref().unwrap();
        assert_eq!(url.expose_secret(), "postgres://fly/furnish");
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = load(&[("STOREFRONT_BASE_URL", "http://localhost:3000")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "STOREFRONT_DATABASE_URL"));
    }

    #[test]
    fn test_memory_store_needs_no_database() {
        let config = load(&[
            ("STOREFRONT_STORE", "memory"),
            ("STOREFRONT_SEED_FILE", "catalog.yaml"),
            ("STOREFRONT_BRAND_MATCH", "contains"),
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
        ])
        .unwrap();

        assert_eq!(config.store, StoreKind::Memory);
        assert!(config.database_url.is_none());
        assert_eq!(config.seed_file, Some(PathBuf::from("catalog.yaml")));
        assert_eq!(config.brand_match, BrandMatch::Contains);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = load(&[
            ("STOREFRONT_STORE", "memory"),
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STOREFRONT_PORT"));

        let err = load(&[
            ("STOREFRONT_STORE", "memory"),
            ("STOREFRONT_BASE_URL", "not a url"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STOREFRONT_BASE_URL"));

        let err = load(&[
            ("STOREFRONT_STORE", "memory"),
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_POPULAR_LIMIT", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STOREFRONT_POPULAR_LIMIT"));
    }
}
