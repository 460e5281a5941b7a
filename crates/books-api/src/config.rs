//! # API Configuration
//!
//! Environment-based configuration for the API service. Every setting has a
//! default except `SECRET_KEY`; values that fail to parse are rejected at
//! startup instead of silently falling back.

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use books_persistence::{AuditConfig, DatabaseConfig, RetryPolicy};
use books_pipeline::PipelineConfig;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,

    /// Free-form deployment name reported by the health check
    pub environment: String,

    /// Expose internal error messages in responses
    pub debug: bool,

    /// Server bind address
    pub server_addr: SocketAddr,

    pub database: DatabaseSettings,

    /// Retry budget for request-path storage work
    pub retry: RetryPolicy,

    pub audit: AuditSettings,

    /// Requests running longer than this are cancelled with 408
    pub request_timeout: Duration,

    pub auth: AuthSettings,

    /// CORS allowed origins (`*` allows any)
    pub allowed_origins: Vec<String>,

    pub admin: AdminSettings,

    pub pipeline: PipelineSettings,

    /// Time-to-live of cached statistics
    pub stats_cache_ttl: Duration,

    /// Logging level used when `RUST_LOG` is not set
    pub log_level: String,
}

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
}

/// Background audit logger configuration
#[derive(Debug, Clone, Copy)]
pub struct AuditSettings {
    pub queue_capacity: usize,
    pub settle_delay: Duration,
    pub max_attempts: u32,
}

/// Token and password hashing configuration
#[derive(Clone)]
pub struct AuthSettings {
    pub secret_key: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// bcrypt cost factor
    pub password_hash_cost: u32,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret_key", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("password_hash_cost", &self.password_hash_cost)
            .finish()
    }
}

/// Administrator account created at startup
#[derive(Clone)]
pub struct AdminSettings {
    pub username: String,
    pub email: String,
    /// Seeding is skipped when unset
    pub password: Option<String>,
}

impl std::fmt::Debug for AdminSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSettings")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Scrape/import pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub csv_path: PathBuf,
    /// External scraper command line; the scrape step fails when unset
    pub scraper_command: Option<String>,
    pub scrape_timeout: Duration,
    pub import_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if `SECRET_KEY` is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if `SECRET_KEY` is missing or a value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let secret_key = vars
            .string("SECRET_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("SECRET_KEY"))?;

        let backoff_factor = vars.parse("RETRY_BACKOFF_FACTOR", 2_u32)?;
        let retry = RetryPolicy::new(
            vars.parse("RETRY_MAX_ATTEMPTS", 3_u32)?.max(1),
            Duration::from_millis(vars.parse("RETRY_INITIAL_DELAY_MS", 100_u64)?),
            backoff_factor.max(1),
        );

        Ok(Self {
            app_name: vars.string_or("APP_NAME", "Book Recommendation API"),
            environment: vars.string_or("ENVIRONMENT", "development"),
            debug: vars.flag("DEBUG", false)?,
            server_addr: vars.parse("SERVER_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,

            database: DatabaseSettings {
                url: vars.string_or("DATABASE_URL", "data/books.db"),
                max_connections: vars.parse("DB_MAX_CONNECTIONS", 20_u32)?,
                min_connections: vars.parse("DB_MIN_CONNECTIONS", 2_u32)?,
                acquire_timeout: Duration::from_millis(
                    vars.parse("DB_ACQUIRE_TIMEOUT_MS", 30_000_u64)?,
                ),
                busy_timeout: Duration::from_millis(vars.parse("DB_BUSY_TIMEOUT_MS", 30_000_u64)?),
            },

            retry,

            audit: AuditSettings {
                queue_capacity: vars.parse("AUDIT_QUEUE_CAPACITY", 1024_usize)?,
                settle_delay: Duration::from_millis(vars.parse("AUDIT_SETTLE_DELAY_MS", 50_u64)?),
                max_attempts: vars.parse("AUDIT_MAX_ATTEMPTS", 2_u32)?.max(1),
            },

            request_timeout: Duration::from_secs(vars.parse("REQUEST_TIMEOUT_SECS", 30_u64)?),

            auth: AuthSettings {
                secret_key,
                access_token_ttl: Duration::from_secs(
                    vars.parse("ACCESS_TOKEN_EXPIRE_MINUTES", 30_u64)? * 60,
                ),
                refresh_token_ttl: Duration::from_secs(
                    vars.parse("REFRESH_TOKEN_EXPIRE_DAYS", 7_u64)? * 24 * 60 * 60,
                ),
                password_hash_cost: vars.parse("PASSWORD_HASH_COST", bcrypt::DEFAULT_COST)?,
            },

            allowed_origins: vars
                .string_or("ALLOWED_ORIGINS", "*")
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),

            admin: AdminSettings {
                username: vars.string_or("ADMIN_USERNAME", "admin"),
                email: vars.string_or("ADMIN_EMAIL", "admin@example.com"),
                password: vars.string("ADMIN_PASSWORD").filter(|p| !p.is_empty()),
            },

            pipeline: PipelineSettings {
                csv_path: PathBuf::from(vars.string_or("BOOKS_CSV_PATH", "data/books.csv")),
                scraper_command: vars
                    .string("SCRAPER_COMMAND")
                    .filter(|c| !c.trim().is_empty()),
                scrape_timeout: Duration::from_secs(vars.parse("SCRAPE_TIMEOUT_SECS", 300_u64)?),
                import_timeout: Duration::from_secs(vars.parse("IMPORT_TIMEOUT_SECS", 120_u64)?),
            },

            stats_cache_ttl: Duration::from_secs(vars.parse("STATS_CACHE_TTL_SECS", 300_u64)?),

            log_level: vars.string_or("LOG_LEVEL", "info"),
        })
    }

    /// Connection pool settings for [`Database::connect`](books_persistence::Database::connect)
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database.url)
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .acquire_timeout(self.database.acquire_timeout)
            .busy_timeout(self.database.busy_timeout)
    }

    /// The request retry policy with the audit logger's attempt budget
    pub fn audit_config(&self) -> AuditConfig {
        AuditConfig::default()
            .queue_capacity(self.audit.queue_capacity)
            .settle_delay(self.audit.settle_delay)
            .retry(RetryPolicy::new(
                self.audit.max_attempts,
                self.retry.initial_delay,
                self.retry.backoff_factor,
            ))
    }

    pub const fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            scrape_timeout: self.pipeline.scrape_timeout,
            import_timeout: self.pipeline.import_timeout,
        }
    }

    /// Whether `ALLOWED_ORIGINS` permits any origin
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

// =============================================================================
// PARSING HELPERS
// =============================================================================

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.string(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.string(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: key,
                reason: format!("'{raw}': {e}"),
            }),
        }
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.string(key).as_deref().map(str::trim) {
            None => Ok(default),
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" || v == "yes" => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" || v == "no" || v.is_empty() => {
                Ok(false)
            }
            Some(v) => Err(ConfigError::Invalid {
                var: key,
                reason: format!("'{v}' is not a boolean"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("SECRET_KEY", "s3cret")]).unwrap();

        assert_eq!(config.app_name, "Book Recommendation API");
        assert_eq!(config.server_addr.port(), 8000);
        assert!(!config.debug);
        assert_eq!(config.database.url, "data/books.db");
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.busy_timeout, Duration::from_secs(30));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.audit.max_attempts, 2);
        assert_eq!(config.auth.access_token_ttl, Duration::from_secs(30 * 60));
        assert_eq!(config.auth.refresh_token_ttl, Duration::from_secs(7 * 86_400));
        assert_eq!(config.pipeline.scrape_timeout, Duration::from_secs(300));
        assert!(config.pipeline.scraper_command.is_none());
        assert!(config.admin.password.is_none());
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_secret_key_required() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("SECRET_KEY"));
        assert_eq!(
            load(&[("SECRET_KEY", "  ")]).unwrap_err(),
            ConfigError::Missing("SECRET_KEY")
        );
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SECRET_KEY", "s3cret"),
            ("DEBUG", "true"),
            ("DATABASE_URL", "sqlite:///tmp/catalog.db"),
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("RETRY_INITIAL_DELAY_MS", "10"),
            ("AUDIT_MAX_ATTEMPTS", "1"),
            ("ALLOWED_ORIGINS", "http://localhost:3000, http://localhost:5173"),
            ("SCRAPER_COMMAND", "python scripts/scraping.py"),
        ])
        .unwrap();

        assert!(config.debug);
        assert_eq!(
            config.database_config().database_path,
            PathBuf::from("/tmp/catalog.db")
        );
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(10));
        assert_eq!(config.audit_config().retry.max_attempts, 1);
        assert_eq!(config.allowed_origins.len(), 2);
        assert!(!config.allows_any_origin());
        assert_eq!(
            config.pipeline.scraper_command.as_deref(),
            Some("python scripts/scraping.py")
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = load(&[("SECRET_KEY", "s3cret"), ("DB_BUSY_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DB_BUSY_TIMEOUT_MS", .. }));

        let err = load(&[("SECRET_KEY", "s3cret"), ("DEBUG", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DEBUG", .. }));
    }
}
