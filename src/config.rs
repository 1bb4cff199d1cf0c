//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::handlers::ServiceSettings;
use crate::jobs::JobSchedulerConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Time-to-live of a per-product write lock
    pub lock_ttl: Duration,

    /// How often expired locks are swept
    pub lock_sweep_interval: Duration,

    /// Acquisition attempts before a write reports lock contention
    pub lock_retry_attempts: u32,

    /// Base backoff between acquisition attempts (multiplied by attempt number)
    pub lock_retry_backoff: Duration,

    /// Maximum concurrent items per batch request
    pub batch_concurrency: usize,

    /// Per-event-type publisher channel capacity
    pub publisher_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_var("PORT", 3000)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let lock_ttl = Duration::from_millis(positive_var("LOCK_TTL_MS", 10_000)?);
        let lock_sweep_interval = Duration::from_millis(positive_var("LOCK_SWEEP_INTERVAL_MS", 100)?);
        let lock_retry_attempts = positive_var("LOCK_RETRY_ATTEMPTS", 3)?;
        let lock_retry_backoff = Duration::from_millis(parse_var("LOCK_RETRY_BACKOFF_MS", 50)?);
        let batch_concurrency = positive_var("BATCH_CONCURRENCY", 16)?;
        let publisher_capacity = positive_var("PUBLISHER_CAPACITY", 256)?;

        Ok(Self {
            host,
            port,
            environment,
            lock_ttl,
            lock_sweep_interval,
            lock_retry_attempts,
            lock_retry_backoff,
            batch_concurrency,
            publisher_capacity,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Write-path settings for the product service
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            lock_ttl: self.lock_ttl,
            lock_retry_attempts: self.lock_retry_attempts,
            lock_retry_backoff: self.lock_retry_backoff,
            batch_concurrency: self.batch_concurrency,
        }
    }

    pub fn scheduler_config(&self) -> JobSchedulerConfig {
        JobSchedulerConfig {
            lock_sweep_interval: self.lock_sweep_interval,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "development".to_string(),
            lock_ttl: Duration::from_secs(10),
            lock_sweep_interval: Duration::from_millis(100),
            lock_retry_attempts: 3,
            lock_retry_backoff: Duration::from_millis(50),
            batch_concurrency: 16,
            publisher_capacity: 256,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

fn positive_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let value = parse_var(name, default)?;
    if value <= T::default() {
        return Err(ConfigError::NotPositive(name));
    }
    Ok(value)
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),

    #[error("Environment variable must be greater than zero: {0}")]
    NotPositive(&'static str),
}
