//! Environment-driven configuration.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Tuning knobs for the import pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    /// Normalized cards per processing chunk.
    pub chunk_size: usize,
    /// Chunks processed at once.
    pub max_concurrency: usize,
    /// Keys per existing-card lookup round-trip.
    pub prefetch_chunk_size: usize,
    /// Search terms per resolution request.
    pub resolution_batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            max_concurrency: 4,
            prefetch_chunk_size: 100,
            resolution_batch_size: 50,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub scheduler: String,
    pub desired_retention: f64,
    pub import: ImportConfig,
}

impl AppConfig {
    /// Load from the process environment (after `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let defaults = ImportConfig::default();

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            scheduler: lookup("SCHEDULER").unwrap_or_else(|| "fsrs".to_string()),
            desired_retention: parse_or(&lookup, "FSRS_DESIRED_RETENTION", 0.9)?,
            import: ImportConfig {
                chunk_size: positive(
                    parse_or(&lookup, "IMPORT_CHUNK_SIZE", defaults.chunk_size)?,
                    "IMPORT_CHUNK_SIZE",
                )?,
                max_concurrency: positive(
                    parse_or(&lookup, "IMPORT_MAX_CONCURRENCY", defaults.max_concurrency)?,
                    "IMPORT_MAX_CONCURRENCY",
                )?,
                prefetch_chunk_size: positive(
                    parse_or(&lookup, "PREFETCH_CHUNK_SIZE", defaults.prefetch_chunk_size)?,
                    "PREFETCH_CHUNK_SIZE",
                )?,
                resolution_batch_size: positive(
                    parse_or(&lookup, "RESOLUTION_BATCH_SIZE", defaults.resolution_batch_size)?,
                    "RESOLUTION_BATCH_SIZE",
                )?,
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn positive(value: usize, name: &'static str) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}
