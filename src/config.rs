// src/config.rs
use crate::market::baseline::BaselineConfig;
use crate::market::reports::ReportConfig;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

/// Startup configuration failure; the process exits instead of serving.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {raw:?} ({reason})")]
    Invalid {
        key: &'static str,
        raw: String,
        reason: String,
    },
}

/// Process-level settings. Every field can be overridden from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub schema_path: String,
    pub bind_addr: SocketAddr,
    pub max_workers: usize,
    /// SQLite busy timeout, applied to every connection.
    pub busy_timeout_ms: u64,
    pub baseline: BaselineConfig,
    pub reports: ReportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "mandi.sqlite3".to_string(),
            schema_path: "sql/schema.sql".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_workers: 8,
            busy_timeout_ms: 5_000,
            baseline: BaselineConfig::default(),
            reports: ReportConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            db_path: lookup("MANDI_DB_PATH").unwrap_or(defaults.db_path),
            schema_path: lookup("MANDI_SCHEMA_PATH").unwrap_or(defaults.schema_path),
            bind_addr: parse_or(&lookup, "MANDI_BIND_ADDR", defaults.bind_addr)?,
            max_workers: parse_or(&lookup, "MANDI_MAX_WORKERS", defaults.max_workers)?,
            busy_timeout_ms: parse_or(&lookup, "MANDI_BUSY_TIMEOUT_MS", defaults.busy_timeout_ms)?,
            baseline: BaselineConfig {
                std_dev_multiplier: parse_or(
                    &lookup,
                    "MANDI_STDDEV_MULTIPLIER",
                    defaults.baseline.std_dev_multiplier,
                )?,
                max_deviation_percent: parse_or(
                    &lookup,
                    "MANDI_MAX_DEVIATION_PERCENT",
                    defaults.baseline.max_deviation_percent,
                )?,
            },
            reports: ReportConfig {
                retract_sample_on_reset: parse_or(
                    &lookup,
                    "MANDI_RETRACT_ON_RESET",
                    defaults.reports.retract_sample_on_reset,
                )?,
                utc_offset_minutes: parse_or(
                    &lookup,
                    "MANDI_UTC_OFFSET_MINUTES",
                    defaults.reports.utc_offset_minutes,
                )?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                raw,
            }),
    }
}
