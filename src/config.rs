use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::{CalendarPolicy, DEFAULT_CAPACITIES, DEFAULT_WEEKLY_QUOTA, Granularity};

/// Server and policy settings, read from `FOODSLOT_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub data_dir: PathBuf,
    pub max_connections: usize,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
    pub granularity: Granularity,
    pub policy: CalendarPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take their defaults; set but
    /// malformed keys are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let capacities = match lookup("FOODSLOT_CAPACITY") {
            Some(raw) => parse_capacities(&raw)?,
            None => DEFAULT_CAPACITIES,
        };
        let weekly_quota = parse_or(&lookup, "FOODSLOT_WEEKLY_QUOTA", DEFAULT_WEEKLY_QUOTA)?;

        Ok(Self {
            port: parse_or(&lookup, "FOODSLOT_PORT", 5433)?,
            bind: lookup("FOODSLOT_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            data_dir: lookup("FOODSLOT_DATA_DIR")
                .unwrap_or_else(|| "./data".into())
                .into(),
            max_connections: parse_or(&lookup, "FOODSLOT_MAX_CONNECTIONS", 256)?,
            compact_threshold: parse_or(&lookup, "FOODSLOT_COMPACT_THRESHOLD", 1000)?,
            metrics_port: match lookup("FOODSLOT_METRICS_PORT") {
                Some(raw) => Some(parse_value("FOODSLOT_METRICS_PORT", &raw)?),
                None => None,
            },
            granularity: parse_or(&lookup, "FOODSLOT_GRANULARITY", Granularity::default())?,
            policy: CalendarPolicy::new(capacities, weekly_quota),
        })
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("reservations.wal")
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

/// Seven comma-separated capacities, Monday first.
fn parse_capacities(raw: &str) -> Result<[u32; 7], ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: "FOODSLOT_CAPACITY",
        value: raw.to_string(),
        reason,
    };
    let values = raw
        .split(',')
        .map(|part| parse_value::<u32>("FOODSLOT_CAPACITY", part))
        .collect::<Result<Vec<_>, _>>()?;
    <[u32; 7]>::try_from(values)
        .map_err(|v| invalid(format!("expected 7 values (Mon..Sun), got {}", v.len())))
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { key, value, reason } => {
                write!(f, "invalid {key}={value:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
