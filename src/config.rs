// ⚙️ Configuration - daemon settings from environment variables
//
// The four Notion values are required and the process refuses to start
// without them. Everything else has a default matching the polling cadence
// the job has always run with (5s ticks, 10 attempts, 5s between attempts).

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STATUS_ADDR: &str = "127.0.0.1:3000";

const REQUIRED_VARS: [&str; 4] = ["NOTION_TOKEN", "DATABASE_1", "DATABASE_2", "DATABASE_3"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable(s): {0}. Notion token or database IDs not found, re-check the values")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Bounded-retry settings applied to each pass independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total invocations allowed per pass per tick (first try included).
    pub max_attempts: u32,
    /// Fixed pause between two attempts.
    pub delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub notion_token: String,
    /// "Transactions" database (DATABASE_1)
    pub transactions_database_id: String,
    /// "Month" database (DATABASE_2)
    pub months_database_id: String,
    /// "Category" database (DATABASE_3)
    pub categories_database_id: String,

    pub api_base_url: String,
    pub notion_version: String,
    pub request_timeout: Duration,

    pub tick_interval: Duration,
    pub retry: RetrySettings,

    /// Re-read a transaction before writing its Category relation
    pub recheck_category_before_write: bool,
    pub category_names_file: Option<PathBuf>,
    pub status_addr: String,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVar(missing.join(", ")));
        }

        let notion_token = get("NOTION_TOKEN").unwrap_or_default();
        let transactions_database_id = parse_database_id("DATABASE_1", get("DATABASE_1"))?;
        let months_database_id = parse_database_id("DATABASE_2", get("DATABASE_2"))?;
        let categories_database_id = parse_database_id("DATABASE_3", get("DATABASE_3"))?;

        let max_attempts = parse_number("SYNC_MAX_ATTEMPTS", get("SYNC_MAX_ATTEMPTS"), DEFAULT_MAX_ATTEMPTS as u64)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var: "SYNC_MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let max_attempts = u32::try_from(max_attempts).map_err(|_| ConfigError::InvalidValue {
            var: "SYNC_MAX_ATTEMPTS".to_string(),
            message: format!("{max_attempts} is too large"),
        })?;

        let tick_secs = parse_number(
            "SYNC_TICK_INTERVAL_SECS",
            get("SYNC_TICK_INTERVAL_SECS"),
            DEFAULT_TICK_INTERVAL_SECS,
        )?;
        if tick_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "SYNC_TICK_INTERVAL_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Config {
            notion_token,
            transactions_database_id,
            months_database_id,
            categories_database_id,
            api_base_url: get("NOTION_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            notion_version: get("NOTION_VERSION").unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
            request_timeout: Duration::from_secs(parse_number(
                "NOTION_TIMEOUT_SECS",
                get("NOTION_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?),
            tick_interval: Duration::from_secs(tick_secs),
            retry: RetrySettings {
                max_attempts,
                delay: Duration::from_secs(parse_number(
                    "SYNC_RETRY_DELAY_SECS",
                    get("SYNC_RETRY_DELAY_SECS"),
                    DEFAULT_RETRY_DELAY_SECS,
                )?),
            },
            recheck_category_before_write: parse_bool("SYNC_CATEGORY_RECHECK", get("SYNC_CATEGORY_RECHECK"))?,
            category_names_file: get("CATEGORY_NAMES_FILE").map(PathBuf::from),
            status_addr: get("STATUS_ADDR").unwrap_or_else(|| DEFAULT_STATUS_ADDR.to_string()),
        })
    }
}

/// Notion accepts ids with or without dashes; keep the dashed form.
fn parse_database_id(var: &str, value: Option<String>) -> Result<String, ConfigError> {
    let raw = value.ok_or_else(|| ConfigError::MissingVar(var.to_string()))?;
    uuid::Uuid::parse_str(&raw)
        .map(|id| id.hyphenated().to_string())
        .map_err(|e| ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("{raw:?} is not a database id: {e}"),
        })
}

fn parse_number(var: &str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected a whole number, got {raw:?}"),
        }),
    }
}

fn parse_bool(var: &str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected true/false, got {other:?}"),
        }),
    }
}
