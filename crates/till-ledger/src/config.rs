//! Ledger configuration.
//!
//! Loaded from environment variables with fallback to defaults, or built in
//! code with the builder methods.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Tunables shared by every ledger component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Fixed offset of the shop's civil day from UTC, in minutes
    pub utc_offset_minutes: i32,

    /// Insert attempts per append before giving up (default: 2, one retry)
    pub max_allocation_attempts: u32,

    /// Reject ledger writes to closed days
    pub enforce_closed_days: bool,

    /// Upper bound on a listing page
    pub max_page_size: u32,

    /// Longest range a report may span, in days
    pub max_range_days: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            utc_offset_minutes: 0,
            max_allocation_attempts: 2,
            enforce_closed_days: false,
            max_page_size: 200,
            max_range_days: 366,
        }
    }
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LedgerConfig::default();
        let config = LedgerConfig {
            utc_offset_minutes: parse_or(
                &lookup,
                "TILL_UTC_OFFSET_MINUTES",
                defaults.utc_offset_minutes,
            )?,
            max_allocation_attempts: parse_or(
                &lookup,
                "TILL_MAX_ALLOCATION_ATTEMPTS",
                defaults.max_allocation_attempts,
            )?,
            enforce_closed_days: parse_or(
                &lookup,
                "TILL_ENFORCE_CLOSED_DAYS",
                defaults.enforce_closed_days,
            )?,
            max_page_size: parse_or(&lookup, "TILL_MAX_PAGE_SIZE", defaults.max_page_size)?,
            max_range_days: parse_or(&lookup, "TILL_MAX_RANGE_DAYS", defaults.max_range_days)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).is_none() {
            return Err(ConfigError::InvalidValue("TILL_UTC_OFFSET_MINUTES".to_string()));
        }
        if self.max_allocation_attempts == 0 {
            return Err(ConfigError::InvalidValue("TILL_MAX_ALLOCATION_ATTEMPTS".to_string()));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::InvalidValue("TILL_MAX_PAGE_SIZE".to_string()));
        }
        if self.max_range_days < 1 {
            return Err(ConfigError::InvalidValue("TILL_MAX_RANGE_DAYS".to_string()));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Builder
    // -------------------------------------------------------------------------

    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn max_allocation_attempts(mut self, attempts: u32) -> Self {
        self.max_allocation_attempts = attempts.max(1);
        self
    }

    pub fn enforce_closed_days(mut self, enforce: bool) -> Self {
        self.enforce_closed_days = enforce;
        self
    }

    pub fn max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size.max(1);
        self
    }

    pub fn max_range_days(mut self, days: i64) -> Self {
        self.max_range_days = days.max(1);
        self
    }

    // -------------------------------------------------------------------------
    // Civil time
    // -------------------------------------------------------------------------

    /// The shop's offset from UTC. Out-of-range values fall back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// The civil date `now` falls on at the shop.
    pub fn civil_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.utc_offset()).date_naive()
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
