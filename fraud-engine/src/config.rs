//! Configuration for the fraud engine

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Longest accepted correlation window: one leap year
pub const MAX_WINDOW_SECONDS: i64 = 366 * 24 * 60 * 60;

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default per-card limits
    pub limits: LimitsConfig,

    /// History correlation settings
    pub correlation: CorrelationConfig,
}

/// Limits handed to a card on its first transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Initial upper bound for automatic approval
    pub default_allow_bound: u64,

    /// Initial upper bound for manual review
    pub default_manual_bound: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_allow_bound: 200,
            default_manual_bound: 1500,
        }
    }
}

/// History correlation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Trailing window length (seconds)
    pub window_seconds: i64,

    /// Distinct regions/IPs that send a transaction to manual review
    pub review_threshold: usize,

    /// Distinct regions/IPs that prohibit a transaction
    pub prohibit_threshold: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            window_seconds: 3600,
            review_threshold: 2,
            prohibit_threshold: 3,
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file; missing sections and keys fall back to defaults
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `ANTIFRAUD_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = EngineConfig::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `ANTIFRAUD_*` environment overrides in place
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_number("ANTIFRAUD_ALLOW_BOUND")? {
            self.limits.default_allow_bound = v;
        }
        if let Some(v) = env_number("ANTIFRAUD_MANUAL_BOUND")? {
            self.limits.default_manual_bound = v;
        }
        if let Some(v) = env_number("ANTIFRAUD_WINDOW_SECONDS")? {
            self.correlation.window_seconds = v;
        }
        if let Some(v) = env_number("ANTIFRAUD_REVIEW_THRESHOLD")? {
            self.correlation.review_threshold = v;
        }
        if let Some(v) = env_number("ANTIFRAUD_PROHIBIT_THRESHOLD")? {
            self.correlation.prohibit_threshold = v;
        }
        self.validate()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.limits.default_allow_bound >= self.limits.default_manual_bound {
            return Err(Error::InvalidConfig(format!(
                "default_allow_bound {} must be below default_manual_bound {}",
                self.limits.default_allow_bound, self.limits.default_manual_bound
            )));
        }
        if self.correlation.window_seconds <= 0
            || self.correlation.window_seconds > MAX_WINDOW_SECONDS
        {
            return Err(Error::InvalidConfig(format!(
                "correlation window {}s must be within 1..={}s",
                self.correlation.window_seconds, MAX_WINDOW_SECONDS
            )));
        }
        if self.correlation.review_threshold < 2
            || self.correlation.review_threshold >= self.correlation.prohibit_threshold
        {
            return Err(Error::InvalidConfig(format!(
                "need 2 <= review_threshold ({}) < prohibit_threshold ({})",
                self.correlation.review_threshold, self.correlation.prohibit_threshold
            )));
        }
        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidConfig(format!("{} is not a number: {}", key, raw))),
        Err(_) => Ok(None),
    }
}
