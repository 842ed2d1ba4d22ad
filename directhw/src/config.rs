//! Driver connection configuration.
//!
//! Defaults match the stock kext; a TOML file or environment variables
//! (`DIRECTHW_SERVICE`, `DIRECTHW_SETTLE_US`, `DIRECTHW_LOG`) can
//! override the service name, the post-map settle delay and the log
//! level.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::LevelFilter;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// IOKit service name the kext registers under.
    pub service_name: String,
    /// Microseconds to wait after mapping before the range is touched.
    pub map_settle_us: u64,
    /// Log level for the CLI tools: error/warn/info/debug/trace.
    pub log_level: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            service_name: "DirectHWService".to_string(),
            map_settle_us: 1_000,
            log_level: "warn".to_string(),
        }
    }
}

impl DriverConfig {
    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(name) = std::env::var("DIRECTHW_SERVICE") {
            if !name.is_empty() {
                cfg.service_name = name;
            }
        }
        if let Ok(us) = std::env::var("DIRECTHW_SETTLE_US") {
            if let Ok(us) = us.parse() {
                cfg.map_settle_us = us;
            }
        }
        if let Ok(level) = std::env::var("DIRECTHW_LOG") {
            if !level.is_empty() {
                cfg.log_level = level;
            }
        }
        cfg
    }

    pub fn settle(&self) -> Duration {
        Duration::from_micros(self.map_settle_us)
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level.to_uppercase().as_str() {
            "ERROR" => LevelFilter::Error,
            "INFO" => LevelFilter::Info,
            "DEBUG" => LevelFilter::Debug,
            "TRACE" => LevelFilter::Trace,
            _ => LevelFilter::Warn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_kext() {
        let cfg = DriverConfig::default();
        assert_eq!(cfg.service_name, "DirectHWService");
        assert_eq!(cfg.settle(), Duration::from_micros(1_000));
        assert_eq!(cfg.level_filter(), LevelFilter::Warn);
    }

    #[test]
    fn toml_overrides_defaults() {
        let cfg: DriverConfig =
            toml::from_str("service_name = \"TestHW\"\nmap_settle_us = 250\nlog_level = \"debug\"")
                .unwrap();
        assert_eq!(cfg.service_name, "TestHW");
        assert_eq!(cfg.map_settle_us, 250);
        assert_eq!(cfg.level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: std::result::Result<DriverConfig, _> = toml::from_str("bogus = 1");
        assert!(parsed.is_err());
    }
}
