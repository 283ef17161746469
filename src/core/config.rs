use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::health_monitor::{
    validate_interval, MonitorSettings, RuntimeOptions, DEFAULT_ICON_FAILING,
    DEFAULT_ICON_HEALTHY, DEFAULT_INTERVAL_MINUTES,
};

const DEFAULT_STARTUP_DELAY_SECS: u64 = 2;
const DEFAULT_UNIT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RESCAN_INTERVAL_SECS: u64 = 60;

/// Persisted monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minutes between two periodic evaluations
    pub interval_minutes: u32,
    pub notify_enabled: bool,
    pub icon_healthy: String,
    pub icon_failing: String,
    pub startup_delay_secs: u64,
    /// 0 disables the per-unit refresh timeout
    pub unit_timeout_secs: u64,
    /// 0 disables periodic rescans of the storage backend
    pub rescan_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            notify_enabled: true,
            icon_healthy: DEFAULT_ICON_HEALTHY.to_string(),
            icon_failing: DEFAULT_ICON_FAILING.to_string(),
            startup_delay_secs: DEFAULT_STARTUP_DELAY_SECS,
            unit_timeout_secs: DEFAULT_UNIT_TIMEOUT_SECS,
            rescan_interval_secs: DEFAULT_RESCAN_INTERVAL_SECS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path. A missing, empty or unreadable file
    /// yields the defaults.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        Ok(serde_json::from_str(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid config file {:?}: {}", config_path, e);
            Config::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("diskwatch").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        validate_interval(self.interval_minutes)?;
        Ok(())
    }

    /// Set a value by its key name, as used by `diskwatch config set`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "interval_minutes" | "interval" => {
                let minutes: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid number of minutes: {}", value))?;
                validate_interval(minutes)?;
                self.interval_minutes = minutes;
            }
            "notify_enabled" | "notify" => {
                self.notify_enabled = parse_bool(value)?;
            }
            "icon_healthy" => self.icon_healthy = value.to_string(),
            "icon_failing" => self.icon_failing = value.to_string(),
            "startup_delay_secs" => self.startup_delay_secs = parse_secs(value)?,
            "unit_timeout_secs" => self.unit_timeout_secs = parse_secs(value)?,
            "rescan_interval_secs" => self.rescan_interval_secs = parse_secs(value)?,
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            interval_minutes: self.interval_minutes,
            notify_enabled: self.notify_enabled,
            icon_healthy: self.icon_healthy.clone(),
            icon_failing: self.icon_failing.clone(),
        }
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            startup_delay: Duration::from_secs(self.startup_delay_secs),
            unit_timeout: non_zero_secs(self.unit_timeout_secs),
            rescan_interval: non_zero_secs(self.rescan_interval_secs),
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_secs(value: &str) -> Result<u64> {
    value
        .parse()
        .with_context(|| format!("Invalid number of seconds: {}", value))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => anyhow::bail!("Invalid boolean value: {}", value),
    }
}
