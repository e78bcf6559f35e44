//! Daemon configuration.
//!
//! Loaded from a TOML file, for example:
//!
//! ```toml
//! poll_interval_secs = 10
//! purge_on_disconnection = false
//!
//! [device_overrides]
//! "of:0000000000000001" = true
//! ```

use crate::manager::PurgePolicy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("poll_interval_secs must be at least 1")]
    InvalidPollInterval,
    #[error("invalid device id in device_overrides: {0}")]
    InvalidDeviceId(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnergymonConfig {
    /// Seconds between energy polls of each switch.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Whether a device's stats are dropped when it disconnects.
    #[serde(default)]
    pub purge_on_disconnection: bool,

    /// Per-device overrides of `purge_on_disconnection`, keyed by
    /// device id (`of:<16 hex digits>`).
    #[serde(default)]
    pub device_overrides: BTreeMap<String, bool>,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl Default for EnergymonConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            purge_on_disconnection: false,
            device_overrides: BTreeMap::new(),
        }
    }
}

impl EnergymonConfig {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::parse(&raw)?;
        info!(?path, poll_interval_secs = config.poll_interval_secs, "config loaded");
        Ok(config)
    }

    /// Parses and validates config text.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        for key in self.device_overrides.keys() {
            if key.parse::<energymon_types::DeviceId>().is_err() {
                return Err(ConfigError::InvalidDeviceId(key.clone()));
            }
        }
        Ok(())
    }

    /// The polling interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Builds the purge policy from the default and the per-device
    /// overrides.
    pub fn purge_policy(&self) -> Result<PurgePolicy, ConfigError> {
        let mut policy = PurgePolicy::new(self.purge_on_disconnection);
        for (key, purge) in &self.device_overrides {
            let device = key
                .parse()
                .map_err(|_| ConfigError::InvalidDeviceId(key.clone()))?;
            policy.set_override(device, *purge);
        }
        Ok(policy)
    }
}
