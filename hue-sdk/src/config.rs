//! Persistent bridge connection settings
//!
//! Stored as JSON at `<config dir>/hue-sdk/bridge.json`. Durations are kept in
//! milliseconds. `HUE_BRIDGE_ADDRESS`, `HUE_BRIDGE_PORT` and `HUE_USERNAME`
//! override whatever the file says.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SdkError};

pub const ADDRESS_ENV: &str = "HUE_BRIDGE_ADDRESS";
pub const PORT_ENV: &str = "HUE_BRIDGE_PORT";
pub const USERNAME_ENV: &str = "HUE_USERNAME";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whitelisted API user; empty until paired
    #[serde(default)]
    pub username: String,
    /// How long cached bridge state is served before it is fetched again
    #[serde(rename = "refresh_interval_ms", default = "default_refresh_interval", with = "millis")]
    pub refresh_interval: Duration,
    /// Minimum spacing between two requests to the bridge
    #[serde(rename = "min_delay_ms", default = "default_min_delay", with = "millis")]
    pub min_delay: Duration,
    #[serde(rename = "pairing_timeout_ms", default = "default_pairing_timeout", with = "millis")]
    pub pairing_timeout: Duration,
    #[serde(rename = "pairing_interval_ms", default = "default_pairing_interval", with = "millis")]
    pub pairing_interval: Duration,
    /// `devicetype` sent when requesting a username
    #[serde(default = "default_device_type")]
    pub device_type: String,
}

fn default_port() -> u16 {
    80
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_min_delay() -> Duration {
    hue_api::DEFAULT_MIN_DELAY
}

fn default_pairing_timeout() -> Duration {
    Duration::from_secs(35)
}

fn default_pairing_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_device_type() -> String {
    "hue-sdk#rust".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: default_port(),
            username: String::new(),
            refresh_interval: default_refresh_interval(),
            min_delay: default_min_delay(),
            pairing_timeout: default_pairing_timeout(),
            pairing_interval: default_pairing_interval(),
            device_type: default_device_type(),
        }
    }
}

impl BridgeConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Load from the default location and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(default_path()?)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no bridge config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| SdkError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(default_path()?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_error = |source: std::io::Error| SdkError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_error)?;
        debug!(path = %path.display(), "saved bridge config");
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(ADDRESS_ENV) {
            self.address = address;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port.trim().parse().map_err(|_| SdkError::InvalidConfig {
                key: PORT_ENV,
                value: port.clone(),
            })?;
        }
        if let Some(username) = lookup(USERNAME_ENV) {
            self.username = username;
        }
        Ok(())
    }
}

/// `<config dir>/hue-sdk/bridge.json`
pub fn default_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(SdkError::NoConfigDir)?;
    Ok(base.join("hue-sdk").join("bridge.json"))
}

/// Millisecond encoding; `u64::MAX` stands for [`REFRESH_NEVER`](hue_state::REFRESH_NEVER)
mod millis {
    use std::time::Duration;

    use hue_state::REFRESH_NEVER;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(|ms| match ms {
            u64::MAX => REFRESH_NEVER,
            ms => Duration::from_millis(ms),
        })
    }
}
