//! TOML configuration for the satellite.
//!
//! Located at `$RADIOLINK_CONFIG` when set, otherwise
//! `<platform config dir>/radiolink/satellite.toml` (see
//! `radiolink_core::storage` for the per-platform directories).  A missing
//! file means defaults.
//!
//! ```toml
//! [satellite]
//! device_name = "uMind-01"
//! channel = 1
//! log_level = "info"
//!
//! [radio]
//! bind_address = "0.0.0.0:0"
//! air_address = "127.0.0.1:24900"
//! beacon_interval_ms = 200
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use radiolink_core::radio::udp::UdpRadioConfig;
use radiolink_core::storage::{self, default_air_address, default_channel, default_log_level};
use radiolink_core::{DeviceConfig, MacAddress};
use serde::{Deserialize, Serialize};

pub use radiolink_core::storage::{StorageError as ConfigError, CONFIG_ENV_VAR};

const CONFIG_FILE_NAME: &str = "satellite.toml";

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SatelliteConfig {
    #[serde(default)]
    pub satellite: SatelliteSection,
    #[serde(default)]
    pub radio: RadioSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SatelliteSection {
    /// Name advertised to hosts; must start with one of the host's prefixes.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_channel")]
    pub channel: u8,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RadioSection {
    /// Port 0 lets the OS pick; the port is advertised in every beacon.
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
    /// Where the host listens for beacons.
    #[serde(default = "default_air_address")]
    pub air_address: SocketAddr,
    #[serde(default = "default_beacon_interval_ms")]
    pub beacon_interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_address: Option<MacAddress>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_device_name() -> String {
    "uMind".to_string()
}
fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 0))
}
fn default_beacon_interval_ms() -> u64 {
    200
}

impl Default for SatelliteSection {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            channel: default_channel(),
            log_level: default_log_level(),
        }
    }
}

impl Default for RadioSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            air_address: default_air_address(),
            beacon_interval_ms: default_beacon_interval_ms(),
            local_address: None,
        }
    }
}

impl SatelliteConfig {
    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig::satellite(self.satellite.device_name.clone())
            .with_channel(self.satellite.channel)
    }

    pub fn radio_config(&self) -> UdpRadioConfig {
        UdpRadioConfig {
            bind_addr: self.radio.bind_address,
            air_addr: self.radio.air_address,
            beacon_interval: Duration::from_millis(self.radio.beacon_interval_ms),
            local_address: self.radio.local_address,
            ..UdpRadioConfig::default()
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to `satellite.toml`.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if `$RADIOLINK_CONFIG` is
/// unset and no platform config directory is known.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    storage::config_file_path(CONFIG_FILE_NAME)
}

/// Loads the config from [`config_file_path`], or the defaults if absent.
///
/// # Errors
///
/// Returns [`ConfigError`] for unreadable or malformed files.
pub fn load_config() -> Result<SatelliteConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `SatelliteConfig` from `path`, or the defaults if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
pub fn load_config_from(path: &Path) -> Result<SatelliteConfig, ConfigError> {
    storage::load_or_default(path)
}

/// Persists `config` to [`config_file_path`].
///
/// # Errors
///
/// Returns [`ConfigError`] on I/O or serialization failure.
pub fn save_config(config: &SatelliteConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Writes `config` to `path`.  See [`storage::save`].
///
/// # Errors
///
/// Returns [`ConfigError::Io`] or [`ConfigError::Serialize`].
pub fn save_config_to(config: &SatelliteConfig, path: &Path) -> Result<(), ConfigError> {
    storage::save(config, path)
}
