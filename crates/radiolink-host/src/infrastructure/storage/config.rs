//! TOML-based configuration persistence for the host.
//!
//! The file is read from `$RADIOLINK_CONFIG` when that variable is set,
//! otherwise from the platform config directory:
//! - Windows:  `%APPDATA%\RadioLink\host.toml`
//! - Linux:    `~/.config/radiolink/host.toml`
//! - macOS:    `~/Library/Application Support/RadioLink/host.toml`
//!
//! Example:
//!
//! ```toml
//! [host]
//! target_prefixes = ["uMind"]
//! required_peers = 1
//! channel = 1
//! log_level = "info"
//!
//! [timing]
//! scan_interval_ms = 1000
//! settle_delay_ms = 100
//! pairing_timeout_ms = 3000
//! send_interval_ms = 1000
//!
//! [radio]
//! bind_address = "0.0.0.0:24900"
//! air_address = "127.0.0.1:24900"
//! scan_window_ms = 300
//! ```
//!
//! Every field has a default, so a missing file, a missing section, or a
//! missing key all fall back to the compiled-in values.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use radiolink_core::radio::udp::{UdpRadioConfig, DEFAULT_AIR_PORT};
use radiolink_core::storage::{self, default_air_address, default_channel, default_log_level};
use radiolink_core::{DeviceConfig, MacAddress, SessionTiming};
use serde::{Deserialize, Serialize};

pub use radiolink_core::storage::{StorageError as ConfigError, CONFIG_ENV_VAR};

const CONFIG_FILE_NAME: &str = "host.toml";

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level host configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    #[serde(default)]
    pub host: HostSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub radio: RadioSection,
}

/// What to pair with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostSection {
    /// Advertised-name prefixes that identify satellites (1 or 2 entries).
    #[serde(default = "default_prefixes")]
    pub target_prefixes: Vec<String>,
    /// Number of satellites needed before pairing is complete.
    #[serde(default = "default_required_peers")]
    pub required_peers: usize,
    #[serde(default = "default_channel")]
    pub channel: u8,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Pacing of the pairing and send loops, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingSection {
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// After this long, pairing settles for the satellites found so far.
    #[serde(default = "default_pairing_timeout_ms")]
    pub pairing_timeout_ms: u64,
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
}

/// UDP air emulation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RadioSection {
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
    #[serde(default = "default_air_address")]
    pub air_address: SocketAddr,
    #[serde(default = "default_scan_window_ms")]
    pub scan_window_ms: u64,
    /// Fixed radio address; random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_address: Option<MacAddress>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_prefixes() -> Vec<String> {
    vec!["uMind".to_string()]
}
fn default_required_peers() -> usize {
    1
}
fn default_scan_interval_ms() -> u64 {
    1000
}
fn default_settle_delay_ms() -> u64 {
    100
}
fn default_pairing_timeout_ms() -> u64 {
    3000
}
fn default_send_interval_ms() -> u64 {
    1000
}
fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_AIR_PORT))
}
fn default_scan_window_ms() -> u64 {
    300
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            target_prefixes: default_prefixes(),
            required_peers: default_required_peers(),
            channel: default_channel(),
            log_level: default_log_level(),
        }
    }
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            scan_interval_ms: default_scan_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            pairing_timeout_ms: default_pairing_timeout_ms(),
            send_interval_ms: default_send_interval_ms(),
        }
    }
}

impl Default for RadioSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            air_address: default_air_address(),
            scan_window_ms: default_scan_window_ms(),
            local_address: None,
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl HostConfig {
    /// The core device configuration.  Not validated here; the session
    /// validates it on construction.
    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig::host(self.host.target_prefixes.iter().cloned(), self.host.required_peers)
            .with_channel(self.host.channel)
    }

    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            scan_interval: Duration::from_millis(self.timing.scan_interval_ms),
            settle_delay: Duration::from_millis(self.timing.settle_delay_ms),
        }
    }

    pub fn radio_config(&self) -> UdpRadioConfig {
        UdpRadioConfig {
            bind_addr: self.radio.bind_address,
            air_addr: self.radio.air_address,
            scan_window: Duration::from_millis(self.radio.scan_window_ms),
            local_address: self.radio.local_address,
            ..UdpRadioConfig::default()
        }
    }

    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_millis(self.timing.pairing_timeout_ms)
    }

    /// Never zero; a zero interval is treated as 1 ms.
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.timing.send_interval_ms.max(1))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to `host.toml`.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if `$RADIOLINK_CONFIG` is
/// unset and the base directory cannot be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    storage::config_file_path(CONFIG_FILE_NAME)
}

/// Loads the config from [`config_file_path`].
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<HostConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `HostConfig` from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<HostConfig, ConfigError> {
    storage::load_or_default(path)
}

/// Persists `config` to [`config_file_path`].
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &HostConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] or [`ConfigError::Serialize`].
pub fn save_config_to(config: &HostConfig, path: &Path) -> Result<(), ConfigError> {
    storage::save(config, path)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
