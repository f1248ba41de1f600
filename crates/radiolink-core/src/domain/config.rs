//! Device role and pairing parameters.
//!
//! A [`DeviceConfig`] is built once at start-up and handed to
//! [`crate::session::PairingSession::new`].  The binaries overlay values from
//! their TOML files, but the session itself only ever sees this struct.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::registry::MAX_PEERS;

/// Channel used for both scanning and data when nothing else is configured.
pub const DEFAULT_CHANNEL: u8 = 1;

/// Maximum number of name prefixes a host matches against.
pub const MAX_TARGET_PREFIXES: usize = 2;

/// Which side of the pairing this device plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Scans for satellites and registers them as send targets.
    Host,
    /// Advertises a broadcast name and waits for a host to register it.
    Satellite,
}

/// Validation failures for a [`DeviceConfig`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("a host needs at least one target name prefix")]
    NoTargetPrefixes,

    #[error("at most {max} target name prefixes are supported, got {actual}")]
    TooManyTargetPrefixes { max: usize, actual: usize },

    #[error("target name prefixes must not be empty")]
    EmptyTargetPrefix,

    #[error("required peer count must be between 1 and {max}, got {actual}")]
    InvalidRequiredPeerCount { max: usize, actual: usize },

    #[error("a satellite needs a non-empty device name")]
    EmptyDeviceName,

    #[error("radio channel must be between 1 and 14, got {0}")]
    InvalidChannel(u8),
}

/// Static configuration of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub role: Role,
    /// Name this device advertises.  Only a satellite broadcasts it.
    pub device_name: String,
    /// Broadcast-name prefixes a host accepts, in priority order.
    pub target_prefixes: Vec<String>,
    /// Peers a host must register before it reports `Connected`.
    pub required_peer_count: usize,
    /// Fixed radio channel for scanning, pairing and data.
    pub channel: u8,
}

impl DeviceConfig {
    /// Host configuration matching `prefixes` until `required_peer_count`
    /// satellites are registered.
    pub fn host<I, S>(prefixes: I, required_peer_count: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: Role::Host,
            device_name: String::new(),
            target_prefixes: prefixes.into_iter().map(Into::into).collect(),
            required_peer_count,
            channel: DEFAULT_CHANNEL,
        }
    }

    /// Satellite configuration advertising `device_name`.
    pub fn satellite(device_name: impl Into<String>) -> Self {
        Self {
            role: Role::Satellite,
            device_name: device_name.into(),
            target_prefixes: Vec::new(),
            required_peer_count: 1,
            channel: DEFAULT_CHANNEL,
        }
    }

    /// Overrides the radio channel.
    #[must_use]
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Checks the role-specific constraints.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=14).contains(&self.channel) {
            return Err(ConfigError::InvalidChannel(self.channel));
        }

        match self.role {
            Role::Host => {
                if self.target_prefixes.is_empty() {
                    return Err(ConfigError::NoTargetPrefixes);
                }
                if self.target_prefixes.len() > MAX_TARGET_PREFIXES {
                    return Err(ConfigError::TooManyTargetPrefixes {
                        max: MAX_TARGET_PREFIXES,
                        actual: self.target_prefixes.len(),
                    });
                }
                if self.target_prefixes.iter().any(String::is_empty) {
                    return Err(ConfigError::EmptyTargetPrefix);
                }
                if !(1..=MAX_PEERS).contains(&self.required_peer_count) {
                    return Err(ConfigError::InvalidRequiredPeerCount {
                        max: MAX_PEERS,
                        actual: self.required_peer_count,
                    });
                }
            }
            Role::Satellite => {
                if self.device_name.is_empty() {
                    return Err(ConfigError::EmptyDeviceName);
                }
            }
        }
        Ok(())
    }
}
