//! TOML config file persistence shared by the host and satellite apps.
//!
//! Each app owns its schema type; this module only knows where the file lives
//! and how to read and write it.  The file is found at `$RADIOLINK_CONFIG`
//! when that variable is set, otherwise in the platform config directory:
//! - Windows:  `%APPDATA%\RadioLink\<file>`
//! - Linux:    `~/.config/radiolink/<file>`
//! - macOS:    `~/Library/Application Support/RadioLink/<file>`
//!
//! A missing file is not an error: [`load_or_default`] returns the schema's
//! `Default`, so first runs work without any setup.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::domain::config::DEFAULT_CHANNEL;
use crate::radio::udp::DEFAULT_AIR_PORT;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "RADIOLINK_CONFIG";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Shared serde defaults ─────────────────────────────────────────────────────

pub fn default_channel() -> u8 {
    DEFAULT_CHANNEL
}

pub fn default_log_level() -> String {
    "info".to_string()
}

/// Where beacons go: the host's air port on loopback.
pub fn default_air_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], DEFAULT_AIR_PORT))
}

// ── Repository ────────────────────────────────────────────────────────────────

/// Resolves the path of `file_name`, honouring [`CONFIG_ENV_VAR`].
///
/// # Errors
///
/// Returns [`StorageError::NoPlatformConfigDir`] if the variable is unset and
/// the base directory cannot be determined.
pub fn config_file_path(file_name: &str) -> Result<PathBuf, StorageError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    platform_config_dir()
        .map(|dir| dir.join(file_name))
        .ok_or(StorageError::NoPlatformConfigDir)
}

/// Reads a `T` from `path`, or `T::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`StorageError::Io`] for file-system errors other than "not found",
/// and [`StorageError::Parse`] if the TOML is malformed.
pub fn load_or_default<T>(path: &Path) -> Result<T, StorageError>
where
    T: DeserializeOwned + Default,
{
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `value` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`StorageError::Io`] for file-system failures or
/// [`StorageError::Serialize`] if serialization fails.
pub fn save<T: Serialize>(value: &T, path: &Path) -> Result<(), StorageError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(value)?;
    std::fs::write(path, content).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// The per-user RadioLink config directory, if the platform has one.
pub fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("RadioLink"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("radiolink"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("RadioLink")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(default = "default_log_level")]
        log_level: String,
        #[serde(default)]
        peers: u8,
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("radiolink_storage_{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_missing_file_yields_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/sample.toml");
        let loaded: Sample = load_or_default(&path).expect("missing file is not an error");
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn test_save_creates_parent_dirs_and_round_trips() {
        // Arrange
        let dir = temp_dir();
        let path = dir.join("nested").join("sample.toml");
        let sample = Sample {
            log_level: "debug".to_string(),
            peers: 3,
        };

        // Act
        save(&sample, &path).expect("save");
        let loaded: Sample = load_or_default(&path).expect("load");

        // Assert
        assert_eq!(loaded, sample);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result: Result<Sample, _> = load_or_default(&path);

        assert!(matches!(result, Err(StorageError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_directory_path_is_an_io_error() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();

        let result: Result<Sample, _> = load_or_default(&dir);

        assert!(matches!(result, Err(StorageError::Io { .. })));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_uses_given_file_name() {
        if std::env::var_os(CONFIG_ENV_VAR).is_some() {
            return;
        }
        if let Ok(path) = config_file_path("satellite.toml") {
            assert!(path.ends_with("satellite.toml"), "got {path:?}");
        }
    }

    #[test]
    fn test_shared_defaults() {
        assert_eq!(default_channel(), 1);
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_air_address().port(), DEFAULT_AIR_PORT);
    }
}
