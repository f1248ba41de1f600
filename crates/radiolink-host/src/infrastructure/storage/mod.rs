//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the host's TOML file from the platform
//! config directory (or `$RADIOLINK_CONFIG`), writes it back, and supplies
//! defaults on first run.  Pairing state itself is never persisted.

pub mod config;
