//! Storage infrastructure: the satellite's TOML configuration file.

pub mod config;
