//! Domain entities for radio peer pairing.
//!
//! Pure logic with no radio, socket, or clock dependencies: address parsing,
//! name-prefix matching, the bounded peer table, device configuration, and
//! the connection status enum.

pub mod config;
pub mod mac;
pub mod matcher;
pub mod registry;
pub mod status;
