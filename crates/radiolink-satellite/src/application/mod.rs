//! Application layer use cases for the satellite.
//!
//! - **`await_pairing`** – Advertises the device name and polls until a host
//!   has registered this satellite.
//!
//! - **`receive_log`** – Moves inbound frames out of the radio's callback
//!   context onto a channel and renders them for the log.

pub mod await_pairing;
pub mod receive_log;
