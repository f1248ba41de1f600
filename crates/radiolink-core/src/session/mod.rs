//! Stateful pairing and data transport over a [`Radio`](crate::radio::Radio).

pub mod pairing;
pub mod transport;

pub use pairing::{PairingSession, SessionTiming, DEFAULT_SCAN_INTERVAL, DEFAULT_SETTLE_DELAY};
pub use transport::{SendTracker, Transport, TransportError};
