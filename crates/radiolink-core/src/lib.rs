//! # radiolink-core
//!
//! Shared library for RadioLink: discovers nearby radio devices, pairs with
//! the ones whose advertised name starts with a configured prefix, and moves
//! small data frames to them.
//!
//! Used by both the host and satellite applications.
//!
//! # Architecture overview (for beginners)
//!
//! A *host* listens for devices advertising themselves over a broadcast,
//! connectionless radio link (ESP-NOW style).  Every device whose name starts
//! with one of the host's target prefixes is registered as a peer, up to a
//! small fixed limit.  Once the required number of peers is registered the
//! host is "connected" and can send frames to one or all of them.  A
//! *satellite* advertises its name and waits for a host to pick it up.
//!
//! - **`domain`** – Pure logic: radio addresses, prefix matching, the bounded
//!   peer registry, device configuration, and the connection status.
//!
//! - **`radio`** – The driver seam.  The [`Radio`] trait hides the link
//!   layer; a scripted mock and a UDP emulation implement it.
//!
//! - **`protocol`** – The binary frame format the UDP emulation puts on the
//!   air.
//!
//! - **`session`** – The pairing state machine and the send/receive surface
//!   over registered peers.
//!
//! - **`storage`** – Where the apps' TOML config files live, and how they are
//!   read and written.

pub mod domain;
pub mod protocol;
pub mod radio;
pub mod session;
pub mod storage;

// Re-export the most-used types at the crate root so callers can write
// `radiolink_core::PairingSession` instead of the full module path.
pub use domain::config::{ConfigError, DeviceConfig, Role, DEFAULT_CHANNEL};
pub use domain::mac::{AddressParseError, MacAddress};
pub use domain::matcher::{match_candidates, MatchedPeer, ScanCandidate};
pub use domain::registry::{PeerRecord, PeerRegistry, RegistryError, MAX_PEERS};
pub use domain::status::ConnectionStatus;
pub use radio::{Radio, RadioError, RadioMode, ReceiveHandler, SendHandler, SendStatus};
pub use session::{PairingSession, SendTracker, SessionTiming, Transport, TransportError};
