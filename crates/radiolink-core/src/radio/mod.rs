//! The link-layer driver seam.
//!
//! Everything that actually touches radio hardware lives behind the [`Radio`]
//! trait: address-family initialisation, the passive scan primitive, the
//! driver's peer table, raw frame send, and the callback hooks for send
//! completion and inbound frames.
//!
//! # Testability
//!
//! [`mock::MockRadio`] scripts scan results and records sends so the pairing
//! state machine can be tested without hardware.  [`udp::UdpRadio`] emulates
//! the broadcast link over UDP so a host and its satellites can run as
//! ordinary processes.
//!
//! # Callback context
//!
//! Send and receive handlers are invoked from the driver's own execution
//! context (an interrupt-like callback on hardware, a background thread in
//! the UDP backend), concurrently with whoever is polling the session.
//! Handlers must be quick and must only touch shared state through atomics or
//! locks.  The registry is never mutated from a handler.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::mac::MacAddress;
use crate::domain::matcher::ScanCandidate;
use crate::domain::registry::PeerRecord;

pub mod mock;
pub mod udp;

/// Outcome of one transmitted frame, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Success,
    Failure,
}

impl SendStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Called when the driver finishes transmitting a frame.
pub type SendHandler = Arc<dyn Fn(MacAddress, SendStatus) + Send + Sync>;

/// Called when a frame arrives.  The slice length is the frame length.
pub type ReceiveHandler = Arc<dyn Fn(MacAddress, &[u8]) + Send + Sync>;

/// How the radio is brought up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioMode {
    /// Host: listen and scan, never advertise.
    Station,
    /// Satellite: advertise `name` on `channel` so hosts can find us.
    Advertise { name: String, channel: u8 },
}

/// Driver-level failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RadioError {
    /// The radio or its address family could not be initialised.  Fatal.
    #[error("radio initialisation failed: {0}")]
    InitFailed(String),

    /// A scan could not be performed.  Transient.
    #[error("scan unavailable: {0}")]
    ScanUnavailable(String),

    /// The address is not in the driver's peer table.
    #[error("peer {0} is not registered with the radio")]
    UnknownPeer(MacAddress),

    /// The driver would not register the peer.
    #[error("radio refused to register peer {0}")]
    PeerRejected(MacAddress),

    /// The driver's own peer table is exhausted.
    #[error("radio peer table is full")]
    PeerTableFull,

    /// The frame could not be handed to the radio.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// An operation was attempted before [`Radio::init`] succeeded.
    #[error("radio is not initialised")]
    NotInitialized,
}

/// Abstraction over the external radio driver.
///
/// `init`, `scan` and `add_peer` are only ever called from the polling
/// thread; `send` and the handler setters may be called while the driver is
/// delivering callbacks.
pub trait Radio: Send {
    /// Brings the radio up in `mode`.  Calling it again once it succeeded is
    /// a no-op.
    fn init(&mut self, mode: &RadioMode) -> Result<(), RadioError>;

    /// Performs one passive scan and returns everything heard.  May block
    /// for a bounded, driver-defined time.
    fn scan(&mut self) -> Result<Vec<ScanCandidate>, RadioError>;

    /// Registers `peer` as a valid send target.
    fn add_peer(&mut self, peer: &PeerRecord) -> Result<(), RadioError>;

    /// Returns `true` if `address` is in the driver's peer table.
    fn has_peer(&self, address: &MacAddress) -> bool;

    /// Transmits one frame to `address`.
    fn send(&self, address: &MacAddress, data: &[u8]) -> Result<(), RadioError>;

    /// Installs (or with `None`, removes) the send-completion handler.
    fn set_send_handler(&self, handler: Option<SendHandler>);

    /// Installs (or with `None`, removes) the inbound frame handler.
    fn set_receive_handler(&self, handler: Option<ReceiveHandler>);

    /// Satellite side: `true` once a host has registered this device.
    fn pairing_acknowledged(&self) -> bool;

    /// This device's own hardware address.
    fn local_address(&self) -> MacAddress;
}
