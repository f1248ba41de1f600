//! Sending to registered peers and installing driver callbacks.
//!
//! [`Transport`] is a borrowed view over a session's registry and radio.  It
//! cannot change the registry, so it is safe to hand out while the session
//! is otherwise idle.
//!
//! # Send results
//!
//! A send has two outcomes: the immediate return value of the driver's send
//! primitive, and the later send-completion callback.  The callback runs in
//! driver context, so its result is recorded in a [`SendTracker`] made of
//! atomics rather than in a plain field.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::domain::mac::MacAddress;
use crate::domain::registry::PeerRegistry;
use crate::radio::{Radio, RadioError, ReceiveHandler, SendHandler, SendStatus};

/// Errors returned by [`Transport`] operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// `index` does not name a registered peer.
    #[error("invalid peer index {index}: only {count} peer(s) registered")]
    InvalidPeerIndex { index: usize, count: usize },

    /// The driver refused to send to `address`.
    #[error("send to {address} failed: {source}")]
    SendFailed {
        address: MacAddress,
        #[source]
        source: RadioError,
    },

    /// A fan-out send failed for at least one peer.
    #[error("send failed for {} peer(s)", failed.len())]
    PartialFailure { failed: Vec<MacAddress> },
}

const STATUS_NONE: u8 = 0;
const STATUS_SUCCESS: u8 = 1;
const STATUS_FAILURE: u8 = 2;

/// Lock-free record of send-completion callbacks.
#[derive(Debug, Default)]
pub struct SendTracker {
    last: AtomicU8,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl SendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completion.  Safe to call from driver context.
    pub fn record(&self, status: SendStatus) {
        match status {
            SendStatus::Success => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                self.last.store(STATUS_SUCCESS, Ordering::Release);
            }
            SendStatus::Failure => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.last.store(STATUS_FAILURE, Ordering::Release);
            }
        }
    }

    /// Status of the most recent completion, if any.
    pub fn last(&self) -> Option<SendStatus> {
        match self.last.load(Ordering::Acquire) {
            STATUS_SUCCESS => Some(SendStatus::Success),
            STATUS_FAILURE => Some(SendStatus::Failure),
            _ => None,
        }
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Wraps `user` so every completion is recorded before it runs.
    pub(crate) fn handler(self: &Arc<Self>, user: Option<SendHandler>) -> SendHandler {
        let tracker = Arc::clone(self);
        Arc::new(move |address, status| {
            tracker.record(status);
            if let Some(cb) = &user {
                cb(address, status);
            }
        })
    }

    pub(crate) fn reset(&self) {
        self.last.store(STATUS_NONE, Ordering::Release);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}

/// Send/receive operations over the peers registered in a session.
pub struct Transport<'a, R: Radio> {
    registry: &'a PeerRegistry,
    radio: &'a R,
    tracker: &'a Arc<SendTracker>,
}

impl<'a, R: Radio> Transport<'a, R> {
    pub(crate) fn new(registry: &'a PeerRegistry, radio: &'a R, tracker: &'a Arc<SendTracker>) -> Self {
        Self {
            registry,
            radio,
            tracker,
        }
    }

    /// Number of peers this transport can address.
    pub fn peer_count(&self) -> usize {
        self.registry.len()
    }

    /// Sends `data` to the peer registered at `index`.
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidPeerIndex`] if `index >= peer_count()`,
    /// otherwise [`TransportError::SendFailed`] with the driver's error.
    pub fn send_to(&self, index: usize, data: &[u8]) -> Result<(), TransportError> {
        let peer = self
            .registry
            .get(index)
            .ok_or(TransportError::InvalidPeerIndex {
                index,
                count: self.registry.len(),
            })?;
        self.radio
            .send(&peer.address, data)
            .map_err(|source| TransportError::SendFailed {
                address: peer.address,
                source,
            })
    }

    /// Sends `data` to every registered peer in index order.
    ///
    /// Every peer is attempted even after a failure.  With no peers
    /// registered this succeeds trivially.
    ///
    /// # Errors
    ///
    /// [`TransportError::PartialFailure`] listing every peer that failed.
    pub fn send_all(&self, data: &[u8]) -> Result<(), TransportError> {
        let failed: Vec<MacAddress> = self
            .registry
            .iter()
            .enumerate()
            .filter_map(|(index, peer)| match self.radio.send(&peer.address, data) {
                Ok(()) => None,
                Err(e) => {
                    warn!("send to peer {index} ({}) failed: {e}", peer.address);
                    Some(peer.address)
                }
            })
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            Err(TransportError::PartialFailure { failed })
        }
    }

    /// Sends a single byte as a one-element frame.
    ///
    /// # Errors
    ///
    /// As [`Self::send_to`].
    pub fn send_byte_to(&self, index: usize, byte: u8) -> Result<(), TransportError> {
        self.send_to(index, &[byte])
    }

    /// Sends a single byte to every peer as a one-element frame.
    ///
    /// # Errors
    ///
    /// As [`Self::send_all`].
    pub fn send_byte_all(&self, byte: u8) -> Result<(), TransportError> {
        self.send_all(&[byte])
    }

    /// Sends the UTF-8 bytes of `text` to one peer.
    ///
    /// # Errors
    ///
    /// As [`Self::send_to`].
    pub fn print_to(&self, index: usize, text: &str) -> Result<(), TransportError> {
        self.send_to(index, text.as_bytes())
    }

    /// Sends the UTF-8 bytes of `text` to every peer.
    ///
    /// # Errors
    ///
    /// As [`Self::send_all`].
    pub fn print_all(&self, text: &str) -> Result<(), TransportError> {
        self.send_all(text.as_bytes())
    }

    /// Installs the send-completion callback, replacing any previous one.
    ///
    /// `callback` runs in driver context: keep it short and touch shared
    /// state only through atomics or locks.
    pub fn register_send_callback<F>(&self, callback: F)
    where
        F: Fn(MacAddress, SendStatus) + Send + Sync + 'static,
    {
        let user: SendHandler = Arc::new(callback);
        self.radio.set_send_handler(Some(self.tracker.handler(Some(user))));
    }

    /// Installs the inbound frame callback, replacing any previous one.
    ///
    /// Same context rules as [`Self::register_send_callback`].
    pub fn register_receive_callback<F>(&self, callback: F)
    where
        F: Fn(MacAddress, &[u8]) + Send + Sync + 'static,
    {
        let handler: ReceiveHandler = Arc::new(callback);
        self.radio.set_receive_handler(Some(handler));
    }

    /// Removes both user callbacks.  Send completions are still tracked.
    pub fn clear_callbacks(&self) {
        self.radio.set_send_handler(Some(self.tracker.handler(None)));
        self.radio.set_receive_handler(None);
    }

    /// Status of the most recent send completion reported by the driver.
    pub fn last_send_status(&self) -> Option<SendStatus> {
        self.tracker.last()
    }

    pub fn tracker(&self) -> &SendTracker {
        self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registry::PeerRecord;
    use crate::radio::mock::MockRadio;
    use crate::radio::RadioMode;
    use std::sync::Mutex;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0x30, 0xAE, 0xA4, 0, 0, last])
    }

    /// Registry plus a mock radio that knows the same peers.
    fn setup(peers: &[u8]) -> (PeerRegistry, MockRadio, Arc<SendTracker>) {
        let mut radio = MockRadio::new();
        radio.init(&RadioMode::Station).unwrap();
        let mut registry = PeerRegistry::new();
        for &p in peers {
            registry.try_add(mac(p), 1).unwrap();
            radio.add_peer(&PeerRecord::new(mac(p), 1)).unwrap();
        }
        let tracker = Arc::new(SendTracker::new());
        radio.set_send_handler(Some(tracker.handler(None)));
        (registry, radio, tracker)
    }

    #[test]
    fn test_send_to_valid_index_reaches_peer() {
        // Arrange
        let (registry, radio, tracker) = setup(&[1, 2]);
        let transport = Transport::new(&registry, &radio, &tracker);

        // Act
        let result = transport.send_to(1, b"ping");

        // Assert
        assert_eq!(result, Ok(()));
        assert_eq!(radio.sent_frames(), vec![(mac(2), b"ping".to_vec())]);
        assert_eq!(transport.last_send_status(), Some(SendStatus::Success));
    }

    #[test]
    fn test_send_to_index_equal_to_count_is_invalid() {
        let (registry, radio, tracker) = setup(&[1]);
        let transport = Transport::new(&registry, &radio, &tracker);

        let result = transport.send_to(1, b"x");

        assert_eq!(
            result,
            Err(TransportError::InvalidPeerIndex { index: 1, count: 1 })
        );
        assert!(radio.sent_frames().is_empty());
    }

    #[test]
    fn test_send_to_surfaces_driver_failure() {
        let (registry, radio, tracker) = setup(&[1]);
        radio.fail_sends_to(mac(1));
        let transport = Transport::new(&registry, &radio, &tracker);

        let result = transport.send_to(0, b"x");

        assert!(matches!(
            result,
            Err(TransportError::SendFailed { address, .. }) if address == mac(1)
        ));
        assert_eq!(transport.last_send_status(), Some(SendStatus::Failure));
    }

    #[test]
    fn test_send_all_with_no_peers_succeeds() {
        let (registry, radio, tracker) = setup(&[]);
        let transport = Transport::new(&registry, &radio, &tracker);
        assert_eq!(transport.send_all(b"hello"), Ok(()));
        assert_eq!(transport.last_send_status(), None);
    }

    #[test]
    fn test_send_all_with_one_failure_reports_failure_and_still_sends_rest() {
        // Arrange
        let (registry, radio, tracker) = setup(&[1, 2, 3]);
        radio.fail_sends_to(mac(2));
        let transport = Transport::new(&registry, &radio, &tracker);

        // Act
        let result = transport.send_all(b"hello");

        // Assert
        assert_eq!(
            result,
            Err(TransportError::PartialFailure {
                failed: vec![mac(2)]
            })
        );
        let sent: Vec<MacAddress> = radio.sent_frames().into_iter().map(|(a, _)| a).collect();
        assert_eq!(sent, vec![mac(1), mac(3)]);
        assert_eq!(tracker.succeeded(), 2);
        assert_eq!(tracker.failed(), 1);
    }

    #[test]
    fn test_send_byte_is_a_one_element_frame() {
        let (registry, radio, tracker) = setup(&[1, 2]);
        let transport = Transport::new(&registry, &radio, &tracker);

        transport.send_byte_to(0, 0x7E).unwrap();
        transport.send_byte_all(0x42).unwrap();

        assert_eq!(
            radio.sent_frames(),
            vec![
                (mac(1), vec![0x7E]),
                (mac(1), vec![0x42]),
                (mac(2), vec![0x42]),
            ]
        );
    }

    #[test]
    fn test_print_sends_utf8_bytes() {
        let (registry, radio, tracker) = setup(&[1]);
        let transport = Transport::new(&registry, &radio, &tracker);

        transport.print_all("Hello World").unwrap();

        assert_eq!(radio.sent_frames()[0].1, b"Hello World".to_vec());
    }

    #[test]
    fn test_registered_send_callback_runs_and_is_tracked() {
        // Arrange
        let (registry, radio, tracker) = setup(&[1]);
        let transport = Transport::new(&registry, &radio, &tracker);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = Arc::clone(&calls);
        transport.register_send_callback(move |addr, status| {
            calls_clone.lock().unwrap().push((addr, status));
        });

        // Act
        transport.send_to(0, b"x").unwrap();

        // Assert
        assert_eq!(*calls.lock().unwrap(), vec![(mac(1), SendStatus::Success)]);
        assert_eq!(tracker.succeeded(), 1);
    }

    #[test]
    fn test_reregistering_send_callback_replaces_previous() {
        let (registry, radio, tracker) = setup(&[1]);
        let transport = Transport::new(&registry, &radio, &tracker);
        let first = Arc::new(AtomicU64::new(0));
        let second = Arc::new(AtomicU64::new(0));
        let f = Arc::clone(&first);
        let s = Arc::clone(&second);
        transport.register_send_callback(move |_, _| {
            f.fetch_add(1, Ordering::Relaxed);
        });
        transport.register_send_callback(move |_, _| {
            s.fetch_add(1, Ordering::Relaxed);
        });

        transport.send_to(0, b"x").unwrap();

        assert_eq!(first.load(Ordering::Relaxed), 0);
        assert_eq!(second.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_receive_callback_gets_inbound_frames() {
        let (registry, radio, tracker) = setup(&[]);
        let transport = Transport::new(&registry, &radio, &tracker);
        let got = Arc::new(Mutex::new(None));
        let got_clone = Arc::clone(&got);
        transport.register_receive_callback(move |addr, data| {
            *got_clone.lock().unwrap() = Some((addr, data.to_vec()));
        });

        assert!(radio.deliver(mac(9), b"abc"));

        assert_eq!(*got.lock().unwrap(), Some((mac(9), b"abc".to_vec())));
    }

    #[test]
    fn test_clear_callbacks_keeps_tracking() {
        let (registry, radio, tracker) = setup(&[1]);
        let transport = Transport::new(&registry, &radio, &tracker);
        transport.register_receive_callback(|_, _| {});

        transport.clear_callbacks();
        transport.send_to(0, b"x").unwrap();

        assert!(!radio.has_receive_handler());
        assert!(radio.has_send_handler());
        assert_eq!(tracker.succeeded(), 1);
    }

    #[test]
    fn test_tracker_reset_forgets_history() {
        let tracker = SendTracker::new();
        tracker.record(SendStatus::Failure);
        tracker.reset();
        assert_eq!(tracker.last(), None);
        assert_eq!(tracker.failed(), 0);
    }
}
