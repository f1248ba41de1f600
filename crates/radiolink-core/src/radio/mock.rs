//! Scripted radio double for tests.
//!
//! `MockRadio` is a cheap clone around shared state, so a test keeps one
//! handle for scripting and inspection while the session owns another.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use super::{Radio, RadioError, RadioMode, ReceiveHandler, SendHandler, SendStatus};
use crate::domain::mac::MacAddress;
use crate::domain::matcher::ScanCandidate;
use crate::domain::registry::PeerRecord;

/// Size of the driver's own peer table (ESP-NOW allows 20 unencrypted peers).
const MOCK_PEER_TABLE_SIZE: usize = 20;

#[derive(Default)]
struct MockState {
    local: MacAddress,
    init_failure: Option<String>,
    initialized: bool,
    mode: Option<RadioMode>,
    init_calls: u32,
    scans: VecDeque<Result<Vec<ScanCandidate>, RadioError>>,
    scan_count: u32,
    peers: Vec<PeerRecord>,
    add_peer_failures: HashSet<MacAddress>,
    send_failures: HashSet<MacAddress>,
    sent: Vec<(MacAddress, Vec<u8>)>,
    send_handler: Option<SendHandler>,
    receive_handler: Option<ReceiveHandler>,
    acknowledged: bool,
}

/// A mock implementation of [`Radio`] driven entirely by the test.
#[derive(Clone)]
pub struct MockRadio {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRadio {
    /// Creates a mock with a fixed local address of `02:00:00:00:00:01`.
    pub fn new() -> Self {
        Self::with_local_address(MacAddress::new([0x02, 0, 0, 0, 0, 0x01]))
    }

    pub fn with_local_address(local: MacAddress) -> Self {
        let state = MockState {
            local,
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock radio lock poisoned")
    }

    // ── Scripting ─────────────────────────────────────────────────────────────

    /// Queues the result of the next scan.  An empty queue scans nothing.
    pub fn push_scan(&self, candidates: Vec<ScanCandidate>) {
        self.lock().scans.push_back(Ok(candidates));
    }

    /// Queues a failing scan.
    pub fn push_scan_error(&self, message: &str) {
        self.lock()
            .scans
            .push_back(Err(RadioError::ScanUnavailable(message.to_string())));
    }

    /// Makes every `init` fail until [`Self::clear_init_failure`].
    pub fn fail_init(&self, message: &str) {
        self.lock().init_failure = Some(message.to_string());
    }

    pub fn clear_init_failure(&self) {
        self.lock().init_failure = None;
    }

    /// Makes `add_peer` refuse `address`.
    pub fn fail_add_peer(&self, address: MacAddress) {
        self.lock().add_peer_failures.insert(address);
    }

    /// Makes every send to `address` fail.
    pub fn fail_sends_to(&self, address: MacAddress) {
        self.lock().send_failures.insert(address);
    }

    /// Simulates a host registering this satellite.
    pub fn acknowledge(&self) {
        self.lock().acknowledged = true;
    }

    /// Delivers an inbound frame through the registered receive handler.
    ///
    /// Returns `false` if no handler is installed.
    pub fn deliver(&self, from: MacAddress, data: &[u8]) -> bool {
        let handler = self.lock().receive_handler.clone();
        match handler {
            Some(h) => {
                h(from, data);
                true
            }
            None => false,
        }
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    pub fn scan_count(&self) -> u32 {
        self.lock().scan_count
    }

    pub fn init_calls(&self) -> u32 {
        self.lock().init_calls
    }

    /// The mode of the last successful `init`.
    pub fn mode(&self) -> Option<RadioMode> {
        self.lock().mode.clone()
    }

    /// Peers registered with the driver, in registration order.
    pub fn peers(&self) -> Vec<PeerRecord> {
        self.lock().peers.clone()
    }

    /// Every frame successfully sent, in order.
    pub fn sent_frames(&self) -> Vec<(MacAddress, Vec<u8>)> {
        self.lock().sent.clone()
    }

    pub fn has_send_handler(&self) -> bool {
        self.lock().send_handler.is_some()
    }

    pub fn has_receive_handler(&self) -> bool {
        self.lock().receive_handler.is_some()
    }
}

impl Radio for MockRadio {
    fn init(&mut self, mode: &RadioMode) -> Result<(), RadioError> {
        let mut state = self.lock();
        state.init_calls += 1;
        if let Some(message) = &state.init_failure {
            return Err(RadioError::InitFailed(message.clone()));
        }
        state.initialized = true;
        state.mode = Some(mode.clone());
        Ok(())
    }

    fn scan(&mut self) -> Result<Vec<ScanCandidate>, RadioError> {
        let mut state = self.lock();
        if !state.initialized {
            return Err(RadioError::NotInitialized);
        }
        state.scan_count += 1;
        state.scans.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn add_peer(&mut self, peer: &PeerRecord) -> Result<(), RadioError> {
        let mut state = self.lock();
        if state.add_peer_failures.contains(&peer.address) {
            return Err(RadioError::PeerRejected(peer.address));
        }
        if state.peers.iter().any(|p| p.address == peer.address) {
            return Ok(());
        }
        if state.peers.len() >= MOCK_PEER_TABLE_SIZE {
            return Err(RadioError::PeerTableFull);
        }
        state.peers.push(*peer);
        Ok(())
    }

    fn has_peer(&self, address: &MacAddress) -> bool {
        self.lock().peers.iter().any(|p| p.address == *address)
    }

    fn send(&self, address: &MacAddress, data: &[u8]) -> Result<(), RadioError> {
        let (result, handler) = {
            let mut state = self.lock();
            if !state.initialized {
                return Err(RadioError::NotInitialized);
            }
            if !state.peers.iter().any(|p| p.address == *address) {
                return Err(RadioError::UnknownPeer(*address));
            }
            let result = if state.send_failures.contains(address) {
                Err(RadioError::SendFailed(format!("no ack from {address}")))
            } else {
                state.sent.push((*address, data.to_vec()));
                Ok(())
            };
            (result, state.send_handler.clone())
        };

        // Invoke outside the lock, the way a driver calls back later.
        if let Some(h) = handler {
            let status = if result.is_ok() {
                SendStatus::Success
            } else {
                SendStatus::Failure
            };
            h(*address, status);
        }
        result
    }

    fn set_send_handler(&self, handler: Option<SendHandler>) {
        self.lock().send_handler = handler;
    }

    fn set_receive_handler(&self, handler: Option<ReceiveHandler>) {
        self.lock().receive_handler = handler;
    }

    fn pairing_acknowledged(&self) -> bool {
        self.lock().acknowledged
    }

    fn local_address(&self) -> MacAddress {
        self.lock().local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(last: u8) -> PeerRecord {
        PeerRecord::new(MacAddress::new([0xAA, 0, 0, 0, 0, last]), 1)
    }

    #[test]
    fn test_scan_before_init_is_rejected() {
        let mut radio = MockRadio::new();
        assert_eq!(radio.scan(), Err(RadioError::NotInitialized));
        assert_eq!(radio.scan_count(), 0);
    }

    #[test]
    fn test_scripted_scans_are_returned_in_order() {
        // Arrange
        let mut radio = MockRadio::new();
        radio.init(&RadioMode::Station).unwrap();
        radio.push_scan(vec![ScanCandidate::new("a", "00:00:00:00:00:01")]);
        radio.push_scan_error("busy");

        // Act
        let first = radio.scan();
        let second = radio.scan();
        let third = radio.scan();

        // Assert
        assert_eq!(first.unwrap().len(), 1);
        assert!(matches!(second, Err(RadioError::ScanUnavailable(_))));
        assert_eq!(third, Ok(Vec::new()));
        assert_eq!(radio.scan_count(), 3);
    }

    #[test]
    fn test_init_failure_is_reported() {
        let mut radio = MockRadio::new();
        radio.fail_init("no wifi");
        assert!(matches!(
            radio.init(&RadioMode::Station),
            Err(RadioError::InitFailed(_))
        ));
        assert_eq!(radio.mode(), None);
    }

    #[test]
    fn test_send_to_unknown_peer_fails() {
        let mut radio = MockRadio::new();
        radio.init(&RadioMode::Station).unwrap();
        let result = radio.send(&peer(1).address, b"hi");
        assert_eq!(result, Err(RadioError::UnknownPeer(peer(1).address)));
    }

    #[test]
    fn test_send_records_frame_and_calls_handler() {
        // Arrange
        let mut radio = MockRadio::new();
        radio.init(&RadioMode::Station).unwrap();
        radio.add_peer(&peer(1)).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        radio.set_send_handler(Some(Arc::new(move |addr, status| {
            seen_clone.lock().unwrap().push((addr, status));
        })));

        // Act
        radio.send(&peer(1).address, b"hi").unwrap();

        // Assert
        assert_eq!(radio.sent_frames(), vec![(peer(1).address, b"hi".to_vec())]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(peer(1).address, SendStatus::Success)]
        );
    }

    #[test]
    fn test_failing_send_reports_failure_status() {
        let mut radio = MockRadio::new();
        radio.init(&RadioMode::Station).unwrap();
        radio.add_peer(&peer(2)).unwrap();
        radio.fail_sends_to(peer(2).address);
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        radio.set_send_handler(Some(Arc::new(move |_, status| {
            *seen_clone.lock().unwrap() = Some(status);
        })));

        assert!(radio.send(&peer(2).address, b"x").is_err());
        assert_eq!(*seen.lock().unwrap(), Some(SendStatus::Failure));
        assert!(radio.sent_frames().is_empty());
    }

    #[test]
    fn test_injected_refusal_is_a_peer_rejection() {
        let mut radio = MockRadio::new();
        radio.init(&RadioMode::Station).unwrap();
        radio.fail_add_peer(peer(3).address);

        let result = radio.add_peer(&peer(3));

        assert_eq!(result, Err(RadioError::PeerRejected(peer(3).address)));
        assert!(!radio.has_peer(&peer(3).address));
    }

    #[test]
    fn test_peer_table_limit_and_idempotent_re_add() {
        // Arrange
        let mut radio = MockRadio::new();
        radio.init(&RadioMode::Station).unwrap();
        for i in 0..MOCK_PEER_TABLE_SIZE as u8 {
            radio.add_peer(&peer(i)).unwrap();
        }

        // Act / Assert
        assert_eq!(radio.add_peer(&peer(0)), Ok(()));
        assert_eq!(radio.add_peer(&peer(200)), Err(RadioError::PeerTableFull));
        assert!(radio.has_peer(&peer(0).address));
        assert!(!radio.has_peer(&peer(200).address));
        assert_eq!(radio.peers().len(), MOCK_PEER_TABLE_SIZE);
    }

    #[test]
    fn test_deliver_without_handler_returns_false() {
        let radio = MockRadio::new();
        assert!(!radio.deliver(peer(1).address, b"x"));
    }
}
