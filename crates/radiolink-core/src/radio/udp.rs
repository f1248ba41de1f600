//! Broadcast radio link emulated over UDP.
//!
//! Lets a host and its satellites run as ordinary processes on one machine
//! or one LAN, with the same pairing behaviour as on real radio hardware.
//!
//! # How the emulated air works
//!
//! 1. A satellite binds an ephemeral UDP port and, every `beacon_interval`,
//!    sends a `Beacon` frame (its broadcast name, its address as text, and its
//!    data port) to the configured *air address*.  The air address is the
//!    host's listening socket, or the LAN broadcast address.
//!
//! 2. The host binds the air port and a background thread receives every
//!    frame.  A [`Radio::scan`] call opens a `scan_window`; beacons heard
//!    inside it go into the scan snapshot, and their UDP endpoints are kept
//!    for the following `add_peer`.  Beacons outside a window are dropped.
//!
//! 3. [`Radio::add_peer`] sends a `PairAck` frame to the satellite; the
//!    satellite's background thread flips its acknowledgment flag, which is
//!    what moves the satellite's session to `Connected`.
//!
//! 4. [`Radio::send`] wraps the payload in a `Data` frame.  The receiver's
//!    background thread hands it to the registered receive handler.
//!
//! # Read timeout
//!
//! The socket has a short read timeout so the background thread can notice
//! shutdown and keep beaconing even when nothing arrives.

use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::{Radio, RadioError, RadioMode, ReceiveHandler, SendHandler, SendStatus};
use crate::domain::mac::MacAddress;
use crate::domain::matcher::ScanCandidate;
use crate::domain::registry::PeerRecord;
use crate::protocol::frame::{decode_frame, encode_frame, AirFrame};

/// Default UDP port of the emulated air.
pub const DEFAULT_AIR_PORT: u16 = 24900;

/// Peer-table size of the emulated driver.
const PEER_TABLE_SIZE: usize = 20;

/// Most distinct beacons remembered during one scan window.
const SCAN_LIMIT: usize = 64;

const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Settings for [`UdpRadio`].
#[derive(Debug, Clone)]
pub struct UdpRadioConfig {
    /// Local socket address.  Hosts bind the air port; satellites usually
    /// bind port 0.
    pub bind_addr: SocketAddr,
    /// Where satellites send beacons.
    pub air_addr: SocketAddr,
    /// How long one scan listens for beacons.
    pub scan_window: Duration,
    /// Interval between satellite beacons.
    pub beacon_interval: Duration,
    /// Fixed hardware address; a random local one is generated when `None`.
    pub local_address: Option<MacAddress>,
}

impl Default for UdpRadioConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_AIR_PORT)),
            air_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_AIR_PORT)),
            scan_window: Duration::from_millis(300),
            beacon_interval: Duration::from_millis(200),
            local_address: None,
        }
    }
}

/// State shared between the owning [`UdpRadio`] and its background thread.
struct Shared {
    local: MacAddress,
    scanning: AtomicBool,
    heard: Mutex<Vec<ScanCandidate>>,
    /// Advertised address → data endpoint, learned from beacons heard in the
    /// latest scan.  Bounded by [`SCAN_LIMIT`].
    directory: Mutex<HashMap<MacAddress, SocketAddr>>,
    /// Registered send targets.  Bounded by [`PEER_TABLE_SIZE`].
    peers: Mutex<HashMap<MacAddress, SocketAddr>>,
    acknowledged: AtomicBool,
    send_handler: Mutex<Option<SendHandler>>,
    receive_handler: Mutex<Option<ReceiveHandler>>,
}

/// A [`Radio`] that speaks [`AirFrame`]s over UDP.
pub struct UdpRadio {
    config: UdpRadioConfig,
    shared: Arc<Shared>,
    socket: Option<Arc<UdpSocket>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Shared {
    fn new(local: MacAddress) -> Self {
        Self {
            local,
            scanning: AtomicBool::new(false),
            heard: Mutex::new(Vec::new()),
            directory: Mutex::new(HashMap::new()),
            peers: Mutex::new(HashMap::new()),
            acknowledged: AtomicBool::new(false),
            send_handler: Mutex::new(None),
            receive_handler: Mutex::new(None),
        }
    }
}

impl UdpRadio {
    /// Creates an uninitialised radio.  No socket is bound until
    /// [`Radio::init`].
    pub fn new(config: UdpRadioConfig) -> Self {
        let local = config.local_address.unwrap_or_else(MacAddress::random_local);
        let shared = Arc::new(Shared::new(local));
        Self {
            config,
            shared,
            socket: None,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// The bound socket address, once initialised.
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn socket(&self) -> Result<&Arc<UdpSocket>, RadioError> {
        self.socket.as_ref().ok_or(RadioError::NotInitialized)
    }

    fn send_frame(&self, frame: &AirFrame, dest: SocketAddr) -> Result<(), RadioError> {
        let bytes = encode_frame(frame).map_err(|e| RadioError::SendFailed(e.to_string()))?;
        self.socket()?
            .send_to(&bytes, dest)
            .map_err(|e| RadioError::SendFailed(format!("{dest}: {e}")))?;
        Ok(())
    }
}

impl Radio for UdpRadio {
    fn init(&mut self, mode: &RadioMode) -> Result<(), RadioError> {
        if self.socket.is_some() {
            return Ok(());
        }

        let socket = UdpSocket::bind(self.config.bind_addr).map_err(|e| {
            RadioError::InitFailed(format!("bind {}: {e}", self.config.bind_addr))
        })?;
        socket
            .set_read_timeout(Some(READ_TIMEOUT))
            .map_err(|e| RadioError::InitFailed(e.to_string()))?;
        socket
            .set_broadcast(true)
            .map_err(|e| RadioError::InitFailed(e.to_string()))?;
        let socket = Arc::new(socket);

        let beacon = match mode {
            RadioMode::Station => None,
            RadioMode::Advertise { name, .. } => {
                let data_port = socket
                    .local_addr()
                    .map_err(|e| RadioError::InitFailed(e.to_string()))?
                    .port();
                let frame = AirFrame::Beacon {
                    name: name.clone(),
                    address_text: self.shared.local.to_string(),
                    data_port,
                };
                let bytes =
                    encode_frame(&frame).map_err(|e| RadioError::InitFailed(e.to_string()))?;
                Some(Beacon {
                    bytes,
                    dest: self.config.air_addr,
                    interval: self.config.beacon_interval,
                })
            }
        };

        self.running.store(true, Ordering::Relaxed);
        let worker = {
            let socket = Arc::clone(&socket);
            let shared = Arc::clone(&self.shared);
            let running = Arc::clone(&self.running);
            std::thread::Builder::new()
                .name("radiolink-air".to_string())
                .spawn(move || air_loop(&socket, &shared, &running, beacon))
                .map_err(|e| RadioError::InitFailed(format!("spawn air thread: {e}")))?
        };

        info!(
            "udp radio {} up on {} ({mode:?})",
            self.shared.local,
            socket
                .local_addr()
                .map_or_else(|_| "?".to_string(), |a| a.to_string())
        );
        self.socket = Some(socket);
        self.worker = Some(worker);
        Ok(())
    }

    fn scan(&mut self) -> Result<Vec<ScanCandidate>, RadioError> {
        self.socket()?;
        if !self.running.load(Ordering::Relaxed) {
            return Err(RadioError::ScanUnavailable("air thread stopped".to_string()));
        }

        lock(&self.shared.heard).clear();
        lock(&self.shared.directory).clear();
        self.shared.scanning.store(true, Ordering::Release);
        std::thread::sleep(self.config.scan_window);
        self.shared.scanning.store(false, Ordering::Release);

        Ok(std::mem::take(&mut *lock(&self.shared.heard)))
    }

    fn add_peer(&mut self, peer: &PeerRecord) -> Result<(), RadioError> {
        let endpoint = lock(&self.shared.directory)
            .get(&peer.address)
            .copied()
            .ok_or(RadioError::UnknownPeer(peer.address))?;

        {
            let mut peers = lock(&self.shared.peers);
            if !peers.contains_key(&peer.address) && peers.len() >= PEER_TABLE_SIZE {
                return Err(RadioError::PeerTableFull);
            }
            peers.insert(peer.address, endpoint);
        }

        self.send_frame(
            &AirFrame::PairAck {
                host: self.shared.local,
            },
            endpoint,
        )
    }

    fn has_peer(&self, address: &MacAddress) -> bool {
        lock(&self.shared.peers).contains_key(address)
    }

    fn send(&self, address: &MacAddress, data: &[u8]) -> Result<(), RadioError> {
        let endpoint = lock(&self.shared.peers)
            .get(address)
            .copied()
            .ok_or(RadioError::UnknownPeer(*address))?;

        let result = self.send_frame(
            &AirFrame::Data {
                source: self.shared.local,
                payload: data.to_vec(),
            },
            endpoint,
        );

        let handler = lock(&self.shared.send_handler).clone();
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
        *lock(&self.shared.send_handler) = handler;
    }

    fn set_receive_handler(&self, handler: Option<ReceiveHandler>) {
        *lock(&self.shared.receive_handler) = handler;
    }

    fn pairing_acknowledged(&self) -> bool {
        self.shared.acknowledged.load(Ordering::Acquire)
    }

    fn local_address(&self) -> MacAddress {
        self.shared.local
    }
}

impl Drop for UdpRadio {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("air thread panicked");
            }
        }
    }
}

// ── Background thread ─────────────────────────────────────────────────────────

struct Beacon {
    bytes: Vec<u8>,
    dest: SocketAddr,
    interval: Duration,
}

fn air_loop(socket: &UdpSocket, shared: &Shared, running: &AtomicBool, beacon: Option<Beacon>) {
    let mut buf = vec![0u8; 2048];
    let mut last_beacon: Option<Instant> = None;

    while running.load(Ordering::Relaxed) {
        if let Some(b) = &beacon {
            let due = last_beacon.map_or(true, |t| t.elapsed() >= b.interval);
            if due {
                if let Err(e) = socket.send_to(&b.bytes, b.dest) {
                    debug!("beacon to {} failed: {e}", b.dest);
                }
                last_beacon = Some(Instant::now());
            }
        }

        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                warn!("air recv error: {e}");
                continue;
            }
        };

        match decode_frame(&buf[..len]) {
            Ok(frame) => handle_frame(shared, frame, src),
            Err(e) => debug!("ignoring undecodable frame from {src}: {e}"),
        }
    }

    debug!("air thread for {} stopped", shared.local);
}

fn handle_frame(shared: &Shared, frame: AirFrame, src: SocketAddr) {
    match frame {
        AirFrame::Beacon {
            name,
            address_text,
            data_port,
        } => {
            if !shared.scanning.load(Ordering::Acquire) {
                return;
            }
            if let Ok(address) = address_text.parse::<MacAddress>() {
                if address == shared.local {
                    return;
                }
                let mut directory = lock(&shared.directory);
                if directory.contains_key(&address) || directory.len() < SCAN_LIMIT {
                    directory.insert(address, SocketAddr::new(src.ip(), data_port));
                }
            }
            let mut heard = lock(&shared.heard);
            let seen = heard
                .iter()
                .any(|c| c.name == name && c.address_text == address_text);
            if !seen {
                if heard.len() >= SCAN_LIMIT {
                    debug!("scan full, ignoring beacon {name:?} from {src}");
                    return;
                }
                heard.push(ScanCandidate::new(name, address_text));
            }
        }
        AirFrame::PairAck { host } => {
            {
                let mut peers = lock(&shared.peers);
                if !peers.contains_key(&host) && peers.len() >= PEER_TABLE_SIZE {
                    warn!("peer table full, ignoring pair ack from {host} ({src})");
                    return;
                }
                peers.insert(host, src);
            }
            info!("paired by host {host} ({src})");
            shared.acknowledged.store(true, Ordering::Release);
        }
        AirFrame::Data { source, payload } => {
            let handler = lock(&shared.receive_handler).clone();
            match handler {
                Some(h) => h(source, &payload),
                None => debug!("dropping {} bytes from {source}: no receive handler", payload.len()),
            }
        }
    }
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

/// A poisoned lock only means a handler panicked; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
