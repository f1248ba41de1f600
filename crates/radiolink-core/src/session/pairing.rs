//! The pairing state machine.
//!
//! A [`PairingSession`] owns everything one device needs to pair: its
//! [`DeviceConfig`], the radio driver, the [`PeerRegistry`], and the current
//! [`ConnectionStatus`].  The caller drives it by calling [`PairingSession::poll`]
//! as often as it likes; the session decides when to actually touch the radio.
//!
//! # Host role
//!
//! ```text
//! poll()
//!  ├─ radio not up yet?      init(Station)        fail → Error
//!  ├─ inside scan interval?  return status unchanged
//!  └─ scan → match prefixes → register new peers
//!        └─ count == required?  → Connected (registry frozen)
//! ```
//!
//! At most one scan cycle runs per `scan_interval` (1 s by default).  The
//! first cycle runs on the first poll.  Registration stops as soon as the
//! required number of peers is reached, so a busy neighbourhood can never
//! push the count past the target.
//!
//! # Satellite role
//!
//! A satellite never scans.  It brings the radio up advertising its device
//! name and reports `Connected` once a host has registered it (the driver
//! reports the acknowledgment) or the caller calls
//! [`PairingSession::acknowledge_pairing`].
//!
//! # Failure handling
//!
//! - Radio init failure is fatal: the session sits in `Error` until
//!   [`PairingSession::reinitialize`].
//! - A failed scan counts as "nothing heard" for that cycle.
//! - Bad addresses, duplicates, a full registry, or the driver refusing a peer
//!   skip that one candidate and the cycle carries on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::transport::{SendTracker, Transport};
use crate::domain::config::{ConfigError, DeviceConfig, Role};
use crate::domain::mac::MacAddress;
use crate::domain::matcher::match_candidates;
use crate::domain::registry::{PeerRecord, PeerRegistry};
use crate::domain::status::ConnectionStatus;
use crate::radio::{Radio, RadioError, RadioMode};

/// Minimum time between two scan cycles.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(1000);

/// Pause between two peer registrations within one cycle.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Timing knobs for a [`PairingSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub scan_interval: Duration,
    /// Pacing for the driver's peer table.  Not needed for correctness.
    pub settle_delay: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Discovery, matching and registration state for one device.
pub struct PairingSession<R: Radio> {
    config: DeviceConfig,
    timing: SessionTiming,
    radio: R,
    registry: PeerRegistry,
    status: ConnectionStatus,
    radio_ready: bool,
    last_cycle: Option<Instant>,
    last_error: Option<RadioError>,
    acknowledged: bool,
    scan_cycles: u64,
    tracker: Arc<SendTracker>,
}

impl<R: Radio> PairingSession<R> {
    /// Creates a session with default timing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` does not validate.
    pub fn new(config: DeviceConfig, radio: R) -> Result<Self, ConfigError> {
        Self::with_timing(config, radio, SessionTiming::default())
    }

    /// Creates a session with explicit timing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` does not validate.
    pub fn with_timing(
        config: DeviceConfig,
        radio: R,
        timing: SessionTiming,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let tracker = Arc::new(SendTracker::new());
        radio.set_send_handler(Some(tracker.handler(None)));

        Ok(Self {
            config,
            timing,
            radio,
            registry: PeerRegistry::new(),
            status: ConnectionStatus::Unconnected,
            radio_ready: false,
            last_cycle: None,
            last_error: None,
            acknowledged: false,
            scan_cycles: 0,
            tracker,
        })
    }

    /// Advances pairing using the current time.  See [`Self::poll_at`].
    pub fn poll(&mut self) -> ConnectionStatus {
        self.poll_at(Instant::now())
    }

    /// Advances pairing as if the clock read `now`, and returns the status.
    ///
    /// Idempotent once the session is `Connected` or `Error`.
    pub fn poll_at(&mut self, now: Instant) -> ConnectionStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        if !self.radio_ready {
            if let Err(e) = self.bring_up_radio() {
                error!("radio init failed: {e}");
                self.last_error = Some(e);
                self.set_status(ConnectionStatus::Error);
                return self.status;
            }
        }

        match self.config.role {
            Role::Host => self.poll_host(now),
            Role::Satellite => self.poll_satellite(),
        }
        self.status
    }

    fn bring_up_radio(&mut self) -> Result<(), RadioError> {
        let mode = match self.config.role {
            Role::Host => RadioMode::Station,
            Role::Satellite => RadioMode::Advertise {
                name: self.config.device_name.clone(),
                channel: self.config.channel,
            },
        };
        self.radio.init(&mode)?;
        self.radio_ready = true;
        info!("radio up as {:?}, address {}", self.config.role, self.radio.local_address());
        if self.config.role == Role::Satellite {
            info!("advertising {:?}", self.config.device_name);
        }
        Ok(())
    }

    fn poll_host(&mut self, now: Instant) {
        if let Some(last) = self.last_cycle {
            if now.saturating_duration_since(last) < self.timing.scan_interval {
                return;
            }
        }
        self.last_cycle = Some(now);
        self.run_scan_cycle();

        if self.registry.len() >= self.config.required_peer_count {
            self.set_status(ConnectionStatus::Connected);
        }
    }

    fn poll_satellite(&mut self) {
        if self.acknowledged || self.radio.pairing_acknowledged() {
            self.set_status(ConnectionStatus::Connected);
        }
    }

    /// One scan → match → register pass.
    fn run_scan_cycle(&mut self) {
        self.scan_cycles += 1;

        let candidates = match self.radio.scan() {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("scan cycle {} found nothing: {e}", self.scan_cycles);
                return;
            }
        };
        debug!(
            "scan cycle {}: {} candidate(s) heard",
            self.scan_cycles,
            candidates.len()
        );

        let matched = match_candidates(&candidates, &self.config.target_prefixes, self.config.channel);
        let mut inserted = 0usize;

        for peer in matched {
            if self.registry.len() >= self.config.required_peer_count {
                break;
            }
            if let Err(e) = self.registry.admit(&peer.address) {
                debug!("skipping {}: {e}", peer.name);
                continue;
            }

            if inserted > 0 && !self.timing.settle_delay.is_zero() {
                std::thread::sleep(self.timing.settle_delay);
            }

            let record = PeerRecord::new(peer.address, peer.channel);
            if self.radio.has_peer(&record.address) {
                debug!("{} already in the radio peer table", peer.address);
            } else if let Err(e) = self.radio.add_peer(&record) {
                warn!("radio refused peer {} ({}): {e}", peer.name, peer.address);
                continue;
            }

            match self.registry.try_add(record.address, record.channel) {
                Ok(index) => {
                    inserted += 1;
                    info!(">> peer {index}: {} [{}]", peer.name, peer.address);
                }
                Err(e) => debug!("skipping {}: {e}", peer.name),
            }
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            info!("pairing status {} -> {}", self.status, status);
            self.status = status;
        }
    }

    /// Marks a satellite as paired, e.g. after an application-level
    /// handshake.  Takes effect on the next poll; ignored by hosts.
    pub fn acknowledge_pairing(&mut self) {
        if self.config.role == Role::Host {
            warn!("acknowledge_pairing has no effect on a host");
            return;
        }
        self.acknowledged = true;
    }

    /// Throws away all pairing progress and returns to `Unconnected`.
    ///
    /// The radio is brought up again on the next poll.  Registered callbacks
    /// stay installed in the driver.
    pub fn reinitialize(&mut self) {
        info!("reinitialising pairing session");
        self.registry.clear();
        self.status = ConnectionStatus::Unconnected;
        self.radio_ready = false;
        self.last_cycle = None;
        self.last_error = None;
        self.acknowledged = false;
        self.scan_cycles = 0;
        self.tracker.reset();
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn timing(&self) -> SessionTiming {
        self.timing
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Number of peers registered so far.
    pub fn paired_count(&self) -> usize {
        self.registry.len()
    }

    /// `true` once pairing finished.
    pub fn is_paired(&self) -> bool {
        self.status.is_connected()
    }

    /// The error that put the session into `Error`, if any.
    pub fn last_error(&self) -> Option<&RadioError> {
        self.last_error.as_ref()
    }

    /// Scan cycles run since creation or the last reinitialisation.
    pub fn scan_cycles(&self) -> u64 {
        self.scan_cycles
    }

    pub fn local_address(&self) -> MacAddress {
        self.radio.local_address()
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Send/receive view over the registered peers.
    pub fn transport(&self) -> Transport<'_, R> {
        Transport::new(&self.registry, &self.radio, &self.tracker)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
