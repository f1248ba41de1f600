//! PairSatellites use case: poll a host session until pairing is settled.
//!
//! [`PairingSession::poll`] does one bounded step of work per call.  This use
//! case owns the loop around it and decides when to stop:
//!
//! ```text
//! loop
//!  ├─ poll()                    Connected / Error  → done
//!  ├─ timeout passed, ≥1 peer?                     → done (accept partial)
//!  ├─ shutdown requested?                          → done
//!  └─ sleep(pause)
//! ```
//!
//! With zero peers the timeout does not end pairing; a host with nobody to
//! talk to keeps looking until it is told to shut down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use radiolink_core::{ConnectionStatus, MacAddress, PairingSession, Radio};
use tracing::{info, warn};

/// How pairing ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingOutcome {
    pub status: ConnectionStatus,
    /// Registered peers, in registration order.
    pub peers: Vec<MacAddress>,
    pub elapsed: Duration,
}

impl PairingOutcome {
    /// `true` if at least one satellite can be sent to.
    pub fn has_peers(&self) -> bool {
        !self.peers.is_empty()
    }
}

/// Drives `session` until it connects, fails, or settles after `timeout`.
///
/// `running` is checked between polls; clearing it ends pairing early with
/// whatever was found.
pub fn pair_until<R: Radio>(
    session: &mut PairingSession<R>,
    timeout: Duration,
    pause: Duration,
    running: &AtomicBool,
) -> PairingOutcome {
    let started = Instant::now();
    let required = session.config().required_peer_count;
    info!(
        "pairing: looking for {required} satellite(s) named {:?}",
        session.config().target_prefixes
    );

    let status = loop {
        let status = session.poll();
        if status.is_terminal() {
            break status;
        }

        if started.elapsed() >= timeout && session.paired_count() > 0 {
            warn!(
                "pairing timed out with {}/{required} satellite(s), continuing with those",
                session.paired_count()
            );
            break status;
        }

        if !running.load(Ordering::Relaxed) {
            info!("pairing interrupted");
            break status;
        }

        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
    };

    let outcome = PairingOutcome {
        status,
        peers: session.registry().addresses(),
        elapsed: started.elapsed(),
    };
    info!(
        "pairing finished: {} with {} peer(s) after {:?}",
        outcome.status,
        outcome.peers.len(),
        outcome.elapsed
    );
    outcome
}

// ── Tests ─────────────────────────────────────────────────────────────────────
