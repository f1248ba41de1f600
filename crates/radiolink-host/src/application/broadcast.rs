//! Broadcast use case: send one text message to every paired satellite.

use radiolink_core::{Radio, Transport, TransportError};
use tracing::{debug, warn};

/// Result of one [`greet_all`] round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GreetReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Sends `message` to every registered peer.
///
/// A failing peer does not stop delivery to the others; each failure is
/// logged and counted.
pub fn greet_all<R: Radio>(transport: &Transport<'_, R>, message: &str) -> GreetReport {
    let total = transport.peer_count();

    match transport.print_all(message) {
        Ok(()) => {
            debug!("sent {message:?} to {total} peer(s)");
            GreetReport {
                delivered: total,
                failed: 0,
            }
        }
        Err(TransportError::PartialFailure { failed }) => {
            for address in &failed {
                warn!("[{address}]: Send Failed");
            }
            GreetReport {
                delivered: total.saturating_sub(failed.len()),
                failed: failed.len(),
            }
        }
        Err(e) => {
            warn!("broadcast failed: {e}");
            GreetReport {
                delivered: 0,
                failed: total,
            }
        }
    }
}
