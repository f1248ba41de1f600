//! AwaitPairing use case: advertise and wait for a host.
//!
//! The first poll brings the radio up in advertise mode; every later poll
//! only checks whether a host has acknowledged us.  A satellite never scans.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use radiolink_core::{ConnectionStatus, PairingSession, Radio};
use tracing::info;

/// Polls `session` every `pause` until it is `Connected`, hits `Error`, or
/// `running` clears.  Returns the last status.
pub fn wait_for_host<R: Radio>(
    session: &mut PairingSession<R>,
    pause: Duration,
    running: &AtomicBool,
) -> ConnectionStatus {
    info!(
        "advertising {:?} as {}, waiting for a host",
        session.config().device_name,
        session.local_address()
    );

    loop {
        let status = session.poll();
        if status.is_terminal() {
            return status;
        }
        if !running.load(Ordering::Relaxed) {
            info!("stopped waiting for a host");
            return status;
        }
        std::thread::sleep(pause);
    }
}
