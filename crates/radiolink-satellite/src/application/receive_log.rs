//! ReceiveLog use case: get inbound frames out of callback context.
//!
//! The radio calls the receive handler from its own thread, where only quick
//! work is allowed.  [`forward_frames`] builds a handler that copies the
//! frame onto an unbounded Tokio channel and returns immediately; the async
//! side drains the channel and logs each frame with [`format_frame`].

use radiolink_core::MacAddress;
use tokio::sync::mpsc;
use tracing::debug;

/// One inbound frame, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub from: MacAddress,
    pub data: Vec<u8>,
}

/// Renders a frame as `"[<mac>]: <text>"`.  Invalid UTF-8 is replaced, not
/// rejected.
pub fn format_frame(address: &MacAddress, data: &[u8]) -> String {
    format!("[{address}]: {}", String::from_utf8_lossy(data))
}

/// Creates a receive handler that forwards every frame into `tx`.
///
/// Frames arriving after the receiver is dropped are discarded.
pub fn forward_frames(
    tx: mpsc::UnboundedSender<ReceivedFrame>,
) -> impl Fn(MacAddress, &[u8]) + Send + Sync + 'static {
    move |from: MacAddress, data: &[u8]| {
        let frame = ReceivedFrame {
            from,
            data: data.to_vec(),
        };
        if tx.send(frame).is_err() {
            debug!("dropping frame from {from}: receiver closed");
        }
    }
}
