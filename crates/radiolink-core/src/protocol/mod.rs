//! Frame format used by the UDP radio emulation.

pub mod frame;

pub use frame::{decode_frame, encode_frame, AirFrame, FrameError, MAX_DATA_PAYLOAD};
