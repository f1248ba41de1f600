//! Binary codec for the frames the UDP radio emulation puts on the air.
//!
//! Wire format:
//! ```text
//! [version:1][frame_type:1][payload_len:2][payload:N]
//! ```
//! Header size is 4 bytes; `payload_len` is big-endian.
//!
//! Payloads by frame type:
//!
//! | type | frame     | payload                                            |
//! |------|-----------|----------------------------------------------------|
//! | 0x01 | `Beacon`  | `[name:str][address_text:str][data_port:u16]`      |
//! | 0x02 | `PairAck` | `[host:6]`                                         |
//! | 0x03 | `Data`    | `[source:6][bytes...]`                             |
//!
//! `str` is `[len:1][utf8 bytes]`.  A `Data` frame carries at most
//! [`MAX_DATA_PAYLOAD`] bytes, the size of one ESP-NOW frame; there is no
//! fragmentation.

use thiserror::Error;

use crate::domain::mac::{MacAddress, MAC_LEN};

/// Current frame format version.
pub const FRAME_VERSION: u8 = 0x01;

/// Size of the fixed frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Largest payload a single `Data` frame may carry.
pub const MAX_DATA_PAYLOAD: usize = 250;

const TYPE_BEACON: u8 = 0x01;
const TYPE_PAIR_ACK: u8 = 0x02;
const TYPE_DATA: u8 = 0x03;

/// Errors raised while encoding or decoding a frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown frame type: 0x{0:02X}")]
    UnknownFrameType(u8),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("payload of {actual} bytes exceeds the {max}-byte frame limit")]
    PayloadTooLarge { max: usize, actual: usize },
}

/// One frame on the emulated air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AirFrame {
    /// Periodic advertisement from a satellite.
    Beacon {
        name: String,
        address_text: String,
        /// UDP port the satellite receives data frames on.
        data_port: u16,
    },
    /// Sent by a host when it registers a satellite.
    PairAck { host: MacAddress },
    /// Opaque application payload.
    Data {
        source: MacAddress,
        payload: Vec<u8>,
    },
}

impl AirFrame {
    fn frame_type(&self) -> u8 {
        match self {
            Self::Beacon { .. } => TYPE_BEACON,
            Self::PairAck { .. } => TYPE_PAIR_ACK,
            Self::Data { .. } => TYPE_DATA,
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes `frame` including its header.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLarge`] for oversized data payloads and
/// [`FrameError::Malformed`] for strings longer than 255 bytes.
pub fn encode_frame(frame: &AirFrame) -> Result<Vec<u8>, FrameError> {
    let mut payload = Vec::new();
    match frame {
        AirFrame::Beacon {
            name,
            address_text,
            data_port,
        } => {
            put_str(&mut payload, name)?;
            put_str(&mut payload, address_text)?;
            payload.extend_from_slice(&data_port.to_be_bytes());
        }
        AirFrame::PairAck { host } => payload.extend_from_slice(&host.octets()),
        AirFrame::Data {
            source,
            payload: data,
        } => {
            if data.len() > MAX_DATA_PAYLOAD {
                return Err(FrameError::PayloadTooLarge {
                    max: MAX_DATA_PAYLOAD,
                    actual: data.len(),
                });
            }
            payload.extend_from_slice(&source.octets());
            payload.extend_from_slice(data);
        }
    }

    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.push(FRAME_VERSION);
    buf.push(frame.frame_type());
    // Bounded by the checks above: two 255-byte strings or 256 data bytes.
    buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decodes one frame from the start of `bytes`.
///
/// # Errors
///
/// Returns [`FrameError`] if the bytes are truncated or malformed.
pub fn decode_frame(bytes: &[u8]) -> Result<AirFrame, FrameError> {
    if bytes.len() < FRAME_HEADER_SIZE {
        return Err(FrameError::InsufficientData {
            needed: FRAME_HEADER_SIZE,
            available: bytes.len(),
        });
    }
    if bytes[0] != FRAME_VERSION {
        return Err(FrameError::UnsupportedVersion(bytes[0]));
    }

    let frame_type = bytes[1];
    let payload_len = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    let total = FRAME_HEADER_SIZE + payload_len;
    if bytes.len() < total {
        return Err(FrameError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }
    let mut cursor = Cursor::new(&bytes[FRAME_HEADER_SIZE..total]);

    let frame = match frame_type {
        TYPE_BEACON => {
            let name = cursor.take_str()?;
            let address_text = cursor.take_str()?;
            let port = cursor.take(2)?;
            AirFrame::Beacon {
                name,
                address_text,
                data_port: u16::from_be_bytes([port[0], port[1]]),
            }
        }
        TYPE_PAIR_ACK => AirFrame::PairAck {
            host: cursor.take_mac()?,
        },
        TYPE_DATA => {
            let source = cursor.take_mac()?;
            let payload = cursor.rest().to_vec();
            if payload.len() > MAX_DATA_PAYLOAD {
                return Err(FrameError::PayloadTooLarge {
                    max: MAX_DATA_PAYLOAD,
                    actual: payload.len(),
                });
            }
            AirFrame::Data { source, payload }
        }
        other => return Err(FrameError::UnknownFrameType(other)),
    };
    Ok(frame)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn put_str(buf: &mut Vec<u8>, s: &str) -> Result<(), FrameError> {
    let len = u8::try_from(s.len())
        .map_err(|_| FrameError::Malformed(format!("string of {} bytes is too long", s.len())))?;
    buf.push(len);
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FrameError> {
        let end = self.pos + n;
        if end > self.bytes.len() {
            return Err(FrameError::Malformed(format!(
                "payload truncated at byte {}",
                self.pos
            )));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_str(&mut self) -> Result<String, FrameError> {
        let len = self.take(1)?[0] as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|e| FrameError::Malformed(e.to_string()))
    }

    fn take_mac(&mut self) -> Result<MacAddress, FrameError> {
        let raw = self.take(MAC_LEN)?;
        let mut octets = [0u8; MAC_LEN];
        octets.copy_from_slice(raw);
        Ok(MacAddress::new(octets))
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        slice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> MacAddress {
        MacAddress::new([0x02, 0x11, 0x22, 0x33, 0x44, 0x55])
    }

    #[test]
    fn test_beacon_header_layout() {
        // Arrange
        let frame = AirFrame::Beacon {
            name: "uMind".to_string(),
            address_text: "aa:bb:cc:dd:ee:ff".to_string(),
            data_port: 24901,
        };

        // Act
        let bytes = encode_frame(&frame).unwrap();

        // Assert
        assert_eq!(bytes[0], FRAME_VERSION);
        assert_eq!(bytes[1], TYPE_BEACON);
        let declared = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        assert_eq!(declared, bytes.len() - FRAME_HEADER_SIZE);
        assert_eq!(decode_frame(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_pair_ack_payload_is_the_host_address() {
        let bytes = encode_frame(&AirFrame::PairAck { host: host() }).unwrap();
        assert_eq!(&bytes[FRAME_HEADER_SIZE..], &host().octets());
    }

    #[test]
    fn test_empty_data_frame_decodes() {
        let frame = AirFrame::Data {
            source: host(),
            payload: Vec::new(),
        };
        let bytes = encode_frame(&frame).unwrap();
        assert_eq!(decode_frame(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_oversized_data_payload_is_rejected() {
        let frame = AirFrame::Data {
            source: host(),
            payload: vec![0u8; MAX_DATA_PAYLOAD + 1],
        };
        assert_eq!(
            encode_frame(&frame),
            Err(FrameError::PayloadTooLarge {
                max: MAX_DATA_PAYLOAD,
                actual: MAX_DATA_PAYLOAD + 1
            })
        );
    }

    #[test]
    fn test_max_size_data_payload_is_accepted() {
        let frame = AirFrame::Data {
            source: host(),
            payload: vec![0xAB; MAX_DATA_PAYLOAD],
        };
        let bytes = encode_frame(&frame).unwrap();
        assert_eq!(decode_frame(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_decode_rejects_short_header() {
        assert_eq!(
            decode_frame(&[FRAME_VERSION, TYPE_DATA]),
            Err(FrameError::InsufficientData {
                needed: FRAME_HEADER_SIZE,
                available: 2
            })
        );
    }

    #[test]
    fn test_decode_rejects_wrong_version() {
        assert_eq!(
            decode_frame(&[0x09, TYPE_DATA, 0, 0]),
            Err(FrameError::UnsupportedVersion(0x09))
        );
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert_eq!(
            decode_frame(&[FRAME_VERSION, 0x7F, 0, 0]),
            Err(FrameError::UnknownFrameType(0x7F))
        );
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let mut bytes = encode_frame(&AirFrame::PairAck { host: host() }).unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(
            decode_frame(&bytes),
            Err(FrameError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_beacon_with_bad_string_length() {
        // Declared name length of 10 but only 2 bytes follow.
        let bytes = [FRAME_VERSION, TYPE_BEACON, 0, 3, 10, b'a', b'b'];
        assert!(matches!(decode_frame(&bytes), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn test_encode_rejects_overlong_name() {
        let frame = AirFrame::Beacon {
            name: "x".repeat(256),
            address_text: String::new(),
            data_port: 1,
        };
        assert!(matches!(encode_frame(&frame), Err(FrameError::Malformed(_))));
    }
}
