//! 48-bit hardware addresses.
//!
//! Scan results report the address of each advertising device as text in the
//! usual colon-separated form (`aa:bb:cc:dd:ee:ff`).  That text is the
//! compatibility point with the radio driver, so parsing is strict: exactly
//! six fields, each exactly two hexadecimal digits.  Anything else is rejected
//! and the candidate carrying it is dropped by the matcher.
//!
//! # Locally administered addresses
//!
//! The UDP emulation backend has no burned-in hardware address, so it makes
//! one up with [`MacAddress::random_local`].  The generated address has the
//! "locally administered" bit set and the "multicast" bit clear, the same
//! convention real NICs use for software-assigned addresses.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// Number of octets in a hardware address.
pub const MAC_LEN: usize = 6;

/// Error returned when address text is not six colon-separated hex octets.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddressParseError {
    /// The text did not split into exactly six fields on `:`.
    #[error("invalid address format: expected 6 colon-separated octets, found {found}")]
    WrongFieldCount { found: usize },

    /// A field was not exactly two hexadecimal digits.
    #[error("invalid address format: octet {position} ({field:?}) is not two hex digits")]
    InvalidOctet { position: usize, field: String },
}

/// A 6-byte hardware address identifying one radio peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddress([u8; MAC_LEN]);

impl MacAddress {
    /// The all-ones broadcast address.
    pub const BROADCAST: Self = Self([0xFF; MAC_LEN]);

    /// Wraps raw octets.
    pub const fn new(octets: [u8; MAC_LEN]) -> Self {
        Self(octets)
    }

    /// Returns the raw octets.
    pub const fn octets(&self) -> [u8; MAC_LEN] {
        self.0
    }

    /// Returns `true` for `ff:ff:ff:ff:ff:ff`.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Returns `true` if the locally-administered bit is set.
    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }

    /// Returns `true` if the group (multicast) bit is set.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Generates a random locally-administered unicast address.
    pub fn random_local() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let mut octets = [0u8; MAC_LEN];
        octets.copy_from_slice(&bytes[..MAC_LEN]);
        octets[0] = (octets[0] | 0x02) & !0x01;
        Self(octets)
    }
}

impl From<[u8; MAC_LEN]> for MacAddress {
    fn from(octets: [u8; MAC_LEN]) -> Self {
        Self(octets)
    }
}

impl FromStr for MacAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != MAC_LEN {
            return Err(AddressParseError::WrongFieldCount {
                found: fields.len(),
            });
        }

        let mut octets = [0u8; MAC_LEN];
        for (position, (field, slot)) in fields.iter().zip(octets.iter_mut()).enumerate() {
            // from_str_radix alone would accept "+f" and single digits.
            if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(AddressParseError::InvalidOctet {
                    position,
                    field: (*field).to_string(),
                });
            }
            *slot = u8::from_str_radix(field, 16).map_err(|_| AddressParseError::InvalidOctet {
                position,
                field: (*field).to_string(),
            })?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lowercase_address() {
        // Arrange
        let text = "aa:bb:cc:dd:ee:ff";

        // Act
        let mac: MacAddress = text.parse().expect("valid address");

        // Assert
        assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn test_parse_uppercase_and_mixed_case_address() {
        let mac: MacAddress = "0A:1b:C2:d3:E4:f5".parse().expect("valid address");
        assert_eq!(mac.octets(), [0x0A, 0x1B, 0xC2, 0xD3, 0xE4, 0xF5]);
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert_eq!(
            "aa:bb:cc:dd:ee".parse::<MacAddress>(),
            Err(AddressParseError::WrongFieldCount { found: 5 })
        );
        assert_eq!(
            "bad-mac".parse::<MacAddress>(),
            Err(AddressParseError::WrongFieldCount { found: 1 })
        );
    }

    #[test]
    fn test_parse_rejects_non_hex_digit() {
        let result = "aa:bb:cc:dd:ee:fg".parse::<MacAddress>();
        assert_eq!(
            result,
            Err(AddressParseError::InvalidOctet {
                position: 5,
                field: "fg".to_string()
            })
        );
    }

    #[test]
    fn test_parse_rejects_single_and_triple_digit_fields() {
        assert!("a:bb:cc:dd:ee:ff".parse::<MacAddress>().is_err());
        assert!("aaa:bb:cc:dd:ee:ff".parse::<MacAddress>().is_err());
        assert!("+a:bb:cc:dd:ee:ff".parse::<MacAddress>().is_err());
        assert!("".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_display_is_lowercase_colon_hex() {
        let mac = MacAddress::new([0x01, 0xAB, 0x00, 0xFF, 0x10, 0x9C]);
        assert_eq!(mac.to_string(), "01:ab:00:ff:10:9c");
    }

    #[test]
    fn test_display_output_parses_back_to_same_address() {
        let mac = MacAddress::new([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
        assert_eq!(mac.to_string().parse::<MacAddress>(), Ok(mac));
    }

    #[test]
    fn test_random_local_sets_local_bit_and_clears_multicast_bit() {
        for _ in 0..32 {
            let mac = MacAddress::random_local();
            assert!(mac.is_locally_administered());
            assert!(!mac.is_multicast());
            assert!(!mac.is_broadcast());
        }
    }

    #[test]
    fn test_broadcast_constant() {
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert_eq!(MacAddress::BROADCAST.to_string(), "ff:ff:ff:ff:ff:ff");
    }
}
