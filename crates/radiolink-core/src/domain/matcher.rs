//! Name-prefix matching of scan results.
//!
//! Every device that wants to be found broadcasts an identifier string (its
//! "broadcast name") together with its hardware address.  The host is
//! configured with one or two name prefixes; a scan result is eligible when
//! its name starts with one of them.
//!
//! Matching is deliberately dumb: exact, case-sensitive, byte-wise comparison
//! from position 0.  `"uMind-01"` matches `"uMind"`, `"xuMind"` and `"umind-01"`
//! do not.
//!
//! The matcher never touches the registry.  It turns a scan snapshot into a
//! list of [`MatchedPeer`]s and leaves duplicate suppression and capacity
//! checks to [`super::registry::PeerRegistry`].

use tracing::{debug, warn};

use super::mac::MacAddress;

/// One entry of a scan snapshot.  Discarded after matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCandidate {
    /// Advertised broadcast name.
    pub name: String,
    /// Advertised hardware address, colon-hex formatted.
    pub address_text: String,
    /// Signal strength in dBm, when the driver reports it.
    pub rssi: Option<i32>,
}

impl ScanCandidate {
    pub fn new(name: impl Into<String>, address_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address_text: address_text.into(),
            rssi: None,
        }
    }

    /// Attaches a signal-strength hint.
    #[must_use]
    pub fn with_rssi(mut self, rssi: i32) -> Self {
        self.rssi = Some(rssi);
        self
    }
}

/// A candidate that matched a prefix and carried a well-formed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPeer {
    pub address: MacAddress,
    /// Always the configured fixed channel, never the channel the candidate
    /// was heard on.
    pub channel: u8,
    pub name: String,
}

/// Returns the first prefix that `name` starts with.
pub fn matching_prefix<'p>(name: &str, prefixes: &'p [String]) -> Option<&'p str> {
    prefixes
        .iter()
        .map(String::as_str)
        .find(|prefix| name.as_bytes().starts_with(prefix.as_bytes()))
}

/// Filters `candidates` against `prefixes` and parses the addresses of the
/// ones that match.
///
/// A candidate matching several prefixes is reported once.  A matching
/// candidate whose address does not parse is dropped without affecting the
/// rest of the snapshot.  Output order follows input order.
pub fn match_candidates(
    candidates: &[ScanCandidate],
    prefixes: &[String],
    channel: u8,
) -> Vec<MatchedPeer> {
    let mut matched = Vec::new();

    for (i, candidate) in candidates.iter().enumerate() {
        debug!("{}: {} [{}]", i + 1, candidate.name, candidate.address_text);

        let Some(prefix) = matching_prefix(&candidate.name, prefixes) else {
            continue;
        };

        match candidate.address_text.parse::<MacAddress>() {
            Ok(address) => {
                debug!("{} matched prefix {prefix:?} at {address}", candidate.name);
                matched.push(MatchedPeer {
                    address,
                    channel,
                    name: candidate.name.clone(),
                });
            }
            Err(e) => {
                warn!(
                    "dropping {} ({:?}): {e}",
                    candidate.name, candidate.address_text
                );
            }
        }
    }

    matched
}
