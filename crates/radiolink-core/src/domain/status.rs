//! Externally visible pairing progress.

use std::fmt;

/// Connection status reported by [`crate::session::PairingSession::poll`].
///
/// ```text
/// Unconnected ──poll──► Unconnected      (fewer peers than required)
///      │
///      ├──────poll──► Connected          (frozen for the session)
///      │
///      └──init fails──► Error            (until reinitialize())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    /// Radio initialisation failed.  Only a full reinitialisation recovers.
    Error,
    /// Still looking for (or waiting on) peers.
    #[default]
    Unconnected,
    /// Pairing finished.  No further scanning happens this session.
    Connected,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    /// `Connected` and `Error` end the pairing phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Connected | Self::Error)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Error => "error",
            Self::Unconnected => "unconnected",
            Self::Connected => "connected",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_unconnected() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Unconnected);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ConnectionStatus::Connected.is_terminal());
        assert!(ConnectionStatus::Error.is_terminal());
        assert!(!ConnectionStatus::Unconnected.is_terminal());
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
        assert_eq!(ConnectionStatus::Error.to_string(), "error");
    }
}
