//! VPN connection status types.

use serde::Serialize;

/// Connection status as reported by the session engine.
///
/// The engine is the only writer. The shell observes it through
/// notifications and the `is_connected_to_vpn` / `is_vpn_connection_in_progress`
/// queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionStatus {
    /// No active VPN connection.
    #[default]
    Disconnected,
    /// Tunnel establishment in progress.
    Connecting,
    /// Tunnel is up.
    Connected,
    /// Teardown in progress.
    Disconnecting,
    /// Last attempt failed; equivalent to disconnected for new attempts.
    Failed,
}

impl ConnectionStatus {
    /// True while the engine is between a connect request and its outcome.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }

    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_progress_states() {
        assert!(ConnectionStatus::Connecting.is_in_progress());
        assert!(ConnectionStatus::Disconnecting.is_in_progress());
        assert!(!ConnectionStatus::Connected.is_in_progress());
        assert!(!ConnectionStatus::Failed.is_in_progress());
        assert!(!ConnectionStatus::Disconnected.is_in_progress());
    }

    #[test]
    fn test_only_connected_is_connected() {
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(!ConnectionStatus::Connecting.is_connected());
    }
}
