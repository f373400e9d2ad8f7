//! Session engine interface.
//!
//! The engine owns login state, protocol and location selection, helper
//! installation and the tunnel itself. The shell only talks to it through
//! [`SessionManager`], shared as `Arc<dyn SessionManager>`.
//!
//! Network-bound operations return immediately and report their outcome as
//! [`Notification`](crate::event::Notification)s on the bus. The refresh and
//! synchronize calls block until done and must only be invoked from a
//! background job.

pub mod simulated;
#[cfg(test)]
pub mod testing;

use thiserror::Error;

use crate::constants;
use crate::state::{Country, Credentials, ExtensionStatus, Protocol};

/// Callback for [`SessionManager::install_wg_system_extension_if_required`].
pub type ExtensionCallback = Box<dyn FnOnce(ExtensionStatus) + Send>;

/// Callback for [`SessionManager::synchronize_configuration`].
pub type SyncCallback = Box<dyn FnOnce(bool) + Send>;

/// Errors reported by the session engine.
///
/// Carried as the payload of failure notifications. Codes are stable so
/// engines written elsewhere can map onto them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Your session token has expired")]
    TokenExpired,
    #[error("Re-authentication failed")]
    ReauthenticationFailed,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("The network is unreachable")]
    NetworkUnreachable,
    #[error("{message}")]
    Engine { code: i32, message: String },
}

impl SessionError {
    /// Numeric error code.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::TokenExpired => constants::ERR_CODE_TOKEN_EXPIRED,
            Self::ReauthenticationFailed => constants::ERR_CODE_REAUTH_FAILED,
            Self::InvalidCredentials => constants::ERR_CODE_INVALID_CREDENTIALS,
            Self::NetworkUnreachable => constants::ERR_CODE_NETWORK_UNREACHABLE,
            Self::Engine { code, .. } => *code,
        }
    }

    /// Builds an error from an engine code, using `message` only for unknown codes.
    pub fn from_code(code: i32, message: impl Into<String>) -> Self {
        match code {
            constants::ERR_CODE_TOKEN_EXPIRED => Self::TokenExpired,
            constants::ERR_CODE_REAUTH_FAILED => Self::ReauthenticationFailed,
            constants::ERR_CODE_INVALID_CREDENTIALS => Self::InvalidCredentials,
            constants::ERR_CODE_NETWORK_UNREACHABLE => Self::NetworkUnreachable,
            code => Self::Engine {
                code,
                message: message.into(),
            },
        }
    }

    /// True for the two codes that end the session and require a fresh login.
    #[must_use]
    pub const fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::TokenExpired | Self::ReauthenticationFailed)
    }
}

impl std::str::FromStr for SessionError {
    type Err = std::convert::Infallible;

    /// Parses a kebab-case error name; anything else becomes an engine message.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "token-expired" => Self::TokenExpired,
            "reauthentication-failed" => Self::ReauthenticationFailed,
            "invalid-credentials" => Self::InvalidCredentials,
            "network-unreachable" => Self::NetworkUnreachable,
            other => Self::Engine {
                code: constants::ERR_CODE_UNKNOWN,
                message: other.to_string(),
            },
        })
    }
}

/// Operations the shell requires from the session engine.
pub trait SessionManager: Send + Sync {
    // --- account ---

    fn is_logged_in(&self) -> bool;
    /// Starts a login; outcome arrives as `LoginSucceeded` or `LoginFailed`.
    fn login(&self, credentials: Credentials);
    /// Starts a logout; outcome arrives as `LogoutSucceeded` or `LogoutFailed`.
    fn logout(&self);

    // --- connection ---

    fn connect(&self);
    fn disconnect(&self);
    fn is_connected_to_vpn(&self) -> bool;
    fn is_vpn_connection_in_progress(&self) -> bool;
    fn is_network_reachable(&self) -> bool;

    // --- protocol prerequisites ---

    fn selected_protocol(&self) -> Protocol;
    fn is_open_vpn_helper_installed(&self) -> bool;
    /// Starts the helper install; progress arrives as `Helper*` notifications.
    fn install_privileged_helper(&self);
    /// Ensures the `WireGuard` system extension is active, then calls `callback`
    /// on an arbitrary thread.
    fn install_wg_system_extension_if_required(&self, callback: ExtensionCallback);

    // --- configuration ---

    fn is_on_demand_enabled(&self) -> bool;
    fn set_on_demand(&self, enabled: bool);
    fn set_default_encryption(&self);
    /// Pushes the current configuration to the system. Blocks until done and
    /// returns whether it succeeded; `callback` receives the same value.
    fn synchronize_configuration(&self, callback: Option<SyncCallback>) -> bool;

    // --- servers and location ---

    /// Refreshes the server catalogue. Blocks until done.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the catalogue could not be fetched.
    fn refresh_server(&self) -> Result<(), SessionError>;
    /// Refreshes the current public IP location. Blocks until done.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the lookup failed.
    fn refresh_location(&self) -> Result<(), SessionError>;
    fn fetch_countries(&self) -> Vec<Country>;
    /// Selects the fastest server in `country`.
    fn select_server_with(&self, country: &Country);
    fn set_server(&self, server: Option<String>);
    fn set_city(&self, city: Option<String>);
    fn set_country(&self, country: Option<String>);
    /// Label for the selected city, e.g. "Amsterdam, Netherlands".
    fn city_location_string(&self) -> String;
    /// Label for the current public IP and its location.
    fn current_ip_location_string(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reauthentication_codes() {
        assert!(SessionError::TokenExpired.requires_reauthentication());
        assert!(SessionError::ReauthenticationFailed.requires_reauthentication());
        assert!(!SessionError::InvalidCredentials.requires_reauthentication());
        assert!(!SessionError::from_code(42, "boom").requires_reauthentication());
    }

    #[test]
    fn test_code_round_trip_for_known_errors() {
        for err in [
            SessionError::TokenExpired,
            SessionError::ReauthenticationFailed,
            SessionError::InvalidCredentials,
            SessionError::NetworkUnreachable,
        ] {
            assert_eq!(SessionError::from_code(err.code(), "ignored"), err);
        }
    }

    #[test]
    fn test_unknown_code_keeps_message() {
        let err = SessionError::from_code(77, "handshake timed out");
        assert_eq!(err.code(), 77);
        assert_eq!(err.to_string(), "handshake timed out");
    }

    #[test]
    fn test_parse_error_names() {
        assert_eq!(
            "token-expired".parse::<SessionError>(),
            Ok(SessionError::TokenExpired)
        );
        let Ok(SessionError::Engine { code, message }) = "tls alert".parse::<SessionError>() else {
            panic!("expected engine error");
        };
        assert_eq!(code, constants::ERR_CODE_UNKNOWN);
        assert_eq!(message, "tls alert");
    }
}
