//! Top-level views and the connect control.

use serde::Serialize;

use super::Plan;

/// Message shown on the loading view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadingMessage {
    Connecting,
    Disconnecting,
}

/// The single current top-level view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum View {
    Login,
    Connect,
    Disconnect,
    Loading(LoadingMessage),
    Signup,
    Products,
    Purchase(Plan),
    ServerList,
}

impl View {
    /// Views reachable while signed out (credentials and store flow).
    #[must_use]
    pub const fn is_account_view(&self) -> bool {
        matches!(
            self,
            Self::Login | Self::Signup | Self::Products | Self::Purchase(_)
        )
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    /// Short identifier used in logs and status output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Loading(LoadingMessage::Connecting) => "loading(connecting)",
            Self::Loading(LoadingMessage::Disconnecting) => "loading(disconnecting)",
            Self::Signup => "signup",
            Self::Products => "products",
            Self::Purchase(_) => "purchase",
            Self::ServerList => "server-list",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Purchase(plan) => write!(f, "purchase({})", plan.name),
            other => f.write_str(other.name()),
        }
    }
}

/// Label on the connect button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectLabel {
    #[default]
    Connect,
    Connecting,
    LoggingIn,
}

impl std::fmt::Display for ConnectLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "Connect"),
            Self::Connecting => write!(f, "Connecting..."),
            Self::LoggingIn => write!(f, "Logging in..."),
        }
    }
}

/// State of the connect control on the connect view.
///
/// Starts disabled until the initial server and configuration refresh succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConnectControl {
    pub enabled: bool,
    pub label: ConnectLabel,
}

impl ConnectControl {
    /// Enabled control showing "Connect".
    pub fn reset(&mut self) {
        self.enabled = true;
        self.label = ConnectLabel::Connect;
    }
}
