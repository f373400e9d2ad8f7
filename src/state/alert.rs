//! Alert dialog types.
//!
//! Alerts are the only way failures reach the user. The shell keeps at most
//! one pending alert; presenting a new one dismisses the previous.

use serde::Serialize;

/// What happens after the user responds to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AlertFollowUp {
    /// Informational; dismissing does nothing.
    #[default]
    None,
    /// Session expired: return to the login view once acknowledged.
    ReturnToLogin,
    /// On-Demand is enabled: disconnect (and turn it off) only if confirmed.
    ConfirmOnDemandDisconnect,
}

/// Severity used when rendering the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AlertStyle {
    Informational,
    #[default]
    Warning,
}

/// User response to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertResponse {
    /// First button ("Ok", "Disconnect").
    Primary,
    /// Second button ("Cancel") or dismissal.
    Secondary,
}

/// A pending alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub style: AlertStyle,
    pub follow_up: AlertFollowUp,
}

impl Alert {
    /// Warning alert with no follow-up.
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            style: AlertStyle::Warning,
            follow_up: AlertFollowUp::None,
        }
    }

    #[must_use]
    pub fn with_follow_up(mut self, follow_up: AlertFollowUp) -> Self {
        self.follow_up = follow_up;
        self
    }

    #[must_use]
    pub fn informational(mut self) -> Self {
        self.style = AlertStyle::Informational;
        self
    }

    /// Button captions, primary first.
    #[must_use]
    pub const fn buttons(&self) -> &'static [&'static str] {
        match self.follow_up {
            AlertFollowUp::None | AlertFollowUp::ReturnToLogin => &["Ok"],
            AlertFollowUp::ConfirmOnDemandDisconnect => &["Disconnect", "Cancel"],
        }
    }
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}
