//! Privileged helper and system extension install states.
//!
//! `OpenVPN` needs an elevated helper process and `WireGuard` needs a system
//! extension before the engine may bring a tunnel up.

use serde::Serialize;

/// Privileged helper install lifecycle, as announced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HelperInstallStatus {
    /// The engine has determined a helper install is required.
    #[default]
    ShouldInstall,
    /// Install requested, waiting for authorization.
    Pending,
    /// Helper is installed and running.
    Success,
    /// Install was denied or failed.
    Failed,
}

impl HelperInstallStatus {
    /// Check if the helper can serve a connect request
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Result delivered to the system extension install callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtensionStatus {
    /// Extension was already active; nothing was installed.
    AlreadyInstalled,
    /// Extension was installed and activated by this request.
    Installed,
    /// The OS blocked the extension until the user approves it in system settings.
    ApprovalRequired,
    /// Activation failed.
    Failed,
}

impl ExtensionStatus {
    /// Whether a connect may proceed after this result.
    #[must_use]
    pub const fn allows_connect(self) -> bool {
        matches!(self, Self::AlreadyInstalled | Self::Installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_ready_only_on_success() {
        assert!(HelperInstallStatus::Success.is_ready());
        assert!(!HelperInstallStatus::Pending.is_ready());
        assert!(!HelperInstallStatus::ShouldInstall.is_ready());
        assert!(!HelperInstallStatus::Failed.is_ready());
    }

    #[test]
    fn test_extension_allows_connect() {
        assert!(ExtensionStatus::AlreadyInstalled.allows_connect());
        assert!(ExtensionStatus::Installed.allows_connect());
        assert!(!ExtensionStatus::ApprovalRequired.allows_connect());
        assert!(!ExtensionStatus::Failed.allows_connect());
    }
}
