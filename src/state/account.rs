//! Account and login state types.

use serde::Serialize;

/// Login status of the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LoginStatus {
    #[default]
    LoggedOut,
    LoggingIn,
    LoggedIn,
    /// Logout was attempted and failed; the shell still treats the user as signed out.
    LogoutFailed,
}

impl LoginStatus {
    #[must_use]
    pub const fn is_logged_in(self) -> bool {
        matches!(self, Self::LoggedIn)
    }
}

/// Username/password pair forwarded to the engine on login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Never print the password, even in debug logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Subscription plan chosen on the products view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Store product identifier.
    pub id: String,
    /// Human-readable plan name.
    pub name: String,
}
