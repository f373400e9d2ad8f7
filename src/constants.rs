//! Application-wide constants and configuration values.
//!
//! This module defines the static values used throughout vpnshell,
//! including timing intervals, file paths, and alert messages.

use std::time::Duration;

// === Application Metadata ===

/// Application name (from Cargo.toml).
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
/// Current application version (from Cargo.toml).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// === Timing Configuration ===

/// Delay before re-synchronizing configuration after an On-Demand disconnect.
///
/// The engine must finish tearing the tunnel down before a new privileged
/// helper is installed with the updated On-Demand rules.
pub const ON_DEMAND_RESYNC_DELAY: Duration = Duration::from_secs(2);

/// Simulated engine: round trip for account calls.
pub const SIM_LOGIN_LATENCY: Duration = Duration::from_millis(400);
/// Simulated engine: tunnel establishment time.
pub const SIM_CONNECT_LATENCY: Duration = Duration::from_millis(1200);
/// Simulated engine: tunnel teardown time.
pub const SIM_DISCONNECT_LATENCY: Duration = Duration::from_millis(500);
/// Simulated engine: helper authorization prompt.
pub const SIM_HELPER_LATENCY: Duration = Duration::from_millis(800);
/// Simulated engine: blocking refresh calls.
pub const SIM_REFRESH_LATENCY: Duration = Duration::from_millis(150);
/// `status` stops waiting once no event arrived for this long.
pub const STATUS_SETTLE_WINDOW: Duration = Duration::from_millis(1500);
/// Engine follow-ups applied per replayed line before giving up.
pub const REPLAY_FOLLOW_UP_LIMIT: usize = 256;

// === Path Configuration ===

/// Name of the configuration subdirectory under the platform config dir.
pub const CONFIG_DIR_NAME: &str = "vpnshell";
/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Name of the logs subdirectory.
pub const LOGS_DIR_NAME: &str = "logs";
/// Name of the log file inside the logs directory.
pub const LOG_FILE_NAME: &str = "vpnshell.log";

// === Environment ===

/// Overrides the configuration directory.
pub const ENV_CONFIG_DIR: &str = "VPNSHELL_CONFIG_DIR";
/// Log filter directives (`tracing_subscriber::EnvFilter` syntax).
pub const ENV_LOG: &str = "VPNSHELL_LOG";
/// Filter used when `VPNSHELL_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

// === Defaults ===

/// Signup page opened when in-app purchase is disabled.
pub const DEFAULT_SIGNUP_URL: &str = "https://www.example.com/signup";

// === Engine Error Codes ===

/// Stored session token is no longer accepted.
pub const ERR_CODE_TOKEN_EXPIRED: i32 = 1001;
/// Silent re-login with stored credentials failed.
pub const ERR_CODE_REAUTH_FAILED: i32 = 1002;
/// Username or password rejected.
pub const ERR_CODE_INVALID_CREDENTIALS: i32 = 1003;
/// No network path to the API.
pub const ERR_CODE_NETWORK_UNREACHABLE: i32 = 1004;
/// Catch-all for engine errors without a dedicated code.
pub const ERR_CODE_UNKNOWN: i32 = -1;

// === Alert Titles ===

pub const ALERT_CONNECTION_FAILED: &str = "Connection Failed";
pub const ALERT_HEALTH_CHECK: &str = "VPN Health Check";
pub const ALERT_LOGIN_FAILED: &str = "Login Failed";
pub const ALERT_SESSION_EXPIRED: &str = "Session Expired";
pub const ALERT_EXTENSION_BLOCKED: &str = "System extension blocked";
pub const ALERT_EXTENSION_FAILED: &str = "System extension failed";
pub const ALERT_HELPER_FAILED: &str = "Helper installation failed";
pub const ALERT_ON_DEMAND: &str = "On-Demand is enabled";

// === Alert Messages ===

pub const MSG_CHECK_CONNECTION: &str = "Please check your internet connection.";
pub const MSG_UNKNOWN_ERROR: &str = "Unknown";
pub const MSG_HEALTHY: &str = "Your VPN Connection is healthy!";
pub const MSG_LOGIN_FAILED: &str = "We could not log you in. Please check your credentials.";
pub const MSG_SESSION_EXPIRED: &str = "Your session expired. Please log in again.";
pub const MSG_EXTENSION_BLOCKED: &str = "A System Extension for WireGuard needs to be installed. \
     Open System Settings, select Privacy & Security and allow the extension.";
pub const MSG_EXTENSION_FAILED: &str = "The WireGuard system extension could not be activated.";
pub const MSG_HELPER_FAILED: &str = "The OpenVPN helper could not be installed.";
pub const MSG_ON_DEMAND_CONFIRM: &str =
    "Disconnecting will turn off On-Demand. Do you want to disconnect?";
