//! In-process session engine.
//!
//! Implements [`SessionManager`] without touching the network or the OS
//! tunnel stack. Every operation moves the engine state the way a real engine
//! would and announces it on the bus after a realistic delay, so the shell can
//! be exercised end to end from the command line.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use super::{ExtensionCallback, SessionError, SessionManager, SyncCallback};
use crate::constants;
use crate::event::{Dispatcher, Notification};
use crate::state::{
    ConnectionStatus, Country, Credentials, ExtensionStatus, HelperInstallStatus, Location,
    LoginStatus, Protocol,
};

/// Knobs for the simulated engine.
#[derive(Debug, Clone, Default)]
pub struct SimulationOptions {
    /// Start with a stored session.
    pub logged_in: bool,
    pub protocol: Protocol,
    /// Every network call fails with `NetworkUnreachable`.
    pub offline: bool,
    /// The helper install is denied by the user.
    pub deny_helper: bool,
    /// The system extension needs approval on the first attempt.
    pub block_extension: bool,
    /// Start with On-Demand enabled.
    pub on_demand: bool,
    /// Skip all artificial delays.
    pub instant: bool,
}

/// Engine state exposed for status output.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub login: LoginStatus,
    pub connection: ConnectionStatus,
    pub protocol: Protocol,
    pub location: Location,
    pub helper: Option<HelperInstallStatus>,
    pub extension_installed: bool,
    pub on_demand: bool,
    pub cipher: &'static str,
}

struct EngineState {
    login: LoginStatus,
    connection: ConnectionStatus,
    protocol: Protocol,
    location: Location,
    helper: Option<HelperInstallStatus>,
    extension_installed: bool,
    extension_approval_pending: bool,
    on_demand: bool,
    public_ip: &'static str,
    cipher: &'static str,
}

struct Inner {
    dispatcher: Arc<dyn Dispatcher>,
    options: SimulationOptions,
    state: Mutex<EngineState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, EngineState> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn pause(&self, delay: Duration) {
        if !self.options.instant {
            thread::sleep(delay);
        }
    }

    fn post(&self, notification: Notification) {
        self.dispatcher.post(notification);
    }
}

/// Simulated engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SimulatedSession {
    inner: Arc<Inner>,
}

const HOME_IP: &str = "198.51.100.23";
const TUNNEL_IP: &str = "203.0.113.7";

impl SimulatedSession {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, options: SimulationOptions) -> Self {
        let state = EngineState {
            login: if options.logged_in {
                LoginStatus::LoggedIn
            } else {
                LoginStatus::LoggedOut
            },
            connection: ConnectionStatus::Disconnected,
            protocol: options.protocol,
            location: Location::default(),
            helper: None,
            extension_installed: false,
            extension_approval_pending: options.block_extension,
            on_demand: options.on_demand,
            public_ip: HOME_IP,
            cipher: cipher_for(options.protocol),
        };
        Self {
            inner: Arc::new(Inner {
                dispatcher,
                options,
                state: Mutex::new(state),
            }),
        }
    }

    /// Switches the protocol used for the next connection.
    pub fn set_protocol(&self, protocol: Protocol) {
        tracing::info!(%protocol, "engine protocol changed");
        let mut state = self.inner.state();
        state.protocol = protocol;
        state.cipher = cipher_for(protocol);
    }

    #[must_use]
    pub fn status(&self) -> EngineStatus {
        let state = self.inner.state();
        EngineStatus {
            login: state.login,
            connection: state.connection,
            protocol: state.protocol,
            location: state.location.clone(),
            helper: state.helper,
            extension_installed: state.extension_installed,
            on_demand: state.on_demand,
            cipher: state.cipher,
        }
    }

    /// Runs `job` on a dispatcher job with a handle to the shared state.
    fn background(&self, job: impl FnOnce(&Inner) + Send + 'static) {
        let inner = Arc::clone(&self.inner);
        self.inner.dispatcher.spawn(Box::new(move || job(&inner)));
    }

    fn set_location(&self, update: impl FnOnce(&mut Location)) {
        update(&mut self.inner.state().location);
        self.inner.post(Notification::CurrentCityDidChange);
    }
}

fn cipher_for(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::WireGuard => "ChaCha20Poly1305",
        Protocol::OpenVpnTcp | Protocol::OpenVpnUdp | Protocol::Ikev2 => "AES-256-GCM",
    }
}

/// Root can install the helper without an authorization prompt.
#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    #[allow(unsafe_code)]
    unsafe {
        libc::geteuid() == 0
    }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

fn sample_countries() -> Vec<Country> {
    vec![
        Country::new("Germany", "DE"),
        Country::new("Japan", "JP"),
        Country::new("Netherlands", "NL"),
        Country::new("United Kingdom", "GB"),
        Country::new("United States", "US"),
    ]
}

impl SessionManager for SimulatedSession {
    fn is_logged_in(&self) -> bool {
        self.inner.state().login.is_logged_in()
    }

    fn login(&self, credentials: Credentials) {
        self.inner.state().login = LoginStatus::LoggingIn;
        self.inner.post(Notification::LoginWillBegin);

        self.background(move |inner| {
            inner.pause(constants::SIM_LOGIN_LATENCY);
            let outcome = if inner.options.offline {
                Err(SessionError::NetworkUnreachable)
            } else if credentials.username.is_empty() || credentials.password.is_empty() {
                Err(SessionError::InvalidCredentials)
            } else {
                Ok(())
            };

            match outcome {
                Ok(()) => {
                    inner.state().login = LoginStatus::LoggedIn;
                    tracing::info!(username = %credentials.username, "engine login succeeded");
                    inner.post(Notification::LoginSucceeded);
                }
                Err(err) => {
                    inner.state().login = LoginStatus::LoggedOut;
                    tracing::info!(%err, "engine login failed");
                    inner.post(Notification::LoginFailed(Some(err)));
                }
            }
        });
    }

    fn logout(&self) {
        self.inner.post(Notification::LogoutWillBegin);

        self.background(|inner| {
            inner.pause(constants::SIM_LOGIN_LATENCY);
            if inner.options.offline {
                // The server never saw the logout; the local session is gone anyway.
                inner.state().login = LoginStatus::LogoutFailed;
                tracing::info!("engine logout failed, network unreachable");
                inner.post(Notification::LogoutFailed);
                return;
            }
            let was_connected = {
                let mut state = inner.state();
                state.login = LoginStatus::LoggedOut;
                let was_connected = state.connection.is_connected();
                state.connection = ConnectionStatus::Disconnected;
                state.public_ip = HOME_IP;
                was_connected
            };
            if was_connected {
                inner.post(Notification::ConnectionDidDisconnect(None));
            }
            inner.post(Notification::LogoutSucceeded(None));
        });
    }

    fn connect(&self) {
        {
            let mut state = self.inner.state();
            if state.connection.is_connected() || state.connection.is_in_progress() {
                tracing::warn!(status = %state.connection, "connect ignored");
                return;
            }
            let helper_ready = state.helper.is_some_and(HelperInstallStatus::is_ready);
            if state.protocol.is_openvpn() && !helper_ready {
                state.helper = Some(HelperInstallStatus::ShouldInstall);
                drop(state);
                tracing::info!("connect refused, privileged helper missing");
                self.inner.post(Notification::HelperShouldInstall);
                return;
            }
            if self.inner.options.offline {
                state.connection = ConnectionStatus::Failed;
                drop(state);
                self.inner
                    .post(Notification::ConnectionFailed(Some(SessionError::NetworkUnreachable)));
                return;
            }
            state.connection = ConnectionStatus::Connecting;
        }
        self.inner.post(Notification::ConnectionWillBegin);

        self.background(|inner| {
            inner.pause(constants::SIM_CONNECT_LATENCY);
            {
                let mut state = inner.state();
                if state.connection != ConnectionStatus::Connecting {
                    return;
                }
                state.connection = ConnectionStatus::Connected;
                state.public_ip = TUNNEL_IP;
            }
            inner.post(Notification::ConnectionSucceeded);
            inner.post(Notification::CurrentLocationDidChange);
        });
    }

    fn disconnect(&self) {
        {
            let mut state = self.inner.state();
            if matches!(
                state.connection,
                ConnectionStatus::Disconnected | ConnectionStatus::Failed
            ) {
                tracing::debug!("disconnect ignored, no tunnel");
                return;
            }
            state.connection = ConnectionStatus::Disconnecting;
        }
        self.inner.post(Notification::ConnectionWillDisconnect);

        self.background(|inner| {
            inner.pause(constants::SIM_DISCONNECT_LATENCY);
            {
                let mut state = inner.state();
                state.connection = ConnectionStatus::Disconnected;
                state.public_ip = HOME_IP;
            }
            inner.post(Notification::ConnectionDidDisconnect(None));
        });
    }

    fn is_connected_to_vpn(&self) -> bool {
        self.inner.state().connection.is_connected()
    }

    fn is_vpn_connection_in_progress(&self) -> bool {
        self.inner.state().connection.is_in_progress()
    }

    fn is_network_reachable(&self) -> bool {
        !self.inner.options.offline
    }

    fn selected_protocol(&self) -> Protocol {
        self.inner.state().protocol
    }

    fn is_open_vpn_helper_installed(&self) -> bool {
        self.inner
            .state()
            .helper
            .is_some_and(HelperInstallStatus::is_ready)
    }

    fn install_privileged_helper(&self) {
        let root = is_root();
        {
            let mut state = self.inner.state();
            if state.helper == Some(HelperInstallStatus::Pending) {
                return;
            }
            state.helper = Some(HelperInstallStatus::Pending);
        }
        if !root {
            self.inner.post(Notification::HelperInstallPending);
        }

        self.background(move |inner| {
            if !root {
                inner.pause(constants::SIM_HELPER_LATENCY);
            }
            let status = if inner.options.deny_helper {
                HelperInstallStatus::Failed
            } else {
                HelperInstallStatus::Success
            };
            inner.state().helper = Some(status);
            inner.post(if status.is_ready() {
                Notification::HelperInstallSucceeded
            } else {
                Notification::HelperInstallFailed
            });
        });
    }

    fn install_wg_system_extension_if_required(&self, callback: ExtensionCallback) {
        self.background(move |inner| {
            let status = {
                let mut state = inner.state();
                if state.extension_installed {
                    ExtensionStatus::AlreadyInstalled
                } else if state.extension_approval_pending {
                    // The user approves in system settings before the next try.
                    state.extension_approval_pending = false;
                    ExtensionStatus::ApprovalRequired
                } else {
                    state.extension_installed = true;
                    ExtensionStatus::Installed
                }
            };
            if status == ExtensionStatus::Installed {
                inner.pause(constants::SIM_HELPER_LATENCY);
            }
            tracing::debug!(?status, "system extension check finished");
            callback(status);
        });
    }

    fn is_on_demand_enabled(&self) -> bool {
        self.inner.state().on_demand
    }

    fn set_on_demand(&self, enabled: bool) {
        self.inner.state().on_demand = enabled;
    }

    fn set_default_encryption(&self) {
        let mut state = self.inner.state();
        state.cipher = cipher_for(state.protocol);
        tracing::debug!(cipher = state.cipher, "default encryption applied");
    }

    fn synchronize_configuration(&self, callback: Option<SyncCallback>) -> bool {
        self.inner.post(Notification::UpdateConfigurationBegin);
        self.inner.pause(constants::SIM_REFRESH_LATENCY);

        let success = !self.inner.options.offline && self.is_logged_in();
        self.inner.post(if success {
            Notification::UpdateConfigurationSucceeded
        } else {
            Notification::UpdateConfigurationFailed
        });
        if let Some(callback) = callback {
            callback(success);
        }
        success
    }

    fn refresh_server(&self) -> Result<(), SessionError> {
        self.inner.pause(constants::SIM_REFRESH_LATENCY);
        if self.inner.options.offline {
            return Err(SessionError::NetworkUnreachable);
        }
        self.inner.post(Notification::ServerUpdateSucceeded);
        Ok(())
    }

    fn refresh_location(&self) -> Result<(), SessionError> {
        self.inner.pause(constants::SIM_REFRESH_LATENCY);
        if self.inner.options.offline {
            return Err(SessionError::NetworkUnreachable);
        }
        self.inner.post(Notification::CurrentLocationDidChange);
        Ok(())
    }

    fn fetch_countries(&self) -> Vec<Country> {
        sample_countries()
    }

    fn select_server_with(&self, country: &Country) {
        let name = country.name.clone();
        self.set_location(|location| {
            *location = Location {
                country: Some(name),
                city: None,
                server: None,
            };
        });
    }

    fn set_server(&self, server: Option<String>) {
        self.set_location(|location| location.server = server);
    }

    fn set_city(&self, city: Option<String>) {
        self.set_location(|location| location.city = city);
    }

    fn set_country(&self, country: Option<String>) {
        self.set_location(|location| location.country = country);
    }

    fn city_location_string(&self) -> String {
        self.inner.state().location.display_name()
    }

    fn current_ip_location_string(&self) -> String {
        let state = self.inner.state();
        if state.connection.is_connected() {
            format!("{} ({})", state.public_ip, state.location.display_name())
        } else {
            format!("{} (unprotected)", state.public_ip)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::testing::ManualDispatcher;

    fn engine(options: SimulationOptions) -> (SimulatedSession, Arc<ManualDispatcher>) {
        let dispatcher = Arc::new(ManualDispatcher::default());
        let options = SimulationOptions {
            instant: true,
            ..options
        };
        (SimulatedSession::new(dispatcher.clone(), options), dispatcher)
    }

    fn drain(dispatcher: &ManualDispatcher) -> Vec<&'static str> {
        std::iter::from_fn(|| dispatcher.pop())
            .map(|n| n.name())
            .collect()
    }

    #[test]
    fn test_login_success_and_failure() {
        let (session, dispatcher) = engine(SimulationOptions::default());
        session.login(Credentials::new("alice", ""));
        assert_eq!(drain(&dispatcher), ["login.will-begin", "login.failed"]);
        assert!(!session.is_logged_in());

        session.login(Credentials::new("alice", "secret"));
        assert_eq!(drain(&dispatcher), ["login.will-begin", "login.succeeded"]);
        assert!(session.is_logged_in());
    }

    #[test]
    fn test_connect_then_disconnect() {
        let (session, dispatcher) = engine(SimulationOptions {
            logged_in: true,
            ..SimulationOptions::default()
        });
        session.connect();
        assert_eq!(
            drain(&dispatcher),
            [
                "connection.will-begin",
                "connection.succeeded",
                "location.current-changed"
            ]
        );
        assert!(session.is_connected_to_vpn());
        assert!(session.current_ip_location_string().starts_with(TUNNEL_IP));

        session.disconnect();
        assert_eq!(
            drain(&dispatcher),
            ["connection.will-disconnect", "connection.did-disconnect"]
        );
        assert!(!session.is_connected_to_vpn());
    }

    #[test]
    fn test_offline_connect_fails() {
        let (session, dispatcher) = engine(SimulationOptions {
            offline: true,
            ..SimulationOptions::default()
        });
        session.connect();
        assert_eq!(
            dispatcher.pop(),
            Some(Notification::ConnectionFailed(Some(
                SessionError::NetworkUnreachable
            )))
        );
        assert!(!session.is_network_reachable());
        assert_eq!(session.status().connection, ConnectionStatus::Failed);
    }

    #[test]
    fn test_openvpn_connect_without_helper_asks_for_install() {
        let (session, dispatcher) = engine(SimulationOptions {
            protocol: Protocol::OpenVpnTcp,
            ..SimulationOptions::default()
        });
        session.connect();
        assert_eq!(drain(&dispatcher), ["helper.should-install"]);
        assert_eq!(
            session.status().helper,
            Some(HelperInstallStatus::ShouldInstall)
        );
        assert_eq!(session.status().connection, ConnectionStatus::Disconnected);

        session.install_privileged_helper();
        drain(&dispatcher);
        session.connect();
        assert_eq!(
            drain(&dispatcher),
            [
                "connection.will-begin",
                "connection.succeeded",
                "location.current-changed"
            ]
        );
    }

    #[test]
    fn test_offline_logout_fails() {
        let (session, dispatcher) = engine(SimulationOptions {
            logged_in: true,
            offline: true,
            ..SimulationOptions::default()
        });
        session.logout();
        assert_eq!(drain(&dispatcher), ["logout.will-begin", "logout.failed"]);
        assert_eq!(session.status().login, LoginStatus::LogoutFailed);
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_helper_install_outcomes() {
        let (session, dispatcher) = engine(SimulationOptions::default());
        assert!(!session.is_open_vpn_helper_installed());
        session.install_privileged_helper();
        assert_eq!(
            drain(&dispatcher).last(),
            Some(&"helper.install-succeeded")
        );
        assert!(session.is_open_vpn_helper_installed());

        let (denied, dispatcher) = engine(SimulationOptions {
            deny_helper: true,
            ..SimulationOptions::default()
        });
        denied.install_privileged_helper();
        assert_eq!(drain(&dispatcher).last(), Some(&"helper.install-failed"));
        assert!(!denied.is_open_vpn_helper_installed());
    }

    #[test]
    fn test_blocked_extension_needs_a_second_attempt() {
        let (session, _dispatcher) = engine(SimulationOptions {
            block_extension: true,
            ..SimulationOptions::default()
        });
        let results = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..3 {
            let results = Arc::clone(&results);
            session.install_wg_system_extension_if_required(Box::new(move |status| {
                results.lock().unwrap().push(status);
            }));
        }
        assert_eq!(
            *results.lock().unwrap(),
            [
                ExtensionStatus::ApprovalRequired,
                ExtensionStatus::Installed,
                ExtensionStatus::AlreadyInstalled
            ]
        );
    }

    #[test]
    fn test_synchronize_requires_login() {
        let (session, dispatcher) = engine(SimulationOptions::default());
        assert!(!session.synchronize_configuration(None));
        assert_eq!(
            drain(&dispatcher),
            ["configuration.update-begin", "configuration.update-failed"]
        );

        session.inner.state().login = LoginStatus::LoggedIn;
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        assert!(session.synchronize_configuration(Some(Box::new(move |ok| {
            *sink.lock().unwrap() = Some(ok);
        }))));
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_location_selection() {
        let (session, dispatcher) = engine(SimulationOptions::default());
        session.select_server_with(&Country::new("Japan", "JP"));
        session.set_city(Some("Tokyo".to_string()));
        assert_eq!(session.city_location_string(), "Tokyo, Japan");

        session.set_server(None);
        session.set_city(None);
        session.set_country(None);
        assert!(session.status().location.is_fastest_available());
        assert!(drain(&dispatcher)
            .iter()
            .all(|n| *n == "location.city-changed"));
    }

    #[test]
    fn test_status_json_uses_cli_protocol_names() {
        let (session, _dispatcher) = engine(SimulationOptions {
            protocol: Protocol::OpenVpnUdp,
            ..SimulationOptions::default()
        });
        let json = serde_json::to_value(session.status()).unwrap();
        assert_eq!(json["protocol"], "openvpn-udp");

        session.set_protocol(Protocol::WireGuard);
        let json = serde_json::to_value(session.status()).unwrap();
        assert_eq!(json["protocol"], "wireguard");
    }

    #[test]
    fn test_protocol_switch_updates_cipher() {
        let (session, _dispatcher) = engine(SimulationOptions::default());
        session.set_default_encryption();
        assert_eq!(session.status().cipher, "ChaCha20Poly1305");
        session.set_protocol(Protocol::OpenVpnUdp);
        assert_eq!(session.selected_protocol(), Protocol::OpenVpnUdp);
        assert_eq!(session.status().cipher, "AES-256-GCM");
    }
}
