//! Recording session double for unit tests.

use std::sync::Mutex;

use super::{ExtensionCallback, SessionError, SessionManager, SyncCallback};
use crate::state::{Country, Credentials, ExtensionStatus, Protocol};

/// Engine call observed by [`RecordingSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login(String),
    Logout,
    Connect,
    Disconnect,
    InstallPrivilegedHelper,
    InstallWgSystemExtension,
    SetOnDemand(bool),
    SetDefaultEncryption,
    SynchronizeConfiguration,
    RefreshServer,
    RefreshLocation,
    SelectServerWith(String),
    SetServer(Option<String>),
    SetCity(Option<String>),
    SetCountry(Option<String>),
}

struct Recorder {
    calls: Vec<Call>,
    protocol: Protocol,
    logged_in: bool,
    connected: bool,
    in_progress: bool,
    reachable: bool,
    helper_installed: bool,
    on_demand: bool,
    sync_result: bool,
    countries: Vec<Country>,
    extension_callback: Option<ExtensionCallback>,
}

/// Session engine that records every call and answers queries from
/// test-controlled flags.
///
/// The `WireGuard` extension callback is held until
/// [`RecordingSession::finish_extension_install`] is called.
pub struct RecordingSession {
    inner: Mutex<Recorder>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Recorder {
                calls: Vec::new(),
                protocol: Protocol::Ikev2,
                logged_in: true,
                connected: false,
                in_progress: false,
                reachable: true,
                helper_installed: true,
                on_demand: false,
                sync_result: true,
                countries: vec![
                    Country::new("Netherlands", "NL"),
                    Country::new("United States", "US"),
                ],
                extension_callback: None,
            }),
        }
    }
}

impl RecordingSession {
    pub fn with_protocol(protocol: Protocol) -> Self {
        let session = Self::default();
        session.inner.lock().unwrap().protocol = protocol;
        session
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn called(&self, call: &Call) -> bool {
        self.inner.lock().unwrap().calls.contains(call)
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub fn set_logged_in(&self, value: bool) {
        self.inner.lock().unwrap().logged_in = value;
    }

    pub fn set_connected(&self, value: bool) {
        self.inner.lock().unwrap().connected = value;
    }

    pub fn set_in_progress(&self, value: bool) {
        self.inner.lock().unwrap().in_progress = value;
    }

    pub fn set_reachable(&self, value: bool) {
        self.inner.lock().unwrap().reachable = value;
    }

    pub fn set_helper_installed(&self, value: bool) {
        self.inner.lock().unwrap().helper_installed = value;
    }

    pub fn set_on_demand_flag(&self, value: bool) {
        self.inner.lock().unwrap().on_demand = value;
    }

    pub fn set_sync_result(&self, value: bool) {
        self.inner.lock().unwrap().sync_result = value;
    }

    /// Delivers `status` to the pending extension callback, if any.
    pub fn finish_extension_install(&self, status: ExtensionStatus) -> bool {
        let callback = self.inner.lock().unwrap().extension_callback.take();
        match callback {
            Some(callback) => {
                callback(status);
                true
            }
            None => false,
        }
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

impl SessionManager for RecordingSession {
    fn is_logged_in(&self) -> bool {
        self.inner.lock().unwrap().logged_in
    }

    fn login(&self, credentials: Credentials) {
        self.record(Call::Login(credentials.username));
    }

    fn logout(&self) {
        self.record(Call::Logout);
    }

    fn connect(&self) {
        self.record(Call::Connect);
    }

    fn disconnect(&self) {
        self.record(Call::Disconnect);
    }

    fn is_connected_to_vpn(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    fn is_vpn_connection_in_progress(&self) -> bool {
        self.inner.lock().unwrap().in_progress
    }

    fn is_network_reachable(&self) -> bool {
        self.inner.lock().unwrap().reachable
    }

    fn selected_protocol(&self) -> Protocol {
        self.inner.lock().unwrap().protocol
    }

    fn is_open_vpn_helper_installed(&self) -> bool {
        self.inner.lock().unwrap().helper_installed
    }

    fn install_privileged_helper(&self) {
        self.record(Call::InstallPrivilegedHelper);
    }

    fn install_wg_system_extension_if_required(&self, callback: ExtensionCallback) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::InstallWgSystemExtension);
        inner.extension_callback = Some(callback);
    }

    fn is_on_demand_enabled(&self) -> bool {
        self.inner.lock().unwrap().on_demand
    }

    fn set_on_demand(&self, enabled: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::SetOnDemand(enabled));
        inner.on_demand = enabled;
    }

    fn set_default_encryption(&self) {
        self.record(Call::SetDefaultEncryption);
    }

    fn synchronize_configuration(&self, callback: Option<SyncCallback>) -> bool {
        let result = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(Call::SynchronizeConfiguration);
            inner.sync_result
        };
        if let Some(callback) = callback {
            callback(result);
        }
        result
    }

    fn refresh_server(&self) -> Result<(), SessionError> {
        self.record(Call::RefreshServer);
        Ok(())
    }

    fn refresh_location(&self) -> Result<(), SessionError> {
        self.record(Call::RefreshLocation);
        Ok(())
    }

    fn fetch_countries(&self) -> Vec<Country> {
        self.inner.lock().unwrap().countries.clone()
    }

    fn select_server_with(&self, country: &Country) {
        self.record(Call::SelectServerWith(country.name.clone()));
    }

    fn set_server(&self, server: Option<String>) {
        self.record(Call::SetServer(server));
    }

    fn set_city(&self, city: Option<String>) {
        self.record(Call::SetCity(city));
    }

    fn set_country(&self, country: Option<String>) {
        self.record(Call::SetCountry(country));
    }

    fn city_location_string(&self) -> String {
        "Amsterdam, Netherlands".to_string()
    }

    fn current_ip_location_string(&self) -> String {
        "203.0.113.7 (Amsterdam)".to_string()
    }
}
