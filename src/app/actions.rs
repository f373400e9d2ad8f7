//! User actions forwarded from the views.

use std::sync::Arc;

use super::App;
use crate::constants;
use crate::event::Notification;
use crate::state::{
    Alert, AlertFollowUp, AlertResponse, ConnectGate, Credentials, View,
};

impl App {
    /// Connect button.
    ///
    /// `WireGuard` waits for the system extension callback and `OpenVPN` waits
    /// for the privileged helper when it is missing. `IKEv2` connects right away.
    pub fn did_select_connect(&mut self) {
        if self.awaiting_extension || self.awaiting_helper {
            tracing::debug!("connect already waiting on a prerequisite");
            return;
        }
        self.connect.enabled = false;

        let protocol = self.session.selected_protocol();
        match protocol.connect_gate() {
            ConnectGate::SystemExtension => {
                tracing::info!(%protocol, "checking system extension before connecting");
                self.awaiting_extension = true;
                let dispatcher = Arc::clone(&self.dispatcher);
                self.session
                    .install_wg_system_extension_if_required(Box::new(move |status| {
                        dispatcher.post(Notification::ExtensionInstallFinished(status));
                    }));
            }
            ConnectGate::PrivilegedHelper if !self.session.is_open_vpn_helper_installed() => {
                tracing::info!(%protocol, "privileged helper missing, installing first");
                self.awaiting_helper = true;
                self.session.install_privileged_helper();
            }
            ConnectGate::PrivilegedHelper | ConnectGate::None => {
                tracing::info!(%protocol, "connecting");
                self.session.connect();
            }
        }
    }

    /// Cancel button on the connecting view.
    ///
    /// The engine cannot abort a handshake, so the shell remembers the request
    /// and disconnects as soon as the connection succeeds. Accepted on either
    /// loading view; a reconnect keeps the disconnecting message up.
    pub fn did_select_cancel_connect(&mut self) {
        if !self.view.is_loading() {
            tracing::debug!(view = %self.view, "cancel ignored, no connection in progress");
            return;
        }
        tracing::info!("connection cancel requested");
        self.cancelled_connection = true;
    }

    /// Disconnect button. Asks for confirmation when On-Demand is enabled.
    pub fn did_select_disconnect(&mut self) {
        if self.session.is_on_demand_enabled() {
            self.present_alert(
                Alert::warning(constants::ALERT_ON_DEMAND, constants::MSG_ON_DEMAND_CONFIRM)
                    .informational()
                    .with_follow_up(AlertFollowUp::ConfirmOnDemandDisconnect),
            );
        } else {
            self.session.disconnect();
        }
    }

    /// Resolves the pending alert. Returns `false` if none was pending.
    pub fn acknowledge_alert(&mut self, response: AlertResponse) -> bool {
        let Some(alert) = self.alert.take() else {
            return false;
        };

        match (alert.follow_up, response) {
            // "Ok" is the only button; any dismissal ends the session.
            (AlertFollowUp::ReturnToLogin, _) => self.show(View::Login),
            (AlertFollowUp::ConfirmOnDemandDisconnect, AlertResponse::Primary) => {
                self.manage_on_demand_disconnect();
            }
            (AlertFollowUp::ConfirmOnDemandDisconnect, AlertResponse::Secondary)
            | (AlertFollowUp::None, _) => {}
        }
        true
    }

    /// Turns On-Demand off, disconnects, and re-syncs the configuration once
    /// the teardown delay has passed.
    fn manage_on_demand_disconnect(&mut self) {
        tracing::info!("disconnecting and disabling On-Demand");
        self.session.set_on_demand(false);
        self.session.disconnect();
        self.dispatcher
            .post_after(constants::ON_DEMAND_RESYNC_DELAY, Notification::OnDemandResyncDue);
    }

    pub fn did_select_choose_location(&mut self) {
        self.show(View::ServerList);
    }

    /// Leaves the server list for the dashboard matching the tunnel state.
    pub fn did_close_server_list(&mut self) {
        if self.view == View::ServerList {
            self.manage_connection_views();
        }
    }

    pub fn did_select_login(&mut self, credentials: Credentials) {
        tracing::info!(username = %credentials.username, "login requested");
        self.session.login(credentials);
    }

    pub fn did_select_logout(&mut self) {
        tracing::info!("logout requested");
        self.session.logout();
    }

    /// Signup link on the login view.
    pub fn switch_to_signup(&mut self) {
        if self.config.enable_in_app_purchase {
            self.show(View::Signup);
        } else {
            self.pending_url = Some(self.config.signup_url.clone());
        }
    }

    pub fn switch_to_login(&mut self) {
        self.show(View::Login);
    }
}
