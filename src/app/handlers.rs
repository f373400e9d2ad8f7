//! Reactions to engine notifications.

use std::sync::Arc;

use super::App;
use crate::constants;
use crate::event::Notification;
use crate::session::SessionError;
use crate::state::{
    Alert, AlertFollowUp, ConnectLabel, ExtensionStatus, LoadingMessage, Plan, Protocol, View,
};

impl App {
    /// Applies one notification. Each notification has exactly one handler.
    pub fn handle(&mut self, notification: Notification) {
        tracing::debug!(notification = notification.name(), view = %self.view, "handle");

        match notification {
            // Account
            Notification::LoginWillBegin => self.connect.label = ConnectLabel::LoggingIn,
            Notification::LoginSucceeded | Notification::AutoLoginSucceeded => self.on_login(),
            Notification::LoginFailed(error) => self.on_login_failed(error),
            Notification::LogoutWillBegin => self.connect.enabled = false,
            Notification::LogoutSucceeded(error) => self.on_logout_succeeded(error),
            Notification::LogoutFailed => {
                self.reset_pending();
                self.show(View::Login);
            }

            // Connection
            Notification::ConnectionWillBegin => {
                if !self.view.is_loading() {
                    self.show(View::Loading(LoadingMessage::Connecting));
                }
                self.connect.enabled = false;
                self.connect.label = ConnectLabel::Connecting;
            }
            Notification::ConnectionSucceeded => self.on_connection_succeeded(),
            Notification::ConnectionFailed(error) => self.on_connection_failed(error),
            Notification::ConnectionWillDisconnect => {
                if !self.view.is_loading() {
                    self.show(View::Loading(LoadingMessage::Disconnecting));
                }
                self.connect.enabled = false;
            }
            Notification::ConnectionDidDisconnect(error) => self.on_did_disconnect(error),
            Notification::ConnectionHealthUpdate(error) => {
                let alert = match error {
                    Some(err) => Alert::warning(constants::ALERT_HEALTH_CHECK, err.to_string()),
                    None => Alert::warning(constants::ALERT_HEALTH_CHECK, constants::MSG_HEALTHY)
                        .informational(),
                };
                self.present_alert(alert);
            }

            // Configuration
            Notification::UpdateConfigurationBegin => self.connect.enabled = false,
            Notification::UpdateConfigurationSucceeded => self.connect.enabled = true,
            Notification::UpdateConfigurationFailed => self.connect.reset(),
            Notification::CurrentLocationDidChange => {
                self.ip_location_label = self.session.current_ip_location_string();
            }
            Notification::CurrentCityDidChange => {
                self.location_label = self.session.city_location_string();
            }

            Notification::ServerUpdateSucceeded => {}

            // Privileged helper
            Notification::HelperShouldInstall => self.on_helper_should_install(),
            Notification::HelperInstallPending => {
                tracing::info!("privileged helper install pending authorization");
            }
            Notification::HelperInstallSucceeded => self.on_helper_installed(),
            Notification::HelperInstallFailed => self.on_helper_failed(),

            // App
            Notification::PlanSelected(plan) => self.on_plan_selected(plan),
            Notification::PurchaseCancelled | Notification::UserDidSignUp => {
                self.show(View::Products);
            }
            Notification::OnDemandOptionChanged => {
                tracing::info!(
                    enabled = self.session.is_on_demand_enabled(),
                    "On-Demand option changed"
                );
            }

            // Shell continuations
            Notification::LoginRefreshFinished { configured } => {
                self.connect.enabled = configured;
                if self.should_connect_at_startup {
                    self.evaluate_initial_connection();
                }
            }
            Notification::ExtensionInstallFinished(status) => self.on_extension_finished(status),
            Notification::OnDemandResyncDue => self.resync_after_on_demand_disconnect(),
        }
    }

    /// Refreshes location, servers and configuration in that order, then
    /// shows the dashboard for the current tunnel state.
    fn on_login(&mut self) {
        let session = Arc::clone(&self.session);
        let dispatcher = Arc::clone(&self.dispatcher);
        self.dispatcher.spawn(Box::new(move || {
            if let Err(err) = session.refresh_location() {
                tracing::warn!(%err, "location refresh failed");
            }
            if let Err(err) = session.refresh_server() {
                tracing::warn!(%err, "server refresh failed");
            }
            let configured = session.synchronize_configuration(None);
            dispatcher.post(Notification::LoginRefreshFinished { configured });
        }));

        if self.view == View::Connect {
            self.connect.label = ConnectLabel::Connect;
        }
        self.manage_connection_views();
    }

    fn on_login_failed(&mut self, error: Option<SessionError>) {
        self.connect.label = ConnectLabel::Connect;

        if self.view != View::Login {
            let message = error.map_or_else(
                || constants::MSG_LOGIN_FAILED.to_string(),
                |err| err.to_string(),
            );
            self.present_alert(Alert::warning(constants::ALERT_LOGIN_FAILED, message));
        }
    }

    fn on_logout_succeeded(&mut self, error: Option<SessionError>) {
        self.reset_pending();

        match error {
            Some(err) if err.requires_reauthentication() => {
                tracing::info!(code = err.code(), "session expired");
                self.present_alert(
                    Alert::warning(constants::ALERT_SESSION_EXPIRED, constants::MSG_SESSION_EXPIRED)
                        .with_follow_up(AlertFollowUp::ReturnToLogin),
                );
            }
            _ => self.show(View::Login),
        }
    }

    fn on_connection_succeeded(&mut self) {
        if self.cancelled_connection {
            self.cancelled_connection = false;
            tracing::info!("connection was cancelled by the user, disconnecting");
            self.session.disconnect();
            return;
        }

        // Connecting from the server list keeps the user there.
        if !matches!(self.view, View::Disconnect | View::ServerList) {
            self.show(View::Disconnect);
        }
        self.connect.reset();
    }

    fn on_connection_failed(&mut self, error: Option<SessionError>) {
        self.cancelled_connection = false;

        let message = if self.session.is_network_reachable() {
            error.map_or_else(|| constants::MSG_UNKNOWN_ERROR.to_string(), |e| e.to_string())
        } else {
            constants::MSG_CHECK_CONNECTION.to_string()
        };
        self.present_alert(Alert::warning(constants::ALERT_CONNECTION_FAILED, message));

        self.update_view_for_disconnect_or_failure();
        self.connect.reset();
    }

    fn on_did_disconnect(&mut self, error: Option<SessionError>) {
        self.cancelled_connection = false;

        self.update_view_for_disconnect_or_failure();
        self.connect.reset();
        if self.view != View::Connect && !self.view.is_account_view() {
            self.show(View::Connect);
        }

        let session = Arc::clone(&self.session);
        self.dispatcher.spawn(Box::new(move || {
            if let Err(err) = session.refresh_location() {
                tracing::warn!(%err, "location refresh after disconnect failed");
            }
        }));

        if let Some(err) = error {
            self.present_alert(Alert::warning(
                constants::ALERT_CONNECTION_FAILED,
                err.to_string(),
            ));
        }
    }

    fn on_helper_should_install(&mut self) {
        self.connect.enabled = true;

        // IKEv2 installs its helper silently; only OpenVPN waits on it.
        let protocol = self.session.selected_protocol();
        if protocol.is_openvpn() && !self.awaiting_helper {
            tracing::info!(%protocol, "installing privileged helper before connecting");
            self.awaiting_helper = true;
            self.session.install_privileged_helper();
        }
    }

    fn on_helper_installed(&mut self) {
        self.connect.enabled = true;

        if !std::mem::take(&mut self.awaiting_helper) {
            return;
        }
        let protocol = self.session.selected_protocol();
        if protocol.is_openvpn() {
            tracing::info!(%protocol, "privileged helper ready, connecting");
            self.session.connect();
        }
    }

    fn on_helper_failed(&mut self) {
        self.connect.enabled = true;
        self.awaiting_helper = false;
        self.present_alert(Alert::warning(
            constants::ALERT_HELPER_FAILED,
            constants::MSG_HELPER_FAILED,
        ));
    }

    fn on_extension_finished(&mut self, status: ExtensionStatus) {
        if !std::mem::take(&mut self.awaiting_extension) {
            tracing::debug!(?status, "stale system extension result ignored");
            return;
        }

        if status.allows_connect() {
            if self.session.selected_protocol() == Protocol::WireGuard {
                tracing::info!(?status, "system extension ready, connecting");
                self.session.connect();
            } else {
                self.connect.reset();
            }
            return;
        }

        self.connect.reset();
        let alert = if status == ExtensionStatus::ApprovalRequired {
            Alert::warning(
                constants::ALERT_EXTENSION_BLOCKED,
                constants::MSG_EXTENSION_BLOCKED,
            )
        } else {
            Alert::warning(
                constants::ALERT_EXTENSION_FAILED,
                constants::MSG_EXTENSION_FAILED,
            )
        };
        self.present_alert(alert);
    }

    fn on_plan_selected(&mut self, plan: Plan) {
        tracing::info!(plan = %plan.id, "plan selected");
        self.show(View::Purchase(plan));
    }

    /// Second half of the On-Demand disconnect, after the teardown delay.
    fn resync_after_on_demand_disconnect(&mut self) {
        let session = Arc::clone(&self.session);
        let dispatcher = Arc::clone(&self.dispatcher);
        self.dispatcher.spawn(Box::new(move || {
            session.synchronize_configuration(Some(Box::new(move |success| {
                if !success {
                    tracing::warn!("configuration sync after On-Demand disconnect failed");
                }
                dispatcher.post(Notification::OnDemandOptionChanged);
            })));
        }));
    }
}
