//! The view controller shell.
//!
//! [`App`] owns the single current [`View`] and the connect control. It changes
//! them only in [`App::handle`] (engine notifications) and in the user action
//! methods, which forward intents to the [`SessionManager`]. Nothing here
//! blocks: engine calls that wait on the network run as dispatcher jobs and
//! report back with a notification.

mod actions;
mod handlers;

use serde::Serialize;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::event::Dispatcher;
use crate::session::SessionManager;
use crate::state::{Alert, ConnectControl, View};

/// Shell state, owned by the main loop.
pub struct App {
    session: Arc<dyn SessionManager>,
    dispatcher: Arc<dyn Dispatcher>,
    config: AppConfig,

    view: View,
    connect: ConnectControl,
    alert: Option<Alert>,
    /// URL the host should open (signup page when in-app purchase is off).
    pending_url: Option<String>,
    location_label: String,
    ip_location_label: String,

    should_connect_at_startup: bool,
    /// User cancelled from the loading view; the next success becomes a disconnect.
    cancelled_connection: bool,
    /// Connect is deferred until the privileged helper reports success.
    awaiting_helper: bool,
    /// Connect is deferred until the system extension callback fires.
    awaiting_extension: bool,
}

/// Serializable view of the shell for status output.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub view: String,
    pub connect: ConnectControl,
    pub alert: Option<Alert>,
    pub location: String,
    pub ip_location: String,
    pub connect_at_startup: bool,
    pub cancel_requested: bool,
    pub awaiting_helper: bool,
    pub awaiting_extension: bool,
}

impl App {
    /// Builds the shell and performs startup.
    ///
    /// Shows Connect/Disconnect when the engine already has a logged-in user
    /// and Login otherwise, applies the general preferences, and, for an app
    /// launched hidden, kicks off a background server refresh (when connecting
    /// at startup) or configuration sync.
    pub fn new(
        session: Arc<dyn SessionManager>,
        dispatcher: Arc<dyn Dispatcher>,
        config: AppConfig,
    ) -> Self {
        let location_label = session.city_location_string();
        let mut app = Self {
            session,
            dispatcher,
            config,
            view: View::Login,
            connect: ConnectControl::default(),
            alert: None,
            pending_url: None,
            location_label,
            ip_location_label: String::new(),
            should_connect_at_startup: false,
            cancelled_connection: false,
            awaiting_helper: false,
            awaiting_extension: false,
        };

        let logged_in = app.session.is_logged_in();
        if logged_in {
            app.manage_connection_views();
        }
        tracing::info!(view = %app.view, logged_in, "shell started");

        app.evaluate_general_preferences();
        app.session.set_default_encryption();

        if logged_in && app.config.preferences.hide_on_app_launch {
            let session = Arc::clone(&app.session);
            let refresh = app.should_connect_at_startup;
            app.dispatcher.spawn(Box::new(move || {
                if refresh {
                    if let Err(err) = session.refresh_server() {
                        tracing::warn!(%err, "startup server refresh failed");
                    }
                } else if !session.synchronize_configuration(None) {
                    tracing::warn!("startup configuration sync failed");
                }
            }));
        }

        app
    }

    #[must_use]
    pub fn view(&self) -> &View {
        &self.view
    }

    #[must_use]
    pub fn connect_control(&self) -> ConnectControl {
        self.connect
    }

    /// The alert waiting for a response, if any.
    #[must_use]
    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    /// Takes the URL the host should open.
    pub fn take_pending_url(&mut self) -> Option<String> {
        self.pending_url.take()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            view: self.view.to_string(),
            connect: self.connect,
            alert: self.alert.clone(),
            location: self.location_label.clone(),
            ip_location: self.ip_location_label.clone(),
            connect_at_startup: self.should_connect_at_startup,
            cancel_requested: self.cancelled_connection,
            awaiting_helper: self.awaiting_helper,
            awaiting_extension: self.awaiting_extension,
        }
    }

    /// Replaces the current view.
    fn show(&mut self, view: View) {
        if self.view != view {
            tracing::info!(from = %self.view, to = %view, "view transition");
        }
        self.view = view;
    }

    /// Connect or Disconnect, depending on whether a tunnel is up.
    fn manage_connection_views(&mut self) {
        if self.session.is_connected_to_vpn() {
            self.show(View::Disconnect);
        } else {
            self.show(View::Connect);
        }
    }

    /// Back to Connect, but only from the Disconnect or Loading views.
    fn update_view_for_disconnect_or_failure(&mut self) {
        if matches!(self.view, View::Disconnect | View::Loading(_)) {
            self.show(View::Connect);
        }
    }

    /// Presents `alert`, dismissing any alert still on screen.
    fn present_alert(&mut self, alert: Alert) {
        if let Some(previous) = self.alert.take() {
            tracing::debug!(title = %previous.title, "dismissing previous alert");
        }
        tracing::warn!(title = %alert.title, message = %alert.message, "alert");
        self.alert = Some(alert);
    }

    /// Drops deferred work that belongs to the signed-in session.
    fn reset_pending(&mut self) {
        self.cancelled_connection = false;
        self.awaiting_helper = false;
        self.awaiting_extension = false;
    }

    /// Applies the general preferences at launch.
    fn evaluate_general_preferences(&mut self) {
        let prefs = &self.config.preferences;
        self.should_connect_at_startup = prefs.auto_connect_on_launch;

        if prefs.connect_to_fastest_server {
            // Load balance within the city already on the configuration.
            self.session.set_server(None);
        } else if prefs.connect_to_fastest_server_in_country {
            let Some(wanted) = prefs.selected_country.as_deref() else {
                return;
            };
            match self.find_country(wanted) {
                Some(country) => self.session.select_server_with(&country),
                None => tracing::warn!(country = wanted, "preferred country not in catalogue"),
            }
        }
    }

    /// Starts the initial connection once login and sync are done.
    fn evaluate_initial_connection(&mut self) {
        if self.session.is_connected_to_vpn() || self.session.is_vpn_connection_in_progress() {
            tracing::debug!("initial connection skipped, tunnel already active");
            return;
        }

        let prefs = &self.config.preferences;
        if prefs.connect_to_fastest_server_in_country {
            if let Some(country) = prefs
                .selected_country
                .as_deref()
                .and_then(|wanted| self.find_country(wanted))
            {
                self.session.select_server_with(&country);
            }
        } else if prefs.connect_to_fastest_server {
            self.session.set_server(None);
            self.session.set_city(None);
            self.session.set_country(None);
        }

        self.should_connect_at_startup = false;
        tracing::info!("starting initial connection");
        self.did_select_connect();
    }

    fn find_country(&self, name: &str) -> Option<crate::state::Country> {
        self.session
            .fetch_countries()
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}
