//! Notification bus and main-loop event handling.
//!
//! The session engine, background jobs and the input reader all post into a
//! single mpsc channel. The main loop owns the receiving end and the
//! [`App`](crate::app::App), so every shell mutation happens on one thread.

use color_eyre::Result;
use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::Duration;

use crate::session::SessionError;
use crate::state::{ExtensionStatus, Plan};

/// Named status events exchanged between the engine and the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    // Account
    LoginWillBegin,
    LoginSucceeded,
    LoginFailed(Option<SessionError>),
    LogoutWillBegin,
    LogoutSucceeded(Option<SessionError>),
    LogoutFailed,
    AutoLoginSucceeded,

    // Connection
    ConnectionWillBegin,
    ConnectionSucceeded,
    ConnectionFailed(Option<SessionError>),
    ConnectionWillDisconnect,
    ConnectionDidDisconnect(Option<SessionError>),
    ConnectionHealthUpdate(Option<SessionError>),

    // Configuration
    UpdateConfigurationBegin,
    UpdateConfigurationSucceeded,
    UpdateConfigurationFailed,
    CurrentLocationDidChange,
    CurrentCityDidChange,

    // Servers
    ServerUpdateSucceeded,

    // Privileged helper
    HelperShouldInstall,
    HelperInstallPending,
    HelperInstallSucceeded,
    HelperInstallFailed,

    // App
    PlanSelected(Plan),
    PurchaseCancelled,
    UserDidSignUp,
    OnDemandOptionChanged,

    // Shell continuations, posted by the shell's own background work
    LoginRefreshFinished { configured: bool },
    ExtensionInstallFinished(ExtensionStatus),
    OnDemandResyncDue,
}

/// Every payload-free name, used for parsing and listing.
const SIMPLE_NAMES: [&str; 26] = [
    "login.will-begin",
    "login.succeeded",
    "login.failed",
    "logout.will-begin",
    "logout.succeeded",
    "logout.failed",
    "login.auto-succeeded",
    "connection.will-begin",
    "connection.succeeded",
    "connection.failed",
    "connection.will-disconnect",
    "connection.did-disconnect",
    "connection.health-update",
    "configuration.update-begin",
    "configuration.update-succeeded",
    "configuration.update-failed",
    "location.current-changed",
    "location.city-changed",
    "server.update-succeeded",
    "helper.should-install",
    "helper.install-pending",
    "helper.install-succeeded",
    "helper.install-failed",
    "app.purchase-cancelled",
    "app.user-did-sign-up",
    "app.on-demand-option-changed",
];

impl Notification {
    /// Stable string identifier of this notification.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoginWillBegin => "login.will-begin",
            Self::LoginSucceeded => "login.succeeded",
            Self::LoginFailed(_) => "login.failed",
            Self::LogoutWillBegin => "logout.will-begin",
            Self::LogoutSucceeded(_) => "logout.succeeded",
            Self::LogoutFailed => "logout.failed",
            Self::AutoLoginSucceeded => "login.auto-succeeded",
            Self::ConnectionWillBegin => "connection.will-begin",
            Self::ConnectionSucceeded => "connection.succeeded",
            Self::ConnectionFailed(_) => "connection.failed",
            Self::ConnectionWillDisconnect => "connection.will-disconnect",
            Self::ConnectionDidDisconnect(_) => "connection.did-disconnect",
            Self::ConnectionHealthUpdate(_) => "connection.health-update",
            Self::UpdateConfigurationBegin => "configuration.update-begin",
            Self::UpdateConfigurationSucceeded => "configuration.update-succeeded",
            Self::UpdateConfigurationFailed => "configuration.update-failed",
            Self::CurrentLocationDidChange => "location.current-changed",
            Self::CurrentCityDidChange => "location.city-changed",
            Self::ServerUpdateSucceeded => "server.update-succeeded",
            Self::HelperShouldInstall => "helper.should-install",
            Self::HelperInstallPending => "helper.install-pending",
            Self::HelperInstallSucceeded => "helper.install-succeeded",
            Self::HelperInstallFailed => "helper.install-failed",
            Self::PlanSelected(_) => "app.plan-selected",
            Self::PurchaseCancelled => "app.purchase-cancelled",
            Self::UserDidSignUp => "app.user-did-sign-up",
            Self::OnDemandOptionChanged => "app.on-demand-option-changed",
            Self::LoginRefreshFinished { .. } => "shell.login-refresh-finished",
            Self::ExtensionInstallFinished(_) => "shell.extension-install-finished",
            Self::OnDemandResyncDue => "shell.on-demand-resync-due",
        }
    }

    /// Looks up a payload-free notification by name.
    ///
    /// Notifications with an optional error payload come back with `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let notification = match name {
            "login.will-begin" => Self::LoginWillBegin,
            "login.succeeded" => Self::LoginSucceeded,
            "login.failed" => Self::LoginFailed(None),
            "logout.will-begin" => Self::LogoutWillBegin,
            "logout.succeeded" => Self::LogoutSucceeded(None),
            "logout.failed" => Self::LogoutFailed,
            "login.auto-succeeded" => Self::AutoLoginSucceeded,
            "connection.will-begin" => Self::ConnectionWillBegin,
            "connection.succeeded" => Self::ConnectionSucceeded,
            "connection.failed" => Self::ConnectionFailed(None),
            "connection.will-disconnect" => Self::ConnectionWillDisconnect,
            "connection.did-disconnect" => Self::ConnectionDidDisconnect(None),
            "connection.health-update" => Self::ConnectionHealthUpdate(None),
            "configuration.update-begin" => Self::UpdateConfigurationBegin,
            "configuration.update-succeeded" => Self::UpdateConfigurationSucceeded,
            "configuration.update-failed" => Self::UpdateConfigurationFailed,
            "location.current-changed" => Self::CurrentLocationDidChange,
            "location.city-changed" => Self::CurrentCityDidChange,
            "server.update-succeeded" => Self::ServerUpdateSucceeded,
            "helper.should-install" => Self::HelperShouldInstall,
            "helper.install-pending" => Self::HelperInstallPending,
            "helper.install-succeeded" => Self::HelperInstallSucceeded,
            "helper.install-failed" => Self::HelperInstallFailed,
            "app.purchase-cancelled" => Self::PurchaseCancelled,
            "app.user-did-sign-up" => Self::UserDidSignUp,
            "app.on-demand-option-changed" => Self::OnDemandOptionChanged,
            _ => return None,
        };
        Some(notification)
    }

    /// All names accepted by [`Notification::parse`].
    pub fn names() -> impl Iterator<Item = &'static str> {
        SIMPLE_NAMES
            .into_iter()
            .chain(std::iter::once("app.plan-selected"))
    }

    /// Parses `name [argument]`.
    ///
    /// The argument is an error name or message for notifications that carry an
    /// error, and the plan id for `app.plan-selected`.
    ///
    /// # Errors
    ///
    /// Returns a description if the name is unknown or a required argument is missing.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (line, None),
        };

        if name == "app.plan-selected" {
            let id = arg.ok_or("app.plan-selected requires a plan id")?;
            return Ok(Self::PlanSelected(Plan {
                id: id.to_string(),
                name: id.to_string(),
            }));
        }

        let notification =
            Self::from_name(name).ok_or_else(|| format!("Unknown notification: {name}"))?;
        let Some(arg) = arg else {
            return Ok(notification);
        };
        let error: SessionError = match arg.parse() {
            Ok(err) => err,
            Err(never) => match never {},
        };

        match notification {
            Self::LoginFailed(_) => Ok(Self::LoginFailed(Some(error))),
            Self::LogoutSucceeded(_) => Ok(Self::LogoutSucceeded(Some(error))),
            Self::ConnectionFailed(_) => Ok(Self::ConnectionFailed(Some(error))),
            Self::ConnectionDidDisconnect(_) => Ok(Self::ConnectionDidDisconnect(Some(error))),
            Self::ConnectionHealthUpdate(_) => Ok(Self::ConnectionHealthUpdate(Some(error))),
            other => Err(format!("{} takes no argument", other.name())),
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Posts notifications and runs background work for the shell and the engine.
///
/// Implementations must deliver posted notifications to the main loop in
/// posting order.
pub trait Dispatcher: Send + Sync {
    /// Delivers `notification` to the main loop.
    fn post(&self, notification: Notification);
    /// Delivers `notification` once `delay` has elapsed.
    fn post_after(&self, delay: Duration, notification: Notification);
    /// Runs `job` off the main loop.
    fn spawn(&self, job: Box<dyn FnOnce() + Send>);
}

/// Events that drive the main loop.
#[derive(Debug)]
pub enum Event {
    /// Status notification from the engine or a background job.
    Notification(Notification),
    /// One line of user input.
    Input(String),
    /// Input stream reached end of file.
    InputClosed,
}

/// [`Dispatcher`] backed by the main loop's channel and OS threads.
#[derive(Clone)]
pub struct ThreadDispatcher {
    sender: mpsc::Sender<Event>,
}

impl Dispatcher for ThreadDispatcher {
    fn post(&self, notification: Notification) {
        tracing::trace!(notification = notification.name(), "post");
        // The main loop is gone during shutdown; dropping the event is fine.
        let _ = self.sender.send(Event::Notification(notification));
    }

    fn post_after(&self, delay: Duration, notification: Notification) {
        let sender = self.sender.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = sender.send(Event::Notification(notification));
        });
    }

    fn spawn(&self, job: Box<dyn FnOnce() + Send>) {
        thread::spawn(job);
    }
}

/// Owns the main loop's channel.
///
/// Optionally spawns a thread that forwards stdin lines as [`Event::Input`].
pub struct EventHandler {
    sender: mpsc::Sender<Event>,
    receiver: mpsc::Receiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler.
    ///
    /// # Arguments
    ///
    /// * `read_input` - Spawn a stdin reader thread
    pub fn new(read_input: bool) -> Self {
        let (sender, receiver) = mpsc::channel();

        if read_input {
            let input = sender.clone();
            thread::spawn(move || {
                let stdin = io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if input.send(Event::Input(line)).is_err() {
                        return;
                    }
                }
                let _ = input.send(Event::InputClosed);
            });
        }

        Self { sender, receiver }
    }

    /// Dispatcher that posts into this handler's channel.
    #[must_use]
    pub fn dispatcher(&self) -> ThreadDispatcher {
        ThreadDispatcher {
            sender: self.sender.clone(),
        }
    }

    /// Blocks until the next event is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the event channel is disconnected.
    pub fn next(&self) -> Result<Event> {
        Ok(self.receiver.recv()?)
    }

    /// Waits at most `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Event> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// Single-threaded [`Dispatcher`] for replaying recorded notifications.
///
/// Jobs run inline and delayed notifications are queued without waiting, so a
/// replay is deterministic.
#[derive(Default)]
pub struct QueueDispatcher {
    queue: Mutex<VecDeque<Notification>>,
}

impl QueueDispatcher {
    /// Takes the next queued notification.
    pub fn pop(&self) -> Option<Notification> {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
    }

    fn push(&self, notification: Notification) {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(notification);
    }
}

impl Dispatcher for QueueDispatcher {
    fn post(&self, notification: Notification) {
        self.push(notification);
    }

    fn post_after(&self, delay: Duration, notification: Notification) {
        tracing::trace!(?delay, notification = notification.name(), "delay skipped");
        self.push(notification);
    }

    fn spawn(&self, job: Box<dyn FnOnce() + Send>) {
        job();
    }
}

#[cfg(test)]
pub mod testing {
    //! Deterministic dispatcher for unit tests.

    use super::{Dispatcher, Notification};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Queues notifications instead of delivering them and runs jobs inline.
    #[derive(Default)]
    pub struct ManualDispatcher {
        queue: Mutex<VecDeque<Notification>>,
        delayed: Mutex<Vec<(Duration, Notification)>>,
    }

    impl ManualDispatcher {
        /// Takes the next queued notification.
        pub fn pop(&self) -> Option<Notification> {
            self.queue.lock().unwrap().pop_front()
        }

        /// Delayed notifications not yet released, with their delays.
        pub fn delayed(&self) -> Vec<(Duration, Notification)> {
            self.delayed.lock().unwrap().clone()
        }

        /// Moves all delayed notifications into the queue.
        pub fn release_delayed(&self) {
            let released: Vec<_> = self.delayed.lock().unwrap().drain(..).collect();
            let mut queue = self.queue.lock().unwrap();
            queue.extend(released.into_iter().map(|(_, n)| n));
        }
    }

    impl Dispatcher for ManualDispatcher {
        fn post(&self, notification: Notification) {
            self.queue.lock().unwrap().push_back(notification);
        }

        fn post_after(&self, delay: Duration, notification: Notification) {
            self.delayed.lock().unwrap().push((delay, notification));
        }

        fn spawn(&self, job: Box<dyn FnOnce() + Send>) {
            job();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_dispatcher_runs_jobs_inline() {
        let dispatcher = QueueDispatcher::default();
        dispatcher.post_after(Duration::from_secs(60), Notification::OnDemandResyncDue);
        dispatcher.spawn(Box::new(|| {}));
        dispatcher.post(Notification::ConnectionSucceeded);
        assert_eq!(dispatcher.pop(), Some(Notification::OnDemandResyncDue));
        assert_eq!(dispatcher.pop(), Some(Notification::ConnectionSucceeded));
        assert_eq!(dispatcher.pop(), None);
    }

    #[test]
    fn test_every_simple_name_round_trips() {
        for name in Notification::names().filter(|n| *n != "app.plan-selected") {
            let notification = Notification::from_name(name).unwrap();
            assert_eq!(notification.name(), name);
        }
    }

    #[test]
    fn test_parse_with_error_argument() {
        assert_eq!(
            Notification::parse("logout.succeeded token-expired"),
            Ok(Notification::LogoutSucceeded(Some(SessionError::TokenExpired)))
        );
        let Ok(Notification::ConnectionFailed(Some(err))) =
            Notification::parse("connection.failed TLS handshake timed out")
        else {
            panic!("expected connection failure with error");
        };
        assert_eq!(err.to_string(), "TLS handshake timed out");
    }

    #[test]
    fn test_parse_plan_selected() {
        let Ok(Notification::PlanSelected(plan)) = Notification::parse("app.plan-selected yearly")
        else {
            panic!("expected plan selection");
        };
        assert_eq!(plan.id, "yearly");
        assert!(Notification::parse("app.plan-selected").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_and_stray_arguments() {
        assert!(Notification::parse("connection.exploded").is_err());
        assert!(Notification::parse("connection.succeeded now").is_err());
    }

    #[test]
    fn test_shell_continuations_are_not_parseable() {
        assert!(Notification::from_name("shell.on-demand-resync-due").is_none());
    }

    #[test]
    fn test_thread_dispatcher_delivers_in_order() {
        let handler = EventHandler::new(false);
        let dispatcher = handler.dispatcher();
        dispatcher.post(Notification::ConnectionWillBegin);
        dispatcher.post(Notification::ConnectionSucceeded);

        let names: Vec<_> = (0..2)
            .map(|_| match handler.next().unwrap() {
                Event::Notification(n) => n.name(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(names, ["connection.will-begin", "connection.succeeded"]);
    }

    #[test]
    fn test_thread_dispatcher_post_after_waits() {
        let handler = EventHandler::new(false);
        handler
            .dispatcher()
            .post_after(Duration::from_millis(50), Notification::OnDemandResyncDue);
        assert!(handler.next_timeout(Duration::from_millis(5)).is_none());
        assert!(matches!(
            handler.next_timeout(Duration::from_secs(2)),
            Some(Event::Notification(Notification::OnDemandResyncDue))
        ));
    }
}
