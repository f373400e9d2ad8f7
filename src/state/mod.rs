//! Shell and engine state types.

mod account;
mod alert;
mod connection;
mod helper;
mod profile;
mod view;

pub use account::{Credentials, LoginStatus, Plan};
pub use alert::{Alert, AlertFollowUp, AlertResponse, AlertStyle};
pub use connection::ConnectionStatus;
pub use helper::{ExtensionStatus, HelperInstallStatus};
pub use profile::{ConnectGate, Country, Location, Protocol};
pub use view::{ConnectControl, ConnectLabel, LoadingMessage, View};
