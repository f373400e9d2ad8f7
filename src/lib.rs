//! vpnshell: the view shell of a desktop VPN client.
//!
//! The shell keeps exactly one top-level view current and moves between views
//! in response to named status notifications from a session engine. The
//! engine sits behind the [`session::SessionManager`] trait; a simulated engine
//! ships with the crate so the shell can be driven from the command line.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod event;
pub mod logging;
pub mod session;
pub mod state;
