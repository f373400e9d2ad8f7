//! Command-line argument definitions.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::constants;
use crate::session::simulated::SimulationOptions;
use crate::state::Protocol;

/// vpnshell - VPN client session shell
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration directory (defaults to the platform config dir)
    #[arg(long, global = true, env = constants::ENV_CONFIG_DIR)]
    pub config_dir: Option<PathBuf>,

    /// Write logs to logs/vpnshell.log in the config directory
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Switches for the simulated engine.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Protocol to connect with (overrides the config file)
    #[arg(long, global = true)]
    pub protocol: Option<Protocol>,

    /// Start with a stored login
    #[arg(long, global = true)]
    pub logged_in: bool,

    /// Simulate an unreachable network
    #[arg(long, global = true)]
    pub offline: bool,

    /// Simulate the user denying the privileged helper install
    #[arg(long, global = true)]
    pub deny_helper: bool,

    /// Require system extension approval on the first connect
    #[arg(long, global = true)]
    pub block_extension: bool,

    /// Start with On-Demand enabled
    #[arg(long, global = true)]
    pub on_demand: bool,
}

impl EngineArgs {
    /// Engine options, with `fallback` used when no protocol flag is given.
    #[must_use]
    pub fn simulation(&self, fallback: Protocol) -> SimulationOptions {
        SimulationOptions {
            logged_in: self.logged_in,
            protocol: self.protocol.unwrap_or(fallback),
            offline: self.offline,
            deny_helper: self.deny_helper,
            block_extension: self.block_extension,
            on_demand: self.on_demand,
            instant: false,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive shell on the simulated engine
    Run,
    /// Feed a file of notifications through the shell, one per line
    Replay {
        /// File with one `name [argument]` per line; `-` reads stdin
        file: PathBuf,
    },
    /// Boot the shell, let startup settle, and print its state
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show or change persisted preferences
    Prefs {
        #[command(subcommand)]
        action: Option<PrefsAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PrefsAction {
    /// Print the current configuration
    Show,
    /// Set one key and save
    Set { key: String, value: String },
}
