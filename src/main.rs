use clap::Parser;
use color_eyre::Result;

use vpnshell::cli::args::{Args, Commands};
use vpnshell::cli::commands::{self, Context};
use vpnshell::config::{self, AppConfig};
use vpnshell::logging::{self, LogTarget};

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let config_dir = config::resolve_config_dir(args.config_dir.as_deref())?;
    let target = if args.log_file {
        LogTarget::file_in(&config_dir)
    } else {
        LogTarget::Stderr
    };
    logging::init(&target)?;

    let config = AppConfig::load(&config_dir)?;
    tracing::debug!(config_dir = %config_dir.display(), "configuration loaded");

    let ctx = Context {
        config_dir,
        config,
        engine: args.engine,
    };

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run(&ctx),
        Commands::Replay { file } => commands::replay(&ctx, &file),
        Commands::Status { json } => commands::status(&ctx, json),
        Commands::Prefs { action } => commands::prefs(ctx, action),
    }
}
