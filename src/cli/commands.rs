//! Subcommand implementations.

use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app::{App, Snapshot};
use crate::cli::args::{EngineArgs, PrefsAction};
use crate::config::{AppConfig, SETTABLE_KEYS};
use crate::constants;
use crate::event::{Dispatcher, Event, EventHandler, Notification, QueueDispatcher};
use crate::session::simulated::{EngineStatus, SimulatedSession, SimulationOptions};
use crate::session::SessionManager;
use crate::state::{Alert, AlertResponse, Credentials, Protocol, View};

/// Everything a subcommand needs from the command line and config file.
pub struct Context {
    pub config_dir: PathBuf,
    pub config: AppConfig,
    pub engine: EngineArgs,
}

impl Context {
    fn simulation(&self) -> SimulationOptions {
        self.engine.simulation(self.config.protocol)
    }
}

// === Interactive shell ===

/// One line typed into the interactive shell.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Connect,
    Cancel,
    Disconnect,
    Login(Credentials),
    Logout,
    Servers,
    Close,
    Country(String),
    Protocol(Protocol),
    Signup,
    LoginView,
    Respond(AlertResponse),
    Notify(Notification),
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word {
            "connect" => Self::Connect,
            "cancel" => Self::Cancel,
            "disconnect" => Self::Disconnect,
            "login" => {
                let mut parts = rest.splitn(2, char::is_whitespace);
                let username = parts.next().unwrap_or_default();
                if username.is_empty() {
                    return Err("usage: login <username> [password]".to_string());
                }
                let password = parts.next().unwrap_or_default().trim();
                Self::Login(Credentials::new(username, password))
            }
            "logout" => Self::Logout,
            "servers" => Self::Servers,
            "close" => Self::Close,
            "country" if !rest.is_empty() => Self::Country(rest.to_string()),
            "country" => return Err("usage: country <name>".to_string()),
            "protocol" => Self::Protocol(rest.parse()?),
            "signup" => Self::Signup,
            "back" => Self::LoginView,
            "ok" => Self::Respond(AlertResponse::Primary),
            "dismiss" => Self::Respond(AlertResponse::Secondary),
            "notify" => Self::Notify(Notification::parse(rest)?),
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("Unknown command: {other} (try `help`)")),
        };
        Ok(Some(command))
    }
}

const SHELL_HELP: &str = "\
Commands:
  connect | cancel | disconnect     drive the tunnel
  login <user> [pass] | logout      account
  servers | close                   open or close the server list
  country <name>                    pick the fastest server in a country
  protocol <name>                   wireguard, openvpn-tcp, openvpn-udp, ikev2
  signup | back                     signup flow, back to login
  ok | dismiss                      answer the pending alert
  notify <name> [arg]               inject an engine notification
  status | help | quit";

/// What the interactive loop last printed, to report only changes.
#[derive(Default)]
struct Printed {
    view: Option<View>,
    alert: Option<Alert>,
}

/// Prints view and alert changes and opens any URL the shell asked for.
fn report(app: &mut App, printed: &mut Printed) {
    if printed.view.as_ref() != Some(app.view()) {
        println!("-> {}", app.view());
        printed.view = Some(app.view().clone());
    }
    if printed.alert.as_ref() != app.alert() {
        if let Some(alert) = app.alert() {
            println!("[!] {alert}  ({})", alert.buttons().join(" / "));
        }
        printed.alert = app.alert().cloned();
    }
    if let Some(url) = app.take_pending_url() {
        println!("Opening {url}");
        if let Err(err) = open::that(&url) {
            tracing::warn!(%err, %url, "failed to open browser");
            eprintln!("Failed to open browser: {err}");
        }
    }
}

/// Applies one shell command. Returns `false` when the user quits.
fn execute(
    app: &mut App,
    engine: &SimulatedSession,
    dispatcher: &dyn Dispatcher,
    command: ShellCommand,
) -> bool {
    match command {
        ShellCommand::Connect => app.did_select_connect(),
        ShellCommand::Cancel => app.did_select_cancel_connect(),
        ShellCommand::Disconnect => app.did_select_disconnect(),
        ShellCommand::Login(credentials) => app.did_select_login(credentials),
        ShellCommand::Logout => app.did_select_logout(),
        ShellCommand::Servers => app.did_select_choose_location(),
        ShellCommand::Close => app.did_close_server_list(),
        ShellCommand::Country(name) => {
            match engine
                .fetch_countries()
                .into_iter()
                .find(|c| c.name.eq_ignore_ascii_case(&name))
            {
                Some(country) => engine.select_server_with(&country),
                None => println!("Unknown country: {name}"),
            }
        }
        ShellCommand::Protocol(protocol) => engine.set_protocol(protocol),
        ShellCommand::Signup => app.switch_to_signup(),
        ShellCommand::LoginView => app.switch_to_login(),
        ShellCommand::Respond(response) => {
            if !app.acknowledge_alert(response) {
                println!("No alert pending");
            }
        }
        ShellCommand::Notify(notification) => dispatcher.post(notification),
        ShellCommand::Status => print_status(&app.snapshot(), &engine.status()),
        ShellCommand::Help => println!("{SHELL_HELP}"),
        ShellCommand::Quit => return false,
    }
    true
}

/// `run`: interactive shell on the simulated engine.
///
/// # Errors
///
/// Returns an error if the event channel closes unexpectedly.
pub fn run(ctx: &Context) -> Result<()> {
    let events = EventHandler::new(true);
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(events.dispatcher());
    let engine = SimulatedSession::new(Arc::clone(&dispatcher), ctx.simulation());
    let mut app = App::new(
        Arc::new(engine.clone()),
        Arc::clone(&dispatcher),
        ctx.config.clone(),
    );

    println!(
        "{} {} (type `help` for commands)",
        constants::APP_NAME,
        constants::APP_VERSION
    );
    let mut printed = Printed::default();
    report(&mut app, &mut printed);

    loop {
        match events.next()? {
            Event::Notification(notification) => app.handle(notification),
            Event::Input(line) => match ShellCommand::parse(&line) {
                Ok(Some(command)) => {
                    if !execute(&mut app, &engine, dispatcher.as_ref(), command) {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => println!("{message}"),
            },
            Event::InputClosed => break,
        }
        report(&mut app, &mut printed);
    }

    tracing::info!("shell exiting");
    Ok(())
}

// === Replay ===

/// Applies queued engine follow-ups, writing one line per notification.
fn drain<W: Write>(app: &mut App, queue: &QueueDispatcher, out: &mut W) -> io::Result<()> {
    for _ in 0..constants::REPLAY_FOLLOW_UP_LIMIT {
        let Some(notification) = queue.pop() else {
            return Ok(());
        };
        let name = notification.name();
        app.handle(notification);
        writeln!(out, "      + {name:<34} {}", app.view())?;
    }
    tracing::warn!(
        limit = constants::REPLAY_FOLLOW_UP_LIMIT,
        "follow-up limit reached, dropping the rest"
    );
    while queue.pop().is_some() {}
    Ok(())
}

/// Feeds `input` through a fresh shell on an instant simulated engine.
///
/// Blank lines and lines starting with `#` are skipped. Lines that do not
/// parse are reported and skipped. Returns how many lines were rejected.
fn replay_lines<R: BufRead, W: Write>(ctx: &Context, input: R, out: &mut W) -> Result<usize> {
    let queue = Arc::new(QueueDispatcher::default());
    let dispatcher: Arc<dyn Dispatcher> = queue.clone();
    let options = SimulationOptions {
        instant: true,
        ..ctx.simulation()
    };
    let engine = SimulatedSession::new(Arc::clone(&dispatcher), options);
    let mut app = App::new(Arc::new(engine), dispatcher, ctx.config.clone());

    writeln!(out, "start {:<40} {}", "", app.view())?;
    drain(&mut app, &queue, out)?;

    let mut rejected = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line.wrap_err("reading replay input")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match Notification::parse(line) {
            Ok(notification) => {
                let name = notification.name();
                app.handle(notification);
                writeln!(out, "{:>5} {name:<40} {}", index + 1, app.view())?;
                if let Some(alert) = app.alert() {
                    writeln!(out, "      ! {alert}")?;
                }
                drain(&mut app, &queue, out)?;
            }
            Err(message) => {
                rejected += 1;
                tracing::warn!(line = index + 1, %message, "replay line rejected");
                writeln!(out, "{:>5} error: {message}", index + 1)?;
            }
        }
    }
    Ok(rejected)
}

/// `replay`: feeds a notification file through the shell.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any line was rejected.
pub fn replay(ctx: &Context, file: &Path) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let rejected = if file == Path::new("-") {
        replay_lines(ctx, io::stdin().lock(), &mut out)?
    } else {
        let reader = File::open(file)
            .map(BufReader::new)
            .wrap_err_with(|| format!("opening {}", file.display()))?;
        replay_lines(ctx, reader, &mut out)?
    };

    if rejected > 0 {
        bail!("{rejected} line(s) could not be replayed");
    }
    Ok(())
}

// === Status ===

#[derive(Serialize)]
struct StatusReport {
    shell: Snapshot,
    engine: EngineStatus,
}

fn print_status(shell: &Snapshot, engine: &EngineStatus) {
    println!("View:        {}", shell.view);
    println!(
        "Connect:     {} ({})",
        shell.connect.label,
        if shell.connect.enabled { "enabled" } else { "disabled" }
    );
    println!("Location:    {}", shell.location);
    if !shell.ip_location.is_empty() {
        println!("Public IP:   {}", shell.ip_location);
    }
    println!("Tunnel:      {} via {}", engine.connection, engine.protocol);
    println!("On-Demand:   {}", if engine.on_demand { "on" } else { "off" });
    if let Some(alert) = &shell.alert {
        println!("Alert:       {alert}");
    }
}

/// `status`: boots the shell, waits for startup to settle, prints the state.
///
/// # Errors
///
/// Returns an error if JSON encoding fails.
pub fn status(ctx: &Context, json: bool) -> Result<()> {
    let events = EventHandler::new(false);
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(events.dispatcher());
    let engine = SimulatedSession::new(Arc::clone(&dispatcher), ctx.simulation());
    let mut app = App::new(Arc::new(engine.clone()), dispatcher, ctx.config.clone());

    while let Some(event) = events.next_timeout(constants::STATUS_SETTLE_WINDOW) {
        if let Event::Notification(notification) = event {
            app.handle(notification);
        }
    }

    let report = StatusReport {
        shell: app.snapshot(),
        engine: engine.status(),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_status(&report.shell, &report.engine);
    }
    Ok(())
}

// === Preferences ===

/// `prefs`: shows or changes the persisted configuration.
///
/// # Errors
///
/// Returns an error for unknown keys, invalid values, or IO failures.
pub fn prefs(ctx: Context, action: Option<PrefsAction>) -> Result<()> {
    match action.unwrap_or(PrefsAction::Show) {
        PrefsAction::Show => {
            println!(
                "# {}",
                ctx.config_dir.join(constants::CONFIG_FILE_NAME).display()
            );
            print!("{}", toml::to_string_pretty(&ctx.config)?);
        }
        PrefsAction::Set { key, value } => {
            let mut config = ctx.config;
            config.set(&key, &value).wrap_err_with(|| {
                format!("settable keys: {}", SETTABLE_KEYS.join(", "))
            })?;
            let path = config.save(&ctx.config_dir)?;
            tracing::info!(%key, %value, path = %path.display(), "preference saved");
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}
