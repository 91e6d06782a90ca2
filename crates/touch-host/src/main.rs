//! remotetouch command-line entry point.
//!
//! Opens one session to a remote device, performs a single action, and
//! disconnects.
//!
//! # Usage
//!
//! ```text
//! remotetouch [OPTIONS] <COMMAND>
//!
//! Commands:
//!   tap          <X> <Y> [--duration-ms <MS>]
//!   swipe        <X> <Y> <X2> <Y2> [--duration-ms <MS>] [--steps <N>]
//!   long-press   <X> <Y> [--duration-ms <MS>]
//!   double-tap   <X> <Y>
//!   key          <KEY> [-m <MODIFIER>]...
//!   type         <TEXT>
//!   info         connect, print the session and screen size, disconnect
//! ```
//!
//! # Environment variables
//!
//! | Variable                    | Default | Description                      |
//! |-----------------------------|---------|----------------------------------|
//! | `REMOTETOUCH_SSH_HOST`      | –       | Same as `--host`                 |
//! | `REMOTETOUCH_SSH_USER`      | `pi`    | Same as `--user`                 |
//! | `REMOTETOUCH_SSH_PORT`      | `22`    | Same as `--port`                 |
//! | `REMOTETOUCH_SSH_KEY`       | –       | Same as `--key`                  |
//! | `REMOTETOUCH_SCREEN_WIDTH`  | –       | Same as `--screen-width`         |
//! | `REMOTETOUCH_SCREEN_HEIGHT` | –       | Same as `--screen-height`        |
//! | `REMOTETOUCH_USE_SUDO`      | `false` | Same as `--sudo`                 |
//! | `RUST_LOG`                  | –       | Overrides `--log-level` when set |
//!
//! Flags and variables override the TOML defaults file (see
//! `touch_host::infrastructure::storage::config`).  Results go to stdout,
//! logs to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use touch_core::{Command, CommandKind, DeviceMode};
use touch_host::application::session_manager::{SessionId, SessionManager};
use touch_host::domain::{EngineDeployment, SessionConfig};
use touch_host::infrastructure::storage::config::{load_config, load_config_from, HostConfig};
use touch_host::infrastructure::transport::SshLauncher;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote touchscreen and keyboard control over SSH.
#[derive(Debug, Parser)]
#[command(name = "remotetouch", version)]
struct Cli {
    /// TOML defaults file (default: the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Remote device address.
    #[arg(long, env = "REMOTETOUCH_SSH_HOST")]
    host: Option<String>,

    /// SSH user.
    #[arg(long, env = "REMOTETOUCH_SSH_USER")]
    user: Option<String>,

    /// SSH port.
    #[arg(long, env = "REMOTETOUCH_SSH_PORT")]
    port: Option<u16>,

    /// Private key for `ssh -i`.
    #[arg(long, env = "REMOTETOUCH_SSH_KEY")]
    key: Option<PathBuf>,

    /// Logical screen width; auto-detected when omitted.
    #[arg(long, env = "REMOTETOUCH_SCREEN_WIDTH")]
    screen_width: Option<u32>,

    /// Logical screen height; auto-detected when omitted.
    #[arg(long, env = "REMOTETOUCH_SCREEN_HEIGHT")]
    screen_height: Option<u32>,

    /// Run the engine through `sudo -n`.
    #[arg(
        long,
        env = "REMOTETOUCH_USE_SUDO",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    sudo: bool,

    /// Touchscreen strategy: auto, discover or create.
    #[arg(long)]
    device: Option<DeviceMode>,

    /// Engine binary on the remote device.
    #[arg(long, conflicts_with = "upload")]
    daemon_path: Option<String>,

    /// Upload this local engine binary instead of running an installed one.
    #[arg(long)]
    upload: Option<PathBuf>,

    /// Print the raw engine response as JSON.
    #[arg(long)]
    json: bool,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Tap at a point.
    Tap {
        x: i32,
        y: i32,
        #[arg(long)]
        duration_ms: Option<u64>,
    },
    /// Swipe from one point to another.
    Swipe {
        x: i32,
        y: i32,
        x2: i32,
        y2: i32,
        #[arg(long)]
        duration_ms: Option<u64>,
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Touch and hold at a point.
    LongPress {
        x: i32,
        y: i32,
        #[arg(long)]
        duration_ms: Option<u64>,
    },
    /// Two quick taps at a point.
    DoubleTap { x: i32, y: i32 },
    /// Press one key, optionally with modifiers (`-m ctrl -m shift`).
    Key {
        key: String,
        #[arg(short = 'm', long = "modifier")]
        modifiers: Vec<String>,
    },
    /// Type a string.
    Type { text: String },
    /// Connect and print the session and screen size.
    Info,
}

impl Action {
    /// The protocol command for this action; `None` for `info`.
    fn command_kind(&self) -> Option<CommandKind> {
        let kind = match self {
            Action::Tap { x, y, duration_ms } => CommandKind::Tap {
                x: *x,
                y: *y,
                duration_ms: *duration_ms,
            },
            Action::Swipe {
                x,
                y,
                x2,
                y2,
                duration_ms,
                steps,
            } => CommandKind::Swipe {
                x: *x,
                y: *y,
                x2: *x2,
                y2: *y2,
                duration_ms: *duration_ms,
                steps: *steps,
            },
            Action::LongPress { x, y, duration_ms } => CommandKind::LongPress {
                x: *x,
                y: *y,
                duration_ms: *duration_ms,
            },
            Action::DoubleTap { x, y } => CommandKind::DoubleTap { x: *x, y: *y },
            Action::Key { key, modifiers } => CommandKind::KeyPress {
                key: key.clone(),
                modifiers: modifiers.clone(),
            },
            Action::Type { text } => CommandKind::KeyType { text: text.clone() },
            Action::Info => return None,
        };
        Some(kind)
    }
}

impl Cli {
    /// Resolves the session config: flags and variables over file values.
    fn session_config(&self, file: &HostConfig) -> anyhow::Result<SessionConfig> {
        let host = self
            .host
            .clone()
            .or_else(|| file.ssh.host.clone())
            .context("no host given: pass --host, set REMOTETOUCH_SSH_HOST, or set [ssh] host")?;

        let mut config = file.session_config(host);
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(key) = &self.key {
            config.key_file = Some(key.clone());
        }
        if self.screen_width.is_some() {
            config.screen_width = self.screen_width;
        }
        if self.screen_height.is_some() {
            config.screen_height = self.screen_height;
        }
        config.use_sudo |= self.sudo;
        if let Some(device) = self.device {
            config.device_mode = device;
        }
        if let Some(path) = &self.daemon_path {
            config.engine = EngineDeployment::Installed { path: path.clone() };
        }
        if let Some(local_path) = &self.upload {
            config.engine = EngineDeployment::Upload {
                local_path: local_path.clone(),
            };
        }
        Ok(config)
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

fn outcome_text(kind: &CommandKind) -> String {
    match kind {
        CommandKind::Tap { x, y, .. } => format!("Tapped at ({x}, {y})"),
        CommandKind::Swipe { x, y, x2, y2, .. } => {
            format!("Swiped from ({x}, {y}) to ({x2}, {y2})")
        }
        CommandKind::LongPress { x, y, duration_ms } => format!(
            "Long pressed at ({x}, {y}) for {}ms",
            duration_ms.unwrap_or(touch_core::domain::gesture::DEFAULT_LONG_PRESS_MS)
        ),
        CommandKind::DoubleTap { x, y } => format!("Double tapped at ({x}, {y})"),
        CommandKind::KeyPress { key, modifiers } => {
            let mut chord = modifiers.clone();
            chord.push(key.clone());
            format!("Pressed {}", chord.join("+"))
        }
        CommandKind::KeyType { text } => format!("Typed {} characters", text.chars().count()),
        CommandKind::Init { .. } => "Initialized".to_string(),
        CommandKind::Shutdown => "Shut down".to_string(),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Results go to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file = match &cli.config {
        Some(path) => load_config_from(path, false),
        None => load_config(),
    }
    .context("failed to load config")?;
    let config = cli.session_config(&file)?;

    let manager =
        SessionManager::new(Arc::new(SshLauncher::new())).with_timeouts(file.session_timeouts());
    let id = manager.connect(config).await?;

    let outcome = perform(&manager, id, &cli).await;

    if let Err(e) = manager.disconnect(id).await {
        warn!(session = %id, "disconnect failed: {e}");
    }
    outcome
}

async fn perform(manager: &SessionManager, id: SessionId, cli: &Cli) -> anyhow::Result<()> {
    let Some(kind) = cli.action.command_kind() else {
        let info = manager
            .get_session(id)
            .await
            .context("session vanished before it could be inspected")?;
        println!("{info}");
        match info.screen {
            Some(screen) => println!("Screen: {screen}"),
            None => println!("Screen: unknown"),
        }
        return Ok(());
    };

    let text = outcome_text(&kind);
    let response = manager.send_command(id, Command::new(kind)).await?;

    if cli.json {
        println!("{}", serde_json::to_string(&response)?);
        if response.is_error() {
            bail!("engine reported an error");
        }
        return Ok(());
    }

    response.into_result()?;
    println!("{text}");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
