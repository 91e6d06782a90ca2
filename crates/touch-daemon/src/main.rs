//! remotetouch-daemon entry point.
//!
//! Started on the target device by the host, usually as
//! `ssh user@device remotetouch-daemon`.  Speaks the line-delimited JSON
//! protocol on stdin/stdout and writes diagnostics to stderr.
//!
//! # Usage
//!
//! ```text
//! remotetouch-daemon [OPTIONS]
//!
//! Options:
//!   --device <MODE>       auto | discover | create   [default: auto]
//!   --log-level <LEVEL>   tracing filter used when RUST_LOG is unset [default: info]
//! ```
//!
//! # Environment variables
//!
//! | Variable                    | Default | Description                              |
//! |-----------------------------|---------|------------------------------------------|
//! | `REMOTETOUCH_DEVICE_MODE`   | `auto`  | Same as `--device`                       |
//! | `RUST_LOG`                  | –       | Overrides `--log-level` when set         |
//!
//! # Device modes
//!
//! - `auto` – drive a physical touchscreen if one is found, else create a
//!   virtual one.
//! - `discover` – physical touchscreen only; `init` fails if none exists.
//! - `create` – always create a virtual uinput touchscreen.

use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use touch_core::DeviceMode;
use touch_daemon::application::engine::Engine;
use touch_daemon::application::serve::{serve, ServeExit};
use touch_daemon::infrastructure::input_devices::NativeBackend;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Event-synthesis engine for remotetouch.
#[derive(Debug, Parser)]
#[command(
    name = "remotetouch-daemon",
    about = "Turns line-delimited JSON gestures on stdin into Linux input events",
    version
)]
struct Cli {
    /// How to obtain the touchscreen device.
    #[arg(long = "device", default_value = "auto", env = "REMOTETOUCH_DEVICE_MODE")]
    device: DeviceMode,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries protocol lines only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    info!(mode = %cli.device, "remotetouch-daemon starting");

    let mut engine = Engine::new(Box::new(NativeBackend::new()), cli.device);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let exit = serve(stdin.lock(), stdout.lock(), &mut engine)
        .context("protocol stream failed")?;

    // Destroys any virtual devices before the process exits.
    engine.teardown();

    match exit {
        ServeExit::Shutdown => info!("shut down by host"),
        ServeExit::EndOfInput => info!("host closed the connection"),
    }
    Ok(())
}
