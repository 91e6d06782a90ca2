//! TOML defaults file for the `remotetouch` CLI.
//!
//! Looked up at:
//! - Unix:    `$XDG_CONFIG_HOME/remotetouch/config.toml`, else
//!   `~/.config/remotetouch/config.toml`
//! - Windows: `%APPDATA%\remotetouch\config.toml`
//!
//! or at the path given with `--config`.  Command-line flags and
//! `REMOTETOUCH_*` environment variables override whatever the file says.
//!
//! # Example
//!
//! ```toml
//! [ssh]
//! host = "192.168.1.50"
//! user = "pi"
//! port = 22
//! key = "/home/me/.ssh/id_ed25519"
//! use_sudo = true
//!
//! [screen]
//! width = 800
//! height = 480
//!
//! [engine]
//! device = "auto"
//! path = "/usr/local/bin/remotetouch-daemon"
//! # upload = "target/aarch64-unknown-linux-gnu/release/remotetouch-daemon"
//!
//! [timeouts]
//! handshake_secs = 15
//! command_secs = 30
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]` (or is an `Option`), so an
//! empty file, a file with only some sections, and no file at all are all
//! valid and mean "use the defaults".

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touch_core::DeviceMode;

use crate::domain::config::{
    DEFAULT_DAEMON_PATH, DEFAULT_PORT, DEFAULT_SSH_PROGRAM, DEFAULT_USER,
};
use crate::domain::{EngineDeployment, SessionConfig, SessionTimeouts};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    #[serde(default)]
    pub ssh: SshSection,
    #[serde(default)]
    pub screen: ScreenSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub timeouts: TimeoutsSection,
}

/// Where and how to connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SshSection {
    /// Default target; usually given on the command line instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Private key for `ssh -i`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<PathBuf>,
    /// Run the engine via `sudo -n`.
    #[serde(default)]
    pub use_sudo: bool,
    /// SSH client executable.
    #[serde(default = "default_ssh_program")]
    pub program: String,
}

/// Logical screen size; both absent means "let the engine detect it".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScreenSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Which engine to run and how it finds the touchscreen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    #[serde(default)]
    pub device: DeviceMode,
    /// Engine binary on the remote device.
    #[serde(default = "default_daemon_path")]
    pub path: String,
    /// Local engine binary to upload instead of running `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<PathBuf>,
}

/// Session manager timeouts in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeoutsSection {
    #[serde(default = "default_handshake_secs")]
    pub handshake_secs: u64,
    #[serde(default = "default_command_secs")]
    pub command_secs: u64,
    #[serde(default = "default_shutdown_secs")]
    pub shutdown_secs: u64,
    #[serde(default = "default_terminate_grace_secs")]
    pub terminate_grace_secs: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_user() -> String {
    DEFAULT_USER.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_ssh_program() -> String {
    DEFAULT_SSH_PROGRAM.to_string()
}
fn default_daemon_path() -> String {
    DEFAULT_DAEMON_PATH.to_string()
}
fn default_handshake_secs() -> u64 {
    SessionTimeouts::default().handshake.as_secs()
}
fn default_command_secs() -> u64 {
    SessionTimeouts::default().command.as_secs()
}
fn default_shutdown_secs() -> u64 {
    SessionTimeouts::default().shutdown.as_secs()
}
fn default_terminate_grace_secs() -> u64 {
    SessionTimeouts::default().terminate_grace.as_secs()
}

impl Default for SshSection {
    fn default() -> Self {
        Self {
            host: None,
            user: default_user(),
            port: default_port(),
            key: None,
            use_sudo: false,
            program: default_ssh_program(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            device: DeviceMode::default(),
            path: default_daemon_path(),
            upload: None,
        }
    }
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            handshake_secs: default_handshake_secs(),
            command_secs: default_command_secs(),
            shutdown_secs: default_shutdown_secs(),
            terminate_grace_secs: default_terminate_grace_secs(),
        }
    }
}

// ── Conversion into domain types ──────────────────────────────────────────────

impl HostConfig {
    /// A [`SessionConfig`] for `host` built from the file's values.
    pub fn session_config(&self, host: impl Into<String>) -> SessionConfig {
        let engine = match &self.engine.upload {
            Some(local_path) => EngineDeployment::Upload {
                local_path: local_path.clone(),
            },
            None => EngineDeployment::Installed {
                path: self.engine.path.clone(),
            },
        };
        SessionConfig {
            host: host.into(),
            user: self.ssh.user.clone(),
            port: self.ssh.port,
            key_file: self.ssh.key.clone(),
            screen_width: self.screen.width,
            screen_height: self.screen.height,
            use_sudo: self.ssh.use_sudo,
            engine,
            device_mode: self.engine.device,
            ssh_program: self.ssh.program.clone(),
        }
    }

    pub fn session_timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            handshake: Duration::from_secs(self.timeouts.handshake_secs),
            command: Duration::from_secs(self.timeouts.command_secs),
            shutdown: Duration::from_secs(self.timeouts.shutdown_secs),
            terminate_grace: Duration::from_secs(self.timeouts.terminate_grace_secs),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// The platform config directory for remotetouch.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when neither the XDG/APPDATA
/// variable nor `HOME` is set.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// The default `config.toml` path.
///
/// # Errors
///
/// See [`config_dir`].
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the default config file, or defaults if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<HostConfig, ConfigError> {
    match config_file_path() {
        Ok(path) => load_config_from(&path, true),
        // Nowhere to look means nothing to load.
        Err(ConfigError::NoPlatformConfigDir) => Ok(HostConfig::default()),
        Err(e) => Err(e),
    }
}

/// Loads `path`.  When `optional` is set a missing file yields defaults;
/// otherwise it is an error.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
pub fn load_config_from(path: &Path, optional: bool) -> Result<HostConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if optional && e.kind() == std::io::ErrorKind::NotFound => {
            Ok(HostConfig::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("remotetouch"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("remotetouch"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
