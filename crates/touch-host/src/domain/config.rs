//! Session parameters.
//!
//! [`SessionConfig`] is supplied once to
//! [`SessionManager::connect`](crate::application::session_manager::SessionManager::connect)
//! and never changes for the lifetime of the session.  It says *where* to
//! connect and *how* the engine gets started on the other end.
//!
//! # Engine deployment (for beginners)
//!
//! The engine (`remotetouch-daemon`) has to exist on the remote device before
//! it can run.  Two ways are supported:
//!
//! | Variant | Remote command |
//! |---------|----------------|
//! | [`EngineDeployment::Installed`] | runs a binary already on the device's `PATH` (or at an absolute path) |
//! | [`EngineDeployment::Upload`] | streams a local binary over the SSH channel into a temp file, runs it, deletes it |
//!
//! Upload is convenient during development; an installed binary starts faster.

use std::path::PathBuf;
use std::time::Duration;

use touch_core::DeviceMode;

/// Default remote SSH user (Raspberry Pi OS convention).
pub const DEFAULT_USER: &str = "pi";
/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;
/// Default name of the engine binary on the remote device.
pub const DEFAULT_DAEMON_PATH: &str = "remotetouch-daemon";
/// Default local SSH client.
pub const DEFAULT_SSH_PROGRAM: &str = "ssh";

/// How the engine binary reaches the remote device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineDeployment {
    /// Run a binary that is already installed remotely.
    Installed { path: String },
    /// Upload this local binary before starting it.
    Upload { local_path: PathBuf },
}

impl Default for EngineDeployment {
    fn default() -> Self {
        EngineDeployment::Installed {
            path: DEFAULT_DAEMON_PATH.to_string(),
        }
    }
}

/// Immutable parameters for one remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub host: String,
    pub user: String,
    pub port: u16,
    /// Private key passed to `ssh -i`.
    pub key_file: Option<PathBuf>,
    /// Logical screen width; the engine auto-detects when absent.
    pub screen_width: Option<u32>,
    /// Logical screen height; the engine auto-detects when absent.
    pub screen_height: Option<u32>,
    /// Run the engine through `sudo -n`.
    pub use_sudo: bool,
    pub engine: EngineDeployment,
    /// Touchscreen strategy passed to the engine as `--device`.
    pub device_mode: DeviceMode,
    /// Local SSH client executable.
    pub ssh_program: String,
}

impl SessionConfig {
    /// A config for `host` with every other field at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: DEFAULT_USER.to_string(),
            port: DEFAULT_PORT,
            key_file: None,
            screen_width: None,
            screen_height: None,
            use_sudo: false,
            engine: EngineDeployment::default(),
            device_mode: DeviceMode::default(),
            ssh_program: DEFAULT_SSH_PROGRAM.to_string(),
        }
    }

    /// `user@host:port`, as shown in session listings.
    pub fn endpoint(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }
}

/// How long the session manager waits at each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// `init` round trip during `connect`.
    pub handshake: Duration,
    /// Any command sent with `send_command`.
    pub command: Duration,
    /// The best-effort `shutdown` sent by `disconnect`.
    pub shutdown: Duration,
    /// Time between SIGTERM and a forced kill of the transport.
    pub terminate_grace: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(15),
            command: Duration::from_secs(30),
            shutdown: Duration::from_secs(5),
            terminate_grace: Duration::from_secs(3),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config_uses_defaults() {
        // Arrange / Act
        let cfg = SessionConfig::new("192.168.1.50");

        // Assert
        assert_eq!(cfg.user, "pi");
        assert_eq!(cfg.port, 22);
        assert!(!cfg.use_sudo);
        assert_eq!(cfg.device_mode, DeviceMode::Auto);
        assert_eq!(
            cfg.engine,
            EngineDeployment::Installed {
                path: "remotetouch-daemon".to_string()
            }
        );
    }

    #[test]
    fn test_endpoint_formats_user_host_port() {
        let mut cfg = SessionConfig::new("kiosk.local");
        cfg.user = "root".to_string();
        cfg.port = 2222;
        assert_eq!(cfg.endpoint(), "root@kiosk.local:2222");
    }

    #[test]
    fn test_default_timeouts() {
        let t = SessionTimeouts::default();
        assert_eq!(t.handshake, Duration::from_secs(15));
        assert_eq!(t.command, Duration::from_secs(30));
        assert_eq!(t.shutdown, Duration::from_secs(5));
        assert_eq!(t.terminate_grace, Duration::from_secs(3));
    }
}
