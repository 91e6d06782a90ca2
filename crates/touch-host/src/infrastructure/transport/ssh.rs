//! SSH transport: runs the engine through the system `ssh` client.
//!
//! # Invocation
//!
//! ```text
//! ssh -T -o StrictHostKeyChecking=accept-new -o BatchMode=yes \
//!     -o ServerAliveInterval=15 -o ServerAliveCountMax=3 \
//!     -p <port> [-i <key>] <user>@<host> '<remote command>'
//! ```
//!
//! - `-T` disables the pseudo-terminal, so the channel is a clean byte pipe.
//! - `BatchMode=yes` makes `ssh` fail instead of prompting for a password;
//!   there is nobody to type one.
//! - The keepalive options make a dead link end the process within ~45 s.
//!
//! # Remote command
//!
//! | Deployment | Remote command |
//! |------------|----------------|
//! | installed | `[sudo -n] <daemon> --device <mode>` |
//! | upload    | `f=$(mktemp) …; head -c <N> > "$f"; chmod 700 "$f"; [sudo -n] "$f" --device <mode>` |
//!
//! In upload mode the first N bytes on the channel are the engine binary;
//! `head -c N` consumes exactly those, so the protocol lines that follow
//! reach the engine.  A shell `trap` deletes the temp file on exit.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::application::transport::{
    TransportError, TransportHandle, TransportLauncher, TransportProcess,
};
use crate::domain::{EngineDeployment, SessionConfig};

/// Options passed to every `ssh` invocation.
const SSH_OPTIONS: &[&str] = &[
    "-T",
    "-o",
    "StrictHostKeyChecking=accept-new",
    "-o",
    "BatchMode=yes",
    "-o",
    "ServerAliveInterval=15",
    "-o",
    "ServerAliveCountMax=3",
];

/// Quotes `s` for a POSIX shell.
///
/// Strings made only of safe characters are returned unchanged; anything else
/// is wrapped in single quotes with embedded quotes written as `'\''`.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// The command line that starts the engine once it is on the device.
fn engine_invocation(config: &SessionConfig, program: &str) -> String {
    let sudo = if config.use_sudo { "sudo -n " } else { "" };
    format!("{sudo}{program} --device {}", config.device_mode)
}

/// Builds the remote command for `config`.
///
/// `upload_len` is the size of the binary to upload; it is ignored for an
/// installed engine.
pub fn remote_command(config: &SessionConfig, upload_len: u64) -> String {
    match &config.engine {
        EngineDeployment::Installed { path } => engine_invocation(config, &shell_quote(path)),
        EngineDeployment::Upload { .. } => format!(
            "f=$(mktemp /tmp/remotetouch-daemon.XXXXXX) || exit 1; \
             trap 'rm -f \"$f\"' EXIT HUP INT TERM; \
             head -c {upload_len} > \"$f\" && chmod 700 \"$f\" && {}",
            engine_invocation(config, "\"$f\"")
        ),
    }
}

/// The full `ssh` argument list (without the program name).
pub fn ssh_args(config: &SessionConfig, remote_command: &str) -> Vec<String> {
    let mut args: Vec<String> = SSH_OPTIONS.iter().map(|s| s.to_string()).collect();
    args.push("-p".to_string());
    args.push(config.port.to_string());
    if let Some(key) = &config.key_file {
        args.push("-i".to_string());
        args.push(key.display().to_string());
    }
    args.push(format!("{}@{}", config.user, config.host));
    args.push(remote_command.to_string());
    args
}

/// [`TransportLauncher`] backed by the system SSH client.
#[derive(Debug, Default, Clone, Copy)]
pub struct SshLauncher;

impl SshLauncher {
    pub fn new() -> Self {
        Self
    }
}

async fn read_engine(path: &Path) -> Result<Vec<u8>, TransportError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| TransportError::ReadEngine {
            path: path.display().to_string(),
            source,
        })
}

#[async_trait]
impl TransportLauncher for SshLauncher {
    async fn launch(&self, config: &SessionConfig) -> Result<TransportHandle, TransportError> {
        let upload = match &config.engine {
            EngineDeployment::Upload { local_path } => Some(read_engine(local_path).await?),
            EngineDeployment::Installed { .. } => None,
        };
        let upload_len = upload.as_ref().map_or(0, |b| b.len() as u64);

        let remote = remote_command(config, upload_len);
        let args = ssh_args(config, &remote);
        debug!(program = %config.ssh_program, ?args, "spawning transport");

        let mut child = Command::new(&config.ssh_program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: config.ssh_program.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or(TransportError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(TransportError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(TransportError::MissingPipe("stderr"))?;

        if let Some(binary) = upload {
            info!(
                endpoint = %config.endpoint(),
                bytes = binary.len(),
                "uploading engine binary"
            );
            stdin.write_all(&binary).await.map_err(TransportError::Upload)?;
            stdin.flush().await.map_err(TransportError::Upload)?;
        }

        Ok(TransportHandle {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            process: Box::new(SshProcess { child }),
        })
    }
}

/// A running `ssh` child.
struct SshProcess {
    child: Child,
}

#[async_trait]
impl TransportProcess for SshProcess {
    async fn wait(&mut self) -> Result<Option<i32>, TransportError> {
        let status = self.child.wait().await.map_err(TransportError::Process)?;
        Ok(status.code())
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> Result<(), TransportError> {
        // Already reaped: nothing to signal.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        let pid = libc::pid_t::try_from(pid).map_err(|_| {
            TransportError::Process(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("pid {pid} out of range"),
            ))
        })?;
        // SAFETY: `kill` has no memory-safety preconditions; `pid` is our own
        // child, which has not been reaped because `id()` returned `Some`.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc == 0 {
            Ok(())
        } else {
            Err(TransportError::Process(std::io::Error::last_os_error()))
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<(), TransportError> {
        self.child.start_kill().map_err(TransportError::Process)
    }

    async fn kill(&mut self) -> Result<(), TransportError> {
        self.child.kill().await.map_err(TransportError::Process)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
