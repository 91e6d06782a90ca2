//! Transport ports: how the session manager reaches a remote engine.
//!
//! A [`TransportLauncher`] starts one transport process per session and hands
//! back a [`TransportHandle`]: the three byte streams of the engine plus a
//! [`TransportProcess`] used to wait for and stop it.  The SSH implementation
//! lives in `infrastructure::transport::ssh`; tests use the scripted engine in
//! `infrastructure::transport::mock`.
//!
//! # Why boxed streams? (for beginners)
//!
//! `tokio::process::ChildStdin` and the in-memory `tokio::io::DuplexStream`
//! used by tests are different types.  Boxing them as
//! `dyn AsyncWrite`/`dyn AsyncRead` lets the session manager treat both the
//! same way without becoming generic over the transport.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::domain::SessionConfig;

/// Error type for starting and stopping transport processes.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport program could not be started.
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The local engine binary for upload mode could not be read.
    #[error("failed to read engine binary {path}: {source}")]
    ReadEngine {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the uploaded engine into the transport failed.
    #[error("failed to upload engine: {0}")]
    Upload(#[source] std::io::Error),

    /// Waiting for, signalling, or killing the process failed.
    #[error("transport process error: {0}")]
    Process(#[source] std::io::Error),

    /// The process was started without one of its pipes.
    #[error("transport process is missing its {0} pipe")]
    MissingPipe(&'static str),
}

/// Write half carrying commands to the engine.
pub type TransportWriter = Box<dyn AsyncWrite + Send + Unpin>;
/// Read half carrying responses (stdout) or diagnostics (stderr).
pub type TransportReader = Box<dyn AsyncRead + Send + Unpin>;

/// Everything the session manager needs from one running transport.
pub struct TransportHandle {
    pub stdin: TransportWriter,
    pub stdout: TransportReader,
    pub stderr: TransportReader,
    pub process: Box<dyn TransportProcess>,
}

/// Control over a running transport process.
#[async_trait]
pub trait TransportProcess: Send {
    /// Waits for the process to exit and returns its exit code, if it has one
    /// (a process killed by a signal has none).
    async fn wait(&mut self) -> Result<Option<i32>, TransportError>;

    /// Asks the process to exit (SIGTERM on Unix).
    fn terminate(&mut self) -> Result<(), TransportError>;

    /// Forces the process to exit.
    async fn kill(&mut self) -> Result<(), TransportError>;
}

/// Starts transport processes that run the engine.
#[async_trait]
pub trait TransportLauncher: Send + Sync {
    /// Starts the engine described by `config`.
    ///
    /// When this returns, the engine's stdin is ready for the first protocol
    /// line (any upload has already been written).
    async fn launch(&self, config: &SessionConfig) -> Result<TransportHandle, TransportError>;
}
