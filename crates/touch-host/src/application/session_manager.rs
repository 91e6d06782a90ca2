//! SessionManager: owns every remote engine session and the traffic on it.
//!
//! # Session lifecycle (for beginners)
//!
//! ```text
//! connect()  ──►  launch transport  ──►  init  ──ready──►  registered (active)
//!                                          │                    │
//!                                  error / timeout        send_command()*
//!                                          │                    │
//!                                  terminate, nothing     disconnect()
//!                                  registered             shutdown → terminate → removed
//! ```
//!
//! Each session runs three background tasks:
//!
//! - **reader** – splits the engine's stdout into lines and hands each decoded
//!   [`Response`] to the request waiting for it;
//! - **stderr collector** – keeps the tail of the engine's stderr so a crash
//!   can be reported with its last words;
//! - **supervisor** – waits for the transport to exit (or for a termination
//!   request), then marks the session inactive and fails the waiting request.
//!
//! # One command at a time
//!
//! The protocol has no pipelining: the engine answers commands strictly in
//! order and the host may only have one outstanding.  Callers on the same
//! session are queued on an async mutex around the engine's stdin, held from
//! the write until the response (or timeout) arrives.
//!
//! # Correlation
//!
//! Every response must echo the id of the pending request.  A response for a
//! request that already timed out is discarded; any other mismatch fails the
//! pending request with [`SessionError::ProtocolViolation`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use touch_core::{
    decode_response, encode_command, Command, CommandKind, ProtocolError, Response, ScreenSize,
};

use crate::application::transport::{
    TransportError, TransportHandle, TransportLauncher, TransportProcess, TransportReader,
    TransportWriter,
};
use crate::domain::{SessionConfig, SessionTimeouts};

/// Unique identifier of a session.
pub type SessionId = Uuid;

/// How much of the engine's stderr is kept for error reports.
const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// How long the supervisor waits for the output pipes to drain after exit.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport could not be started or the handshake failed.
    #[error("failed to connect to {host}: {reason}")]
    Connection { host: String, reason: String },

    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("session is not active: {0}")]
    Inactive(SessionId),

    /// No response arrived in time.  The remote gesture is not interrupted.
    #[error("{kind} command timed out after {timeout:?}")]
    CommandTimeout {
        kind: &'static str,
        timeout: Duration,
    },

    /// The transport process exited while a command was outstanding.
    #[error("transport exited with {}; stderr: {stderr}", describe_exit(.code))]
    TransportClosed { code: Option<i32>, stderr: String },

    /// A response carried an id nobody was waiting for.
    #[error("response id mismatch: expected {expected}, received {received}")]
    ProtocolViolation { expected: String, received: String },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code".to_string(),
    }
}

/// Read-only snapshot of a session, as returned by
/// [`SessionManager::list_sessions`] and [`SessionManager::get_session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub id: SessionId,
    /// `user@host:port`.
    pub endpoint: String,
    pub active: bool,
    /// Screen size the engine resolved during the handshake.
    pub screen: Option<ScreenSize>,
    pub config: SessionConfig,
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.active { "active" } else { "inactive" };
        write!(f, "{} - {} ({state})", self.id, self.endpoint)
    }
}

// ── Per-session shared state ──────────────────────────────────────────────────

type Reply = Result<Response, SessionError>;

/// The single outstanding request of a session.
struct PendingRequest {
    id: String,
    reply: oneshot::Sender<Reply>,
}

/// Exit information recorded by the supervisor.
#[derive(Debug, Clone)]
struct ClosedTransport {
    code: Option<i32>,
    stderr: String,
}

impl ClosedTransport {
    fn error(&self) -> SessionError {
        SessionError::TransportClosed {
            code: self.code,
            stderr: self.stderr.clone(),
        }
    }
}

#[derive(Default)]
struct Correlation {
    pending: Option<PendingRequest>,
    /// Ids of requests that timed out; their late responses are dropped.
    abandoned: HashSet<String>,
    closed: Option<ClosedTransport>,
}

/// State shared between a session and its background tasks.
struct SessionState {
    id: SessionId,
    active: AtomicBool,
    correlation: Mutex<Correlation>,
    stderr: Mutex<String>,
}

/// Locks a std mutex, ignoring poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionState {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            active: AtomicBool::new(false),
            correlation: Mutex::new(Correlation::default()),
            stderr: Mutex::new(String::new()),
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Marks the session active unless the transport has already exited.
    fn activate(&self) -> bool {
        let c = lock(&self.correlation);
        if c.closed.is_some() {
            return false;
        }
        self.active.store(true, Ordering::SeqCst);
        true
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn closed_error(&self) -> Option<SessionError> {
        lock(&self.correlation).closed.as_ref().map(ClosedTransport::error)
    }

    /// Opens the pending slot for request `id`.
    fn begin(&self, id: &str) -> Result<oneshot::Receiver<Reply>, SessionError> {
        let mut c = lock(&self.correlation);
        if let Some(closed) = &c.closed {
            return Err(closed.error());
        }
        let (reply, rx) = oneshot::channel();
        c.pending = Some(PendingRequest {
            id: id.to_string(),
            reply,
        });
        Ok(rx)
    }

    /// Clears the pending slot if it still belongs to `id`.
    fn cancel(&self, id: &str) -> bool {
        let mut c = lock(&self.correlation);
        if c.pending.as_ref().is_some_and(|p| p.id == id) {
            c.pending = None;
            true
        } else {
            false
        }
    }

    /// Gives up on request `id`; a response arriving later is discarded.
    fn abandon(&self, id: &str) {
        if self.cancel(id) {
            lock(&self.correlation).abandoned.insert(id.to_string());
        }
    }

    /// Routes one stdout line to the pending request.
    fn deliver(&self, line: &str) {
        let response = match decode_response(line) {
            Ok(r) => r,
            Err(e) => {
                warn!(session = %self.id, "discarding malformed response line: {e}");
                return;
            }
        };
        debug!(session = %self.id, id = %response.id, status = ?response.status, "response received");

        let mut c = lock(&self.correlation);
        let matches_pending = c.pending.as_ref().map(|p| p.id == response.id);
        match matches_pending {
            Some(true) => {
                if let Some(pending) = c.pending.take() {
                    let _ = pending.reply.send(Ok(response));
                }
            }
            _ if c.abandoned.remove(&response.id) => {
                debug!(session = %self.id, id = %response.id, "discarding late response");
            }
            Some(false) => {
                if let Some(pending) = c.pending.take() {
                    warn!(
                        session = %self.id,
                        expected = %pending.id,
                        received = %response.id,
                        "response id mismatch"
                    );
                    let _ = pending.reply.send(Err(SessionError::ProtocolViolation {
                        expected: pending.id,
                        received: response.id,
                    }));
                }
            }
            None => {
                warn!(session = %self.id, id = %response.id, "discarding unsolicited response");
            }
        }
    }

    fn record_stderr(&self, line: &str) {
        let mut buf = lock(&self.stderr);
        buf.push_str(line);
        buf.push('\n');
        if buf.len() > STDERR_TAIL_BYTES {
            let mut cut = buf.len() - STDERR_TAIL_BYTES;
            while !buf.is_char_boundary(cut) {
                cut += 1;
            }
            buf.drain(..cut);
        }
    }

    /// Records the transport exit and fails the pending request.
    fn close(&self, code: Option<i32>) {
        self.deactivate();
        let closed = ClosedTransport {
            code,
            stderr: lock(&self.stderr).trim().to_string(),
        };
        let mut c = lock(&self.correlation);
        if let Some(pending) = c.pending.take() {
            warn!(
                session = %self.id,
                id = %pending.id,
                code = ?closed.code,
                "transport exited with a command outstanding"
            );
            let _ = pending.reply.send(Err(closed.error()));
        }
        c.abandoned.clear();
        c.closed = Some(closed);
    }
}

// ── Background tasks ──────────────────────────────────────────────────────────

async fn read_responses(state: Arc<SessionState>, stdout: TransportReader) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => state.deliver(&line),
            Ok(None) => {
                debug!(session = %state.id, "transport stdout closed");
                break;
            }
            Err(e) => {
                warn!(session = %state.id, "error reading transport stdout: {e}");
                break;
            }
        }
    }
}

async fn collect_stderr(state: Arc<SessionState>, stderr: TransportReader) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(session = %state.id, "remote: {line}");
        state.record_stderr(&line);
    }
}

/// SIGTERM, then a kill if the process outlives `grace`.
async fn stop_process(
    process: &mut dyn TransportProcess,
    grace: Duration,
) -> Result<Option<i32>, TransportError> {
    if let Err(e) = process.terminate() {
        warn!("failed to signal transport: {e}");
    }
    match tokio::time::timeout(grace, process.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!("transport still running {grace:?} after SIGTERM, killing it");
            process.kill().await?;
            process.wait().await
        }
    }
}

async fn supervise(
    state: Arc<SessionState>,
    mut process: Box<dyn TransportProcess>,
    mut terminate: oneshot::Receiver<()>,
    pipes: Vec<JoinHandle<()>>,
    grace: Duration,
) {
    // A dropped sender also counts as a termination request.
    let exited = tokio::select! {
        status = process.wait() => Some(status),
        _ = &mut terminate => None,
    };
    let status = match exited {
        Some(status) => status,
        None => stop_process(process.as_mut(), grace).await,
    };
    let code = match status {
        Ok(code) => code,
        Err(e) => {
            error!(session = %state.id, "failed to reap transport: {e}");
            None
        }
    };

    // Let the reader deliver a final response and the collector pick up the
    // last stderr lines before the session is closed.
    let drain = async {
        for pipe in pipes {
            let _ = pipe.await;
        }
    };
    if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        debug!(session = %state.id, "transport pipes still open after exit");
    }

    info!(session = %state.id, code = ?code, "transport exited");
    state.close(code);
}

// ── Session ───────────────────────────────────────────────────────────────────

/// One registered session.
struct Session {
    config: SessionConfig,
    screen: Option<ScreenSize>,
    state: Arc<SessionState>,
    /// Engine stdin; the lock serializes requests.  `None` once closed.
    stdin: tokio::sync::Mutex<Option<TransportWriter>>,
    terminate: Mutex<Option<oneshot::Sender<()>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Wires the background tasks to a freshly launched transport.
    fn start(
        id: SessionId,
        config: SessionConfig,
        handle: TransportHandle,
        grace: Duration,
    ) -> Self {
        let state = Arc::new(SessionState::new(id));
        let reader = tokio::spawn(read_responses(Arc::clone(&state), handle.stdout));
        let collector = tokio::spawn(collect_stderr(Arc::clone(&state), handle.stderr));
        let (terminate_tx, terminate_rx) = oneshot::channel();
        let supervisor = tokio::spawn(supervise(
            Arc::clone(&state),
            handle.process,
            terminate_rx,
            vec![reader, collector],
            grace,
        ));

        Self {
            config,
            screen: None,
            state,
            stdin: tokio::sync::Mutex::new(Some(handle.stdin)),
            terminate: Mutex::new(Some(terminate_tx)),
            supervisor: Mutex::new(Some(supervisor)),
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.state.id,
            endpoint: self.config.endpoint(),
            active: self.state.is_active(),
            screen: self.screen,
            config: self.config.clone(),
        }
    }

    /// Writes `command` and waits up to `timeout` for its response.
    async fn request(&self, command: &Command, timeout: Duration) -> Reply {
        let mut stdin = self.stdin.lock().await;
        self.exchange(&mut stdin, command, timeout).await
    }

    /// Like [`request`](Self::request), but returns `None` at once while
    /// another request holds stdin.
    async fn try_request(&self, command: &Command, timeout: Duration) -> Option<Reply> {
        let mut stdin = self.stdin.try_lock().ok()?;
        Some(self.exchange(&mut stdin, command, timeout).await)
    }

    async fn exchange(
        &self,
        stdin: &mut Option<TransportWriter>,
        command: &Command,
        timeout: Duration,
    ) -> Reply {
        let writer = stdin.as_mut().ok_or(SessionError::Inactive(self.state.id))?;

        let line = encode_command(command)?;
        let rx = self.state.begin(&command.id)?;
        debug!(session = %self.state.id, line = line.trim_end(), "sending");

        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        };
        if let Err(e) = written.await {
            self.state.cancel(&command.id);
            return Err(self.state.closed_error().unwrap_or(SessionError::Io(e)));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply,
            // The supervisor always answers before dropping the sender; this
            // only happens if it was torn down abruptly.
            Ok(Err(_)) => Err(self
                .state
                .closed_error()
                .unwrap_or(SessionError::TransportClosed {
                    code: None,
                    stderr: String::new(),
                })),
            Err(_) => {
                self.state.abandon(&command.id);
                warn!(
                    session = %self.state.id,
                    id = %command.id,
                    "no response within {timeout:?}"
                );
                Err(SessionError::CommandTimeout {
                    kind: command.kind.name(),
                    timeout,
                })
            }
        }
    }

    /// Closes stdin, asks the supervisor to stop the process, and waits for it.
    async fn terminate(&self) {
        self.state.deactivate();

        // Skipped when a request is still writing; the signal stops it anyway.
        if let Ok(mut stdin) = self.stdin.try_lock() {
            if let Some(mut writer) = stdin.take() {
                let _ = writer.shutdown().await;
            }
        }

        let terminate = lock(&self.terminate).take();
        if let Some(tx) = terminate {
            let _ = tx.send(());
        }
        let supervisor = lock(&self.supervisor).take();
        if let Some(handle) = supervisor {
            if let Err(e) = handle.await {
                error!(session = %self.state.id, "supervisor task failed: {e}");
            }
        }
    }
}

// ── SessionManager ────────────────────────────────────────────────────────────

/// Registry of live sessions.
///
/// `SessionManager` is `Send + Sync`; share it behind an `Arc` to use it from
/// several tasks.  Sessions are independent: a slow gesture on one never
/// delays another.
pub struct SessionManager {
    launcher: Arc<dyn TransportLauncher>,
    timeouts: SessionTimeouts,
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionManager {
    /// Creates an empty manager with default timeouts.
    pub fn new(launcher: Arc<dyn TransportLauncher>) -> Self {
        Self {
            launcher,
            timeouts: SessionTimeouts::default(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the timeouts used by every later call.
    pub fn with_timeouts(mut self, timeouts: SessionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> SessionTimeouts {
        self.timeouts
    }

    /// Starts the engine for `config` and completes the `init` handshake.
    ///
    /// Nothing is registered unless the engine answers `ready` within the
    /// handshake timeout.  Launching the transport (including an engine
    /// upload) gets its own handshake-length budget.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connection`] if the transport cannot be
    /// launched or does not start in time, the engine answers `init` with an
    /// error, the transport exits, or the handshake times out.
    pub async fn connect(&self, config: SessionConfig) -> Result<SessionId, SessionError> {
        let id = Uuid::new_v4();
        let host = config.host.clone();
        info!(session = %id, endpoint = %config.endpoint(), "connecting");

        let launch = self.launcher.launch(&config);
        let handle = match tokio::time::timeout(self.timeouts.handshake, launch).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                warn!(session = %id, %host, "launch failed: {e}");
                return Err(SessionError::Connection {
                    host,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                let reason = format!(
                    "transport did not start within {:?}",
                    self.timeouts.handshake
                );
                warn!(session = %id, %host, "connect failed: {reason}");
                return Err(SessionError::Connection { host, reason });
            }
        };

        let mut session = Session::start(id, config, handle, self.timeouts.terminate_grace);
        let init = Command::with_id(
            format!("init-{id}"),
            CommandKind::Init {
                screen_width: session.config.screen_width,
                screen_height: session.config.screen_height,
            },
        );

        let outcome = session.request(&init, self.timeouts.handshake).await;
        let reason = match outcome {
            Ok(resp) if !resp.is_error() => {
                session.screen = resp.screen_size();
                if session.state.activate() {
                    info!(
                        session = %id,
                        screen = ?session.screen,
                        detail = resp.message.as_deref().unwrap_or_default(),
                        "session ready"
                    );
                    self.sessions.write().await.insert(id, Arc::new(session));
                    return Ok(id);
                }
                session
                    .state
                    .closed_error()
                    .map_or_else(|| "transport closed".to_string(), |e| e.to_string())
            }
            Ok(resp) => format!(
                "engine init failed: {}",
                resp.message.as_deref().unwrap_or("no reason given")
            ),
            Err(e) => e.to_string(),
        };

        session.terminate().await;
        warn!(session = %id, %host, "connect failed: {reason}");
        Err(SessionError::Connection { host, reason })
    }

    /// Sends one command and waits for its response.
    ///
    /// A remote failure is still `Ok`: check [`Response::status`] or call
    /// [`Response::into_result`].
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotFound`] / [`SessionError::Inactive`] before sending;
    /// - [`SessionError::CommandTimeout`] if no response arrives in time;
    /// - [`SessionError::TransportClosed`] if the transport exits meanwhile;
    /// - [`SessionError::ProtocolViolation`] on a response for another id.
    pub async fn send_command(
        &self,
        id: SessionId,
        command: Command,
    ) -> Result<Response, SessionError> {
        let session = self.session(id).await?;
        if !session.state.is_active() {
            return Err(SessionError::Inactive(id));
        }
        session.request(&command, self.timeouts.command).await
    }

    /// Shuts the engine down, stops the transport, and forgets the session.
    ///
    /// The `shutdown` command is best effort: if it fails or times out the
    /// transport is terminated regardless.  It is not sent at all while a
    /// command is still in flight; that command fails with
    /// [`SessionError::TransportClosed`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown id.
    pub async fn disconnect(&self, id: SessionId) -> Result<(), SessionError> {
        let session = self.session(id).await?;

        if session.state.is_active() {
            let shutdown = Command::with_id(format!("shutdown-{id}"), CommandKind::Shutdown);
            match session.try_request(&shutdown, self.timeouts.shutdown).await {
                Some(Ok(resp)) => {
                    debug!(session = %id, status = ?resp.status, "shutdown acknowledged")
                }
                Some(Err(e)) => debug!(session = %id, "shutdown not acknowledged: {e}"),
                None => debug!(session = %id, "command in flight, skipping shutdown"),
            }
        }

        session.terminate().await;
        self.sessions.write().await.remove(&id);
        info!(session = %id, "session closed");
        Ok(())
    }

    /// Disconnects every session, logging individual failures.
    pub async fn disconnect_all(&self) {
        let ids: Vec<SessionId> = self.sessions.read().await.keys().copied().collect();
        for id in ids {
            if let Err(e) = self.disconnect(id).await {
                warn!(session = %id, "disconnect failed: {e}");
            }
        }
    }

    /// Snapshots of every registered session, ordered by endpoint.
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .read()
            .await
            .values()
            .map(|s| s.info())
            .collect();
        infos.sort_by(|a, b| a.endpoint.cmp(&b.endpoint).then(a.id.cmp(&b.id)));
        infos
    }

    /// Snapshot of one session.
    pub async fn get_session(&self, id: SessionId) -> Option<SessionInfo> {
        self.sessions.read().await.get(&id).map(|s| s.info())
    }

    async fn session(&self, id: SessionId) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(state: &SessionState, id: &str) -> oneshot::Receiver<Reply> {
        state.begin(id).unwrap()
    }

    #[test]
    fn test_matching_response_resolves_pending_request() {
        // Arrange
        let state = SessionState::new(Uuid::new_v4());
        let mut rx = pending(&state, "tap-1");

        // Act
        state.deliver(r#"{"id":"tap-1","status":"ok"}"#);

        // Assert
        let reply = rx.try_recv().unwrap().unwrap();
        assert_eq!(reply.id, "tap-1");
    }

    #[test]
    fn test_malformed_line_leaves_pending_request_untouched() {
        let state = SessionState::new(Uuid::new_v4());
        let mut rx = pending(&state, "tap-1");

        state.deliver("Traceback (most recent call last):");

        assert!(rx.try_recv().is_err());
        state.deliver(r#"{"id":"tap-1","status":"ok"}"#);
        assert!(rx.try_recv().unwrap().is_ok());
    }

    #[test]
    fn test_late_response_for_abandoned_request_is_discarded() {
        // Arrange
        let state = SessionState::new(Uuid::new_v4());
        let _old = pending(&state, "slow-1");
        state.abandon("slow-1");
        let mut rx = pending(&state, "tap-2");

        // Act
        state.deliver(r#"{"id":"slow-1","status":"ok"}"#);

        // Assert – still waiting for tap-2
        assert!(rx.try_recv().is_err());
        state.deliver(r#"{"id":"tap-2","status":"ok"}"#);
        assert_eq!(rx.try_recv().unwrap().unwrap().id, "tap-2");
    }

    #[test]
    fn test_foreign_id_is_a_protocol_violation() {
        let state = SessionState::new(Uuid::new_v4());
        let mut rx = pending(&state, "tap-1");

        state.deliver(r#"{"id":"tap-9","status":"ok"}"#);

        match rx.try_recv().unwrap() {
            Err(SessionError::ProtocolViolation { expected, received }) => {
                assert_eq!(expected, "tap-1");
                assert_eq!(received, "tap-9");
            }
            other => panic!("expected ProtocolViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_close_fails_pending_request_with_stderr() {
        // Arrange
        let state = SessionState::new(Uuid::new_v4());
        state.record_stderr("PermissionError: /dev/uinput");
        let mut rx = pending(&state, "tap-1");

        // Act
        state.close(Some(1));

        // Assert
        match rx.try_recv().unwrap() {
            Err(SessionError::TransportClosed { code, stderr }) => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "PermissionError: /dev/uinput");
            }
            other => panic!("expected TransportClosed, got {other:?}"),
        }
        assert!(!state.activate());
        assert!(matches!(
            state.begin("tap-2"),
            Err(SessionError::TransportClosed { .. })
        ));
    }

    #[test]
    fn test_stderr_keeps_only_the_tail() {
        let state = SessionState::new(Uuid::new_v4());
        for i in 0..2000 {
            state.record_stderr(&format!("line {i}"));
        }
        let buf = lock(&state.stderr).clone();
        assert!(buf.len() <= STDERR_TAIL_BYTES);
        assert!(buf.ends_with("line 1999\n"));
    }

    #[test]
    fn test_session_info_display() {
        let id = Uuid::nil();
        let info = SessionInfo {
            id,
            endpoint: "pi@kiosk:22".to_string(),
            active: true,
            screen: ScreenSize::new(800, 480),
            config: SessionConfig::new("kiosk"),
        };
        assert_eq!(
            info.to_string(),
            "00000000-0000-0000-0000-000000000000 - pi@kiosk:22 (active)"
        );
    }

    #[test]
    fn test_transport_closed_message_includes_code_and_stderr() {
        let err = SessionError::TransportClosed {
            code: Some(255),
            stderr: "Permission denied (publickey).".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "transport exited with code 255; stderr: Permission denied (publickey)."
        );
    }
}
