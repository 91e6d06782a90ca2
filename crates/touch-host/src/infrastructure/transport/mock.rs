//! Scripted in-memory engine for session manager tests.
//!
//! # How it works
//!
//! [`ScriptedLauncher::launch`] wires three `tokio::io::duplex` pipes to a
//! background task that plays the engine's part of the protocol according to
//! an [`EngineScript`].  Commands are read by one task and answered by
//! another, so if the host ever wrote a second command before the first was
//! answered, [`TransportStats::max_in_flight`] would show it.
//!
//! ```ignore
//! let launcher = ScriptedLauncher::new(EngineScript::default());
//! let stats = launcher.stats();
//! let manager = SessionManager::new(Arc::new(launcher));
//! let id = manager.connect(SessionConfig::new("pi")).await?;
//! assert_eq!(stats.launches(), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use touch_core::{
    decode_command, encode_response, Command, CommandKind, Response, ScreenSize,
};

use crate::application::transport::{
    TransportError, TransportHandle, TransportLauncher, TransportProcess,
};
use crate::domain::SessionConfig;

/// Exit code reported after a graceful SIGTERM.
pub const EXIT_TERMINATED: i32 = 143;
/// Exit code reported after a scripted crash.
pub const EXIT_CRASHED: i32 = 1;

const PIPE_CAPACITY: usize = 64 * 1024;

/// How the scripted engine behaves.
#[derive(Debug, Clone)]
pub struct EngineScript {
    /// Screen size reported in the `ready` response.
    pub screen: ScreenSize,
    /// Delay before every reply.
    pub reply_delay: Duration,
    /// Extra delay per command type, e.g. `("long_press", 2s)`.
    pub slow: HashMap<String, Duration>,
    /// Answer `init` with this error instead of `ready`.
    pub init_error: Option<String>,
    /// Never answer anything.
    pub silent: bool,
    /// Answer `init`, then never answer again.
    pub silent_after_init: bool,
    /// Exit with [`EXIT_CRASHED`] this long after a successful `init`,
    /// without being asked anything.
    pub exit_after_init: Option<Duration>,
    /// Exit with [`EXIT_CRASHED`] instead of answering this command type.
    pub crash_on: Option<String>,
    /// Answer this command type with a foreign id.
    pub wrong_id_for: Option<String>,
    /// Written to stderr right after start.
    pub stderr: String,
    /// Ignore SIGTERM and end of input; only a kill stops the engine.
    pub ignore_terminate: bool,
}

impl Default for EngineScript {
    fn default() -> Self {
        Self {
            screen: touch_core::domain::screen::FALLBACK_SCREEN,
            reply_delay: Duration::ZERO,
            slow: HashMap::new(),
            init_error: None,
            silent: false,
            silent_after_init: false,
            exit_after_init: None,
            crash_on: None,
            wrong_id_for: None,
            stderr: String::new(),
            ignore_terminate: false,
        }
    }
}

#[derive(Debug, Default)]
struct StatsInner {
    launches: usize,
    configs: Vec<SessionConfig>,
    received: Vec<Command>,
    in_flight: usize,
    max_in_flight: usize,
    terminated: usize,
    killed: usize,
    exited: usize,
}

/// Counters shared between a [`ScriptedLauncher`] and every engine it starts.
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    inner: Arc<Mutex<StatsInner>>,
}

impl TransportStats {
    fn lock(&self) -> MutexGuard<'_, StatsInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn launches(&self) -> usize {
        self.lock().launches
    }

    /// Configs passed to `launch`, in order.
    pub fn configs(&self) -> Vec<SessionConfig> {
        self.lock().configs.clone()
    }

    /// Every command the engines decoded, in arrival order.
    pub fn received(&self) -> Vec<Command> {
        self.lock().received.clone()
    }

    /// Wire types of [`received`](Self::received).
    pub fn received_types(&self) -> Vec<&'static str> {
        self.lock().received.iter().map(|c| c.kind.name()).collect()
    }

    /// Highest number of commands read but not yet answered.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    /// Number of SIGTERMs delivered.
    pub fn terminated(&self) -> usize {
        self.lock().terminated
    }

    /// Number of forced kills.
    pub fn killed(&self) -> usize {
        self.lock().killed
    }

    /// Number of engines that have exited.
    pub fn exited(&self) -> usize {
        self.lock().exited
    }
}

/// [`TransportLauncher`] that starts a scripted in-memory engine.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    script: EngineScript,
    stats: TransportStats,
    /// When set, `launch` fails with this message.
    pub fail_launch: Option<String>,
    /// When set, `launch` waits this long before starting the engine, like
    /// an SSH connection stuck before authentication.
    pub stall_launch: Option<Duration>,
}

impl ScriptedLauncher {
    pub fn new(script: EngineScript) -> Self {
        Self {
            script,
            stats: TransportStats::default(),
            fail_launch: None,
            stall_launch: None,
        }
    }

    pub fn stats(&self) -> TransportStats {
        self.stats.clone()
    }
}

#[async_trait]
impl TransportLauncher for ScriptedLauncher {
    async fn launch(&self, config: &SessionConfig) -> Result<TransportHandle, TransportError> {
        if let Some(stall) = self.stall_launch {
            tokio::time::sleep(stall).await;
        }
        if let Some(reason) = &self.fail_launch {
            return Err(TransportError::Spawn {
                program: config.ssh_program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, reason.clone()),
            });
        }
        {
            let mut stats = self.stats.lock();
            stats.launches += 1;
            stats.configs.push(config.clone());
        }

        let (host_stdin, engine_stdin) = tokio::io::duplex(PIPE_CAPACITY);
        let (engine_stdout, host_stdout) = tokio::io::duplex(PIPE_CAPACITY);
        let (engine_stderr, host_stderr) = tokio::io::duplex(PIPE_CAPACITY);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = watch::channel(None);

        let engine = ScriptedEngine {
            script: self.script.clone(),
            stats: self.stats.clone(),
        };
        tokio::spawn(engine.run(
            engine_stdin,
            engine_stdout,
            engine_stderr,
            signal_rx,
            exit_tx,
        ));

        Ok(TransportHandle {
            stdin: Box::new(host_stdin),
            stdout: Box::new(host_stdout),
            stderr: Box::new(host_stderr),
            process: Box::new(ScriptedProcess {
                signals: signal_tx,
                exit: exit_rx,
            }),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Term,
    Kill,
}

/// Handle to a scripted engine task.
struct ScriptedProcess {
    signals: mpsc::UnboundedSender<Signal>,
    exit: watch::Receiver<Option<Option<i32>>>,
}

#[async_trait]
impl TransportProcess for ScriptedProcess {
    async fn wait(&mut self) -> Result<Option<i32>, TransportError> {
        let status = *self.exit.wait_for(Option::is_some).await.map_err(|_| {
            TransportError::Process(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted engine vanished",
            ))
        })?;
        Ok(status.flatten())
    }

    fn terminate(&mut self) -> Result<(), TransportError> {
        // A send error means the engine already exited.
        let _ = self.signals.send(Signal::Term);
        Ok(())
    }

    async fn kill(&mut self) -> Result<(), TransportError> {
        let _ = self.signals.send(Signal::Kill);
        Ok(())
    }
}

struct ScriptedEngine {
    script: EngineScript,
    stats: TransportStats,
}

impl ScriptedEngine {
    async fn run(
        self,
        stdin: DuplexStream,
        mut stdout: DuplexStream,
        mut stderr: DuplexStream,
        mut signals: mpsc::UnboundedReceiver<Signal>,
        exit: watch::Sender<Option<Option<i32>>>,
    ) {
        if !self.script.stderr.is_empty() {
            let _ = stderr.write_all(self.script.stderr.as_bytes()).await;
        }

        // Reader: counts a command as in flight as soon as it is decoded.
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
        let stats = self.stats.clone();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdin).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let Ok(cmd) = decode_command(&line) else {
                    continue;
                };
                {
                    let mut s = stats.lock();
                    s.received.push(cmd.clone());
                    s.in_flight += 1;
                    s.max_in_flight = s.max_in_flight.max(s.in_flight);
                }
                if cmd_tx.send(cmd).is_err() {
                    break;
                }
            }
        });

        let mut initialized = false;
        let mut input_closed = false;
        let mut exit_at: Option<Instant> = None;
        let code = loop {
            let deadline = exit_at.unwrap_or_else(Instant::now);
            tokio::select! {
                _ = tokio::time::sleep_until(deadline), if exit_at.is_some() => {
                    break Some(EXIT_CRASHED);
                }
                signal = signals.recv() => {
                    if let Some(code) = self.on_signal(signal) {
                        break code;
                    }
                }
                cmd = cmd_rx.recv(), if !input_closed => {
                    let Some(cmd) = cmd else {
                        input_closed = true;
                        if self.script.ignore_terminate {
                            continue;
                        }
                        break Some(0);
                    };
                    // Signals still arrive while a slow answer is pending.
                    let outcome = {
                        let answer = self.answer(&cmd, &mut initialized, &mut stdout);
                        tokio::pin!(answer);
                        loop {
                            tokio::select! {
                                step = &mut answer => break Ok(step),
                                signal = signals.recv() => {
                                    if let Some(code) = self.on_signal(signal) {
                                        break Err(code);
                                    }
                                }
                            }
                        }
                    };
                    match outcome {
                        Ok(Step::Continue) => {}
                        Ok(Step::Exit(code)) => break Some(code),
                        Err(code) => break code,
                    }
                    if initialized && exit_at.is_none() {
                        exit_at = self.script.exit_after_init.map(|after| Instant::now() + after);
                    }
                }
            }
        };

        reader.abort();
        self.stats.lock().exited += 1;
        drop(stdout);
        drop(stderr);
        let _ = exit.send(Some(code));
    }

    /// Exit status to stop with, or `None` to keep running.
    fn on_signal(&self, signal: Option<Signal>) -> Option<Option<i32>> {
        match signal {
            Some(Signal::Kill) => {
                self.stats.lock().killed += 1;
                Some(None)
            }
            Some(Signal::Term) => {
                self.stats.lock().terminated += 1;
                (!self.script.ignore_terminate).then_some(Some(EXIT_TERMINATED))
            }
            // The process handle was dropped: nobody can stop us anymore.
            None => Some(None),
        }
    }

    async fn answer(
        &self,
        cmd: &Command,
        initialized: &mut bool,
        stdout: &mut DuplexStream,
    ) -> Step {
        let kind = cmd.kind.name();
        let quiet = self.script.silent || (self.script.silent_after_init && *initialized);

        if self.script.crash_on.as_deref() == Some(kind) {
            return Step::Exit(EXIT_CRASHED);
        }
        if quiet {
            return Step::Continue;
        }

        let delay = self.script.reply_delay
            + self.script.slow.get(kind).copied().unwrap_or(Duration::ZERO);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let id = match &self.script.wrong_id_for {
            Some(k) if k == kind => format!("not-{}", cmd.id),
            _ => cmd.id.clone(),
        };
        let (response, step) = match &cmd.kind {
            CommandKind::Init { .. } => match &self.script.init_error {
                Some(message) => (Response::error(id, message.clone()), Step::Continue),
                None => {
                    *initialized = true;
                    let message = "uinput device created at /dev/uinput; keyboard available";
                    (
                        Response::ready(id, self.script.screen, message),
                        Step::Continue,
                    )
                }
            },
            CommandKind::Shutdown => (
                Response::ok(id).with_message("shutting down"),
                Step::Exit(0),
            ),
            _ if !*initialized => (
                Response::error(id, "device not initialized, send init first"),
                Step::Continue,
            ),
            _ => (Response::ok(id), Step::Continue),
        };

        if let Ok(line) = encode_response(&response) {
            let _ = stdout.write_all(line.as_bytes()).await;
            let _ = stdout.flush().await;
        }
        let mut s = self.stats.lock();
        s.in_flight = s.in_flight.saturating_sub(1);
        step
    }
}

enum Step {
    Continue,
    Exit(i32),
}
