//! Engine sessions.
//!
//! A session owns one engine process and its request/response channel. It is
//! a small state machine:
//!
//! ```text
//! Unstarted -> Starting -> Ready <-> Busy
//!                  |                  |
//!                  +----> Failed <----+        any -> Stopped (stop)
//! ```
//!
//! `Failed` is terminal. A session that timed out is not restarted behind the
//! caller's back: whoever owns it decides whether to launch a new one.

use arena_core::{notation, Position, Reply, SearchLimit, SessionError, SessionState};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::uci::{self, EngineLine};

/// Trait implemented by every engine session (UCI processes, test doubles).
///
/// All methods take `&mut self`, so a session can never have two requests in
/// flight at once.
#[async_trait]
pub trait EngineSession: Send {
    /// Label used in logs and reports
    fn name(&self) -> &str;

    fn state(&self) -> SessionState;

    /// Launch the engine and complete the handshake.
    async fn start(&mut self) -> Result<(), SessionError>;

    /// Tell the engine the next search is unrelated to the previous one.
    async fn new_game(&mut self) -> Result<(), SessionError>;

    /// Search `position` within `limit` and wait for the chosen move.
    async fn submit(
        &mut self,
        position: &Position,
        limit: &SearchLimit,
    ) -> Result<Reply, SessionError>;

    /// Release the engine. Idempotent; always ends in `Stopped`.
    async fn stop(&mut self);
}

/// Launches ready-to-use sessions. Used wherever a caller may need more than
/// one session for the same engine (worker pools, explicit restarts).
#[async_trait]
pub trait SessionFactory: Send + Sync {
    fn name(&self) -> &str;

    async fn launch(&self) -> Result<Box<dyn EngineSession>, SessionError>;
}

/// How to run one engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub name: String,
    pub path: PathBuf,
    pub args: Vec<String>,
    /// Sent as `setoption` after the handshake
    pub options: BTreeMap<String, String>,
    /// Limit for `uci`/`uciok` and every `isready`/`readyok` round trip
    pub handshake_timeout: Duration,
    /// Added on top of the search budget before a request times out
    pub grace: Duration,
    /// Stands in for the search budget of depth-limited requests
    pub depth_budget: Duration,
    /// How long to wait for the process to exit after `quit`
    pub quit_grace: Duration,
}

impl EngineConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            args: Vec::new(),
            options: BTreeMap::new(),
            handshake_timeout: Duration::from_secs(10),
            grace: Duration::from_secs(1),
            depth_budget: Duration::from_secs(120),
            quit_grace: Duration::from_millis(500),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug)]
enum ReadError {
    Timeout,
    Closed,
    Io(io::Error),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Timeout => f.write_str("timed out"),
            ReadError::Closed => f.write_str("engine exited"),
            ReadError::Io(e) => write!(f, "read failed: {e}"),
        }
    }
}

fn protocol_error(engine: &str, detail: impl Into<String>) -> SessionError {
    SessionError::Protocol {
        engine: engine.to_string(),
        detail: detail.into(),
    }
}

fn read_error(engine: &str, err: ReadError, budget: Duration) -> SessionError {
    match err {
        ReadError::Timeout => SessionError::Timeout {
            engine: engine.to_string(),
            budget,
        },
        other => protocol_error(engine, other.to_string()),
    }
}

/// The spawned process and its pipes. All process I/O goes through here.
struct EngineProcess {
    label: String,
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

impl EngineProcess {
    fn spawn(config: &EngineConfig) -> io::Result<Self> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "no stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "no stdout"))?;
        Ok(Self {
            label: config.name.clone(),
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
        })
    }

    async fn send(&mut self, line: &str) -> io::Result<()> {
        debug!(engine = %self.label, ">> {line}");
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await
    }

    async fn recv(&mut self, deadline: Instant) -> Result<String, ReadError> {
        match timeout_at(deadline, self.lines.next_line()).await {
            Err(_) => Err(ReadError::Timeout),
            Ok(Err(e)) => Err(ReadError::Io(e)),
            Ok(Ok(None)) => Err(ReadError::Closed),
            Ok(Ok(Some(line))) => {
                debug!(engine = %self.label, "<< {line}");
                Ok(line)
            }
        }
    }

    async fn sync_ready(&mut self, deadline: Instant) -> Result<(), ReadError> {
        self.send("isready").await.map_err(ReadError::Io)?;
        loop {
            if uci::parse_line(&self.recv(deadline).await?) == EngineLine::ReadyOk {
                return Ok(());
            }
        }
    }
}

/// Session backed by an external UCI engine process.
pub struct UciSession {
    config: EngineConfig,
    state: SessionState,
    process: Option<EngineProcess>,
    /// `id name` reported during the handshake
    engine_id: Option<String>,
    advertised_options: HashSet<String>,
}

impl UciSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: SessionState::Unstarted,
            process: None,
            engine_id: None,
            advertised_options: HashSet::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Name the engine reported for itself, once started.
    pub fn engine_id(&self) -> Option<&str> {
        self.engine_id.as_deref()
    }

    fn unavailable(&self) -> SessionError {
        SessionError::Unavailable {
            engine: self.config.name.clone(),
            state: self.state,
        }
    }

    async fn handshake(&mut self, process: &mut EngineProcess) -> Result<(), String> {
        let deadline = Instant::now() + self.config.handshake_timeout;
        process
            .send("uci")
            .await
            .map_err(|e| format!("cannot write to engine: {e}"))?;
        loop {
            let line = process
                .recv(deadline)
                .await
                .map_err(|e| format!("waiting for uciok: {e}"))?;
            match uci::parse_line(&line) {
                EngineLine::Id { name } => self.engine_id = Some(name),
                EngineLine::Option { name } => {
                    self.advertised_options.insert(name);
                }
                EngineLine::UciOk => break,
                _ => {}
            }
        }

        for (name, value) in &self.config.options {
            if !self.advertised_options.contains(name) {
                warn!(engine = %self.config.name, option = %name, "engine does not advertise option");
            }
            process
                .send(&uci::setoption_command(name, value))
                .await
                .map_err(|e| format!("cannot write to engine: {e}"))?;
        }

        process
            .sync_ready(deadline)
            .await
            .map_err(|e| format!("waiting for readyok: {e}"))
    }

    async fn search(
        &mut self,
        position: &Position,
        limit: &SearchLimit,
        budget: Duration,
    ) -> Result<Reply, SessionError> {
        let engine = self.config.name.clone();
        let Some(process) = self.process.as_mut() else {
            return Err(protocol_error(&engine, "no engine process"));
        };

        let sent = async {
            process.send(&uci::position_command(position)).await?;
            process.send(&uci::go_command(limit)).await
        }
        .await;
        if let Err(e) = sent {
            return Err(protocol_error(&engine, format!("cannot write to engine: {e}")));
        }

        let started = Instant::now();
        let deadline = started + budget;
        let mut reply = Reply::new(String::new());
        let mut exact_score = false;

        loop {
            let line = match process.recv(deadline).await {
                Ok(line) => line,
                Err(e) => return Err(read_error(&engine, e, budget)),
            };
            match uci::parse_line(&line) {
                EngineLine::Info(info) if info.is_primary() => {
                    // A bound only stands in until an exact score arrives
                    if let Some(score) = info.score {
                        if info.bound.is_none() {
                            reply.score = Some(score);
                            exact_score = true;
                        } else if !exact_score {
                            reply.score = Some(score);
                        }
                    }
                    if info.depth.is_some() {
                        reply.depth = info.depth;
                    }
                    if info.nodes.is_some() {
                        reply.nodes = info.nodes;
                    }
                }
                EngineLine::BestMove { mv } => {
                    reply.elapsed = started.elapsed();
                    return match mv {
                        Some(mv) if notation::looks_like_uci(&mv) => {
                            reply.best_move = mv;
                            Ok(reply)
                        }
                        Some(mv) => Err(protocol_error(
                            &engine,
                            format!("unparseable best move `{mv}`"),
                        )),
                        None => Err(protocol_error(
                            &engine,
                            format!("no best move in `{}`", line.trim()),
                        )),
                    };
                }
                _ => {}
            }
        }
    }

    /// Move into `Failed` (or back to `Ready`) depending on how a request went.
    fn settle<T>(&mut self, result: &Result<T, SessionError>) {
        match result {
            Ok(_) => self.state = SessionState::Ready,
            Err(e) => {
                warn!(engine = %self.config.name, error = %e, "session failed");
                self.state = SessionState::Failed;
            }
        }
    }
}

#[async_trait]
impl EngineSession for UciSession {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn state(&self) -> SessionState {
        self.state
    }

    async fn start(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Unstarted {
            return Err(self.unavailable());
        }
        self.state = SessionState::Starting;
        info!(engine = %self.config.name, path = %self.config.path.display(), "launching engine");

        let mut process = match EngineProcess::spawn(&self.config) {
            Ok(process) => process,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(SessionError::Launch {
                    engine: self.config.name.clone(),
                    reason: format!("cannot spawn {}: {e}", self.config.path.display()),
                });
            }
        };

        if let Err(reason) = self.handshake(&mut process).await {
            // Dropping the process kills it
            self.state = SessionState::Failed;
            return Err(SessionError::Launch {
                engine: self.config.name.clone(),
                reason,
            });
        }

        info!(
            engine = %self.config.name,
            id = self.engine_id.as_deref().unwrap_or("?"),
            "engine ready"
        );
        self.process = Some(process);
        self.state = SessionState::Ready;
        Ok(())
    }

    async fn new_game(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Ready {
            return Err(self.unavailable());
        }
        self.state = SessionState::Busy;
        let budget = self.config.handshake_timeout;
        let engine = self.config.name.clone();

        let result = match self.process.as_mut() {
            None => Err(protocol_error(&engine, "no engine process")),
            Some(process) => match process.send("ucinewgame").await {
                Err(e) => Err(protocol_error(&engine, format!("cannot write to engine: {e}"))),
                Ok(()) => match process.sync_ready(Instant::now() + budget).await {
                    Ok(()) => Ok(()),
                    Err(e) => Err(read_error(&engine, e, budget)),
                },
            },
        };
        self.settle(&result);
        result
    }

    async fn submit(
        &mut self,
        position: &Position,
        limit: &SearchLimit,
    ) -> Result<Reply, SessionError> {
        if self.state != SessionState::Ready {
            return Err(self.unavailable());
        }
        self.state = SessionState::Busy;
        let budget = limit.deadline(self.config.depth_budget, self.config.grace);

        let result = self.search(position, limit, budget).await;
        self.settle(&result);
        result
    }

    async fn stop(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.send("quit").await.ok();
            match timeout(self.config.quit_grace, process.child.wait()).await {
                Ok(Ok(status)) => debug!(engine = %self.config.name, %status, "engine exited"),
                _ => {
                    warn!(engine = %self.config.name, "engine ignored quit, killing");
                    process.child.kill().await.ok();
                }
            }
        }
        if self.state != SessionState::Stopped {
            info!(engine = %self.config.name, "session stopped");
        }
        self.state = SessionState::Stopped;
    }
}

impl Drop for UciSession {
    fn drop(&mut self) {
        if self.process.is_some() {
            debug!(engine = %self.config.name, "session dropped without stop, killing engine");
        }
    }
}

/// Builds started [`UciSession`]s from one engine configuration.
#[derive(Debug, Clone)]
pub struct UciSessionFactory {
    config: EngineConfig,
}

impl UciSessionFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for UciSessionFactory {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn launch(&self) -> Result<Box<dyn EngineSession>, SessionError> {
        let mut session = UciSession::new(self.config.clone());
        session.start().await?;
        Ok(Box::new(session))
    }
}
