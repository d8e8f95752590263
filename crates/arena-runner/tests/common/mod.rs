//! In-memory engine sessions driven by a script.
#![allow(dead_code)]

use arena_core::{Position, Reply, SearchLimit, SessionError, SessionState};
use arena_runner::{EngineSession, SessionFactory};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted engine does with one request.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(Reply),
    Timeout,
    Protocol(&'static str),
}

pub fn play(mv: &str) -> Step {
    Step::Reply(Reply::new(mv))
}

type Script = Box<dyn FnMut(&Position, &SearchLimit) -> Step + Send>;

/// Session whose replies come from a closure; starts out `Ready`.
pub struct ScriptedSession {
    name: String,
    state: SessionState,
    script: Script,
    /// FEN of every position submitted, in order
    pub seen: Arc<Mutex<Vec<String>>>,
    pub new_games: usize,
}

impl ScriptedSession {
    pub fn new(
        name: &str,
        script: impl FnMut(&Position, &SearchLimit) -> Step + Send + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            state: SessionState::Ready,
            script: Box::new(script),
            seen: Arc::new(Mutex::new(Vec::new())),
            new_games: 0,
        }
    }

    /// Plays the given moves in order, then times out.
    pub fn sequence(name: &str, steps: Vec<Step>) -> Self {
        let mut steps = steps.into_iter();
        Self::new(name, move |_, _| steps.next().unwrap_or(Step::Timeout))
    }

    pub fn submitted(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn unavailable(&self) -> SessionError {
        SessionError::Unavailable {
            engine: self.name.clone(),
            state: self.state,
        }
    }
}

#[async_trait]
impl EngineSession for ScriptedSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> SessionState {
        self.state
    }

    async fn start(&mut self) -> Result<(), SessionError> {
        Err(self.unavailable())
    }

    async fn new_game(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Ready {
            return Err(self.unavailable());
        }
        self.new_games += 1;
        Ok(())
    }

    async fn submit(
        &mut self,
        position: &Position,
        limit: &SearchLimit,
    ) -> Result<Reply, SessionError> {
        if self.state != SessionState::Ready {
            return Err(self.unavailable());
        }
        self.seen.lock().unwrap().push(position.fen());
        match (self.script)(position, limit) {
            Step::Reply(mut reply) => {
                reply.elapsed = Duration::from_millis(5);
                Ok(reply)
            }
            Step::Timeout => {
                self.state = SessionState::Failed;
                Err(SessionError::Timeout {
                    engine: self.name.clone(),
                    budget: limit.deadline(Duration::from_secs(120), Duration::from_secs(1)),
                })
            }
            Step::Protocol(detail) => {
                self.state = SessionState::Failed;
                Err(SessionError::Protocol {
                    engine: self.name.clone(),
                    detail: detail.to_string(),
                })
            }
        }
    }

    async fn stop(&mut self) {
        self.state = SessionState::Stopped;
    }
}

type Builder = Box<dyn Fn(usize) -> Result<ScriptedSession, SessionError> + Send + Sync>;

/// Factory handing out scripted sessions; the builder gets the launch number.
pub struct ScriptedFactory {
    name: String,
    build: Builder,
    launches: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(
        name: &str,
        build: impl Fn(usize) -> Result<ScriptedSession, SessionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            build: Box::new(build),
            launches: AtomicUsize::new(0),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn launch(&self) -> Result<Box<dyn EngineSession>, SessionError> {
        let n = self.launches.fetch_add(1, Ordering::SeqCst);
        let session = (self.build)(n)?;
        Ok(Box::new(session))
    }
}
