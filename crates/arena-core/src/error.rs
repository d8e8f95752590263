//! Error taxonomy shared by sessions, runners and the CLI.

use std::time::Duration;
use thiserror::Error;

use crate::types::SessionState;

/// Failures of a single engine session.
///
/// Every variant names the engine so reports can say which process misbehaved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The executable could not be spawned or the handshake never completed.
    #[error("{engine}: failed to launch: {reason}")]
    Launch { engine: String, reason: String },

    /// No reply arrived within the request budget plus grace.
    #[error("{engine}: no reply within {}ms", budget.as_millis())]
    Timeout { engine: String, budget: Duration },

    /// The engine replied with something we could not use, or went away.
    #[error("{engine}: protocol error: {detail}")]
    Protocol { engine: String, detail: String },

    /// The handle is failed or stopped and will not talk to the process again.
    #[error("{engine}: session is {state}, not accepting requests")]
    Unavailable { engine: String, state: SessionState },
}

impl SessionError {
    pub fn engine(&self) -> &str {
        match self {
            SessionError::Launch { engine, .. }
            | SessionError::Timeout { engine, .. }
            | SessionError::Protocol { engine, .. }
            | SessionError::Unavailable { engine, .. } => engine,
        }
    }
}

/// Errors from resolving a move token against a position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("malformed move `{0}`")]
    Malformed(String),
    #[error("illegal move `{0}`")]
    Illegal(String),
    #[error("ambiguous move `{0}`")]
    Ambiguous(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid FEN `{fen}`")]
pub struct FenError {
    pub fen: String,
}

/// A suite entry that could not be turned into a test case.
///
/// The entry is skipped; the rest of the suite still runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("suite line {line}: {reason}")]
pub struct SuiteFormatError {
    pub line: usize,
    pub reason: String,
}

/// Errors that abort a whole run (a suite or a match).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{source} (position {fen})")]
    SessionAt {
        #[source]
        source: SessionError,
        fen: String,
    },

    #[error("{engine} played illegal move `{mv}` in position {fen}")]
    IllegalMove {
        engine: String,
        mv: String,
        fen: String,
    },

    #[error(transparent)]
    Fen(#[from] FenError),
}

impl ArenaError {
    pub fn session_at(source: SessionError, fen: impl Into<String>) -> Self {
        ArenaError::SessionAt {
            source,
            fen: fen.into(),
        }
    }
}
