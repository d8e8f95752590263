use cozy_chess::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::eval::{Evaluation, Score};

/// Lifecycle of an engine session.
///
/// `Failed` and `Stopped` are terminal: a handle in either state never talks
/// to its process again, the owner has to launch a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unstarted,
    Starting,
    Ready,
    Busy,
    Failed,
    Stopped,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Failed | SessionState::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unstarted => "unstarted",
            SessionState::Starting => "starting",
            SessionState::Ready => "ready",
            SessionState::Busy => "busy",
            SessionState::Failed => "failed",
            SessionState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Serializable side to move (`cozy_chess::Color` has no serde support).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    White,
    Black,
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => f.write_str("white"),
            Side::Black => f.write_str("black"),
        }
    }
}

/// Result of one `submit` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Move token exactly as the engine sent it (UCI long algebraic)
    pub best_move: String,
    /// Last score the engine reported for its main line, if any
    pub score: Option<Score>,
    /// Depth of the last reported iteration
    pub depth: Option<u32>,
    /// Nodes searched, if reported
    pub nodes: Option<u64>,
    /// Wall-clock time between sending `go` and receiving `bestmove`
    pub elapsed: Duration,
}

impl Reply {
    pub fn new(best_move: impl Into<String>) -> Self {
        Self {
            best_move: best_move.into(),
            score: None,
            depth: None,
            nodes: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_score(mut self, score: Score) -> Self {
        self.score = Some(score);
        self
    }
}

/// One row of a match log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// 1-based half-move counter within the match
    pub ply: u32,
    /// Full-move number of the position the move was played in
    pub fullmove: u16,
    pub side: Side,
    pub mv: String,
    /// Mover's own evaluation of the position it moved from
    pub mover_eval: Option<Evaluation>,
    /// Reference engine's evaluation of the position after the move
    pub reference_eval: Option<Evaluation>,
    pub elapsed_ms: u64,
}
