//! Evaluation scores and their normalization.
//!
//! Engines report scores relative to the side to move; reports compare
//! engines, so every score is turned into White's point of view at a single
//! boundary ([`normalize`]) and never re-derived downstream.

use cozy_chess::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A centipawn score or a forced mate distance.
///
/// For mates the sign says who delivers it: positive means the side whose
/// point of view the value is in mates, the magnitude is the distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Evaluation {
    Centipawns(i32),
    Mate(i32),
}

impl Evaluation {
    /// Neutral value used by presentation code when an engine reported nothing.
    pub const ZERO: Evaluation = Evaluation::Centipawns(0);

    /// Same value seen from the other side.
    ///
    /// Saturates, so `i32::MIN` does not round-trip. Scores parsed from
    /// engine output never reach it.
    pub fn flip(self) -> Self {
        match self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(cp.saturating_neg()),
            Evaluation::Mate(n) => Evaluation::Mate(n.saturating_neg()),
        }
    }

    pub fn is_mate(self) -> bool {
        matches!(self, Evaluation::Mate(_))
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => write!(f, "{cp:+}"),
            Evaluation::Mate(n) => write!(f, "Mate {n}"),
        }
    }
}

/// Frame a raw score is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pov {
    /// Positive is good for whoever is to move (what UCI engines send)
    SideToMove,
    /// Positive is good for White
    White,
}

/// A score as reported, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub value: Evaluation,
    pub pov: Pov,
}

impl Score {
    pub fn relative(value: Evaluation) -> Self {
        Self {
            value,
            pov: Pov::SideToMove,
        }
    }

    pub fn absolute(value: Evaluation) -> Self {
        Self {
            value,
            pov: Pov::White,
        }
    }
}

/// Convert a raw score into White's point of view.
///
/// Absent stays absent: callers that need a number for display substitute
/// [`Evaluation::ZERO`] themselves.
pub fn normalize(raw: Option<Score>, side_to_move: Color) -> Option<Evaluation> {
    let score = raw?;
    let value = match (score.pov, side_to_move) {
        (Pov::SideToMove, Color::Black) => score.value.flip(),
        _ => score.value,
    };
    Some(value)
}

/// Render an optional evaluation, falling back to the neutral value.
pub fn display_or_zero(eval: Option<Evaluation>) -> String {
    eval.unwrap_or(Evaluation::ZERO).to_string()
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod eval_tests;
