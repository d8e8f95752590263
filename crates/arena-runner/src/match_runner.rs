//! Match runner for playing one engine against another
//!
//! Every ply the engine to move searches under the match limit. When a
//! reference engine is seated it evaluates each new non-terminal position at
//! a fixed depth, so both movers' opinions can be compared against it. All
//! evaluations in the records are from White's point of view.

use arena_core::{
    normalize, ArenaError, Color, GameStatus, MatchRecord, Position, SearchLimit, SessionError,
    Side,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::report::ReportSink;
use crate::session::EngineSession;

/// Configuration for a match
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Limit for both movers
    pub limit: SearchLimit,
    /// Depth the reference engine searches every position to
    pub reference_depth: u32,
    /// Stop (unfinished) after this many half-moves
    pub max_plies: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            limit: SearchLimit::default(),
            reference_depth: 18,
            max_plies: 400,
        }
    }
}

/// The two movers, by colour.
pub struct Seats<'a> {
    pub white: &'a mut dyn EngineSession,
    pub black: &'a mut dyn EngineSession,
}

impl<'a> Seats<'a> {
    pub fn for_side(&mut self, side: Color) -> &mut (dyn EngineSession + 'a) {
        match side {
            Color::White => &mut *self.white,
            Color::Black => &mut *self.black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    WhiteWins,
    BlackWins,
    Draw,
    /// Ply limit reached, or the match was aborted
    Unfinished,
}

impl MatchOutcome {
    fn from_status(status: GameStatus) -> Self {
        match status {
            GameStatus::Checkmate { winner: Side::White } => MatchOutcome::WhiteWins,
            GameStatus::Checkmate { winner: Side::Black } => MatchOutcome::BlackWins,
            GameStatus::Ongoing => MatchOutcome::Unfinished,
            _ => MatchOutcome::Draw,
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOutcome::WhiteWins => f.write_str("1-0"),
            MatchOutcome::BlackWins => f.write_str("0-1"),
            MatchOutcome::Draw => f.write_str("1/2-1/2"),
            MatchOutcome::Unfinished => f.write_str("*"),
        }
    }
}

/// Full log of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub white: String,
    pub black: String,
    pub reference: Option<String>,
    pub limit: String,
    pub start_fen: String,
    pub records: Vec<MatchRecord>,
    pub outcome: MatchOutcome,
    /// Human readable reason the match ended
    pub termination: String,
    pub final_fen: String,
}

impl MatchReport {
    /// Empty report for a match that is about to start.
    pub fn new(
        white: &str,
        black: &str,
        reference: Option<&str>,
        limit: &SearchLimit,
        start: &Position,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            white: white.to_string(),
            black: black.to_string(),
            reference: reference.map(str::to_string),
            limit: limit.to_string(),
            start_fen: start.fen(),
            records: Vec::new(),
            outcome: MatchOutcome::Unfinished,
            termination: String::new(),
            final_fen: start.fen(),
        }
    }

    pub fn plies(&self) -> usize {
        self.records.len()
    }
}

/// A match that could not be played to the end.
///
/// Carries everything recorded up to the failure.
#[derive(Debug, Error)]
#[error("match aborted after {} plies: {error}", .report.records.len())]
pub struct MatchAborted {
    #[source]
    pub error: ArenaError,
    pub report: Box<MatchReport>,
}

fn abort(mut report: MatchReport, position: &Position, error: ArenaError) -> MatchAborted {
    warn!(error = %error, plies = report.records.len(), "match aborted");
    report.outcome = MatchOutcome::Unfinished;
    report.termination = format!("aborted: {error}");
    report.final_fen = position.fen();
    MatchAborted {
        error,
        report: Box::new(report),
    }
}

/// Runs matches between two engines
pub struct MatchRunner {
    config: MatchConfig,
}

impl MatchRunner {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Play one game from `initial` until it ends or the ply limit is hit.
    ///
    /// Sessions are expected to be started and are left running; a session
    /// failure or an illegal move aborts the match with the partial report.
    pub async fn run_match(
        &self,
        initial: Position,
        mut seats: Seats<'_>,
        mut reference: Option<&mut dyn EngineSession>,
        sink: &mut dyn ReportSink,
    ) -> Result<MatchReport, MatchAborted> {
        let mut report = MatchReport::new(
            seats.white.name(),
            seats.black.name(),
            reference.as_deref().map(|r| r.name()),
            &self.config.limit,
            &initial,
        );
        info!(
            white = %report.white,
            black = %report.black,
            reference = report.reference.as_deref().unwrap_or("-"),
            limit = %report.limit,
            "starting match"
        );

        let mut position = initial;
        let prepared = async {
            seats.white.new_game().await?;
            seats.black.new_game().await?;
            if let Some(reference) = reference.as_deref_mut() {
                reference.new_game().await?;
            }
            Ok::<(), SessionError>(())
        }
        .await;
        if let Err(e) = prepared {
            let fen = position.fen();
            return Err(abort(report, &position, ArenaError::session_at(e, fen)));
        }

        let reference_limit = SearchLimit::depth(self.config.reference_depth);
        let mut ply = 0u32;

        let status = loop {
            let status = position.status();
            if status.is_terminal() {
                break status;
            }
            if ply >= self.config.max_plies {
                break GameStatus::Ongoing;
            }

            let side = position.side_to_move();
            let mover = seats.for_side(side);
            let reply = match mover.submit(&position, &self.config.limit).await {
                Ok(reply) => reply,
                Err(e) => {
                    let fen = position.fen();
                    return Err(abort(report, &position, ArenaError::session_at(e, fen)));
                }
            };
            let mover_eval = normalize(reply.score, side);

            let played = position
                .parse_move(&reply.best_move)
                .and_then(|mv| position.play_move(mv).map(|next| (position.move_to_uci(mv), next)));
            let (mv, next) = match played {
                Ok(played) => played,
                Err(_) => {
                    let error = ArenaError::IllegalMove {
                        engine: mover.name().to_string(),
                        mv: reply.best_move,
                        fen: position.fen(),
                    };
                    return Err(abort(report, &position, error));
                }
            };

            let mut reference_eval = None;
            if let Some(reference) = reference.as_deref_mut() {
                if !next.is_terminal() {
                    match reference.submit(&next, &reference_limit).await {
                        Ok(eval) => reference_eval = normalize(eval.score, next.side_to_move()),
                        Err(e) => {
                            let fen = next.fen();
                            return Err(abort(report, &next, ArenaError::session_at(e, fen)));
                        }
                    }
                }
            }

            ply += 1;
            let record = MatchRecord {
                ply,
                fullmove: position.fullmove_number(),
                side: side.into(),
                mv,
                mover_eval,
                reference_eval,
                elapsed_ms: u64::try_from(reply.elapsed.as_millis()).unwrap_or(u64::MAX),
            };
            debug!(
                ply,
                side = %record.side,
                mv = %record.mv,
                mover_eval = ?record.mover_eval,
                reference_eval = ?record.reference_eval,
                "ply played"
            );
            sink.ply(&record);
            report.records.push(record);
            position = next;
        };

        report.outcome = MatchOutcome::from_status(status);
        report.termination = match status {
            GameStatus::Ongoing => format!("ply limit ({}) reached", self.config.max_plies),
            other => other.to_string(),
        };
        report.final_fen = position.fen();
        info!(
            outcome = %report.outcome,
            termination = %report.termination,
            plies = report.records.len(),
            "match finished"
        );
        Ok(report)
    }
}
