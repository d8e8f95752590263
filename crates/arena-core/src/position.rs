//! Position adapter over `cozy-chess`.
//!
//! The harness treats positions as opaque snapshots: it asks whose turn it is,
//! whether the game is over, and asks for a successor after a move. The
//! position also remembers the hashes of the positions that led to it so
//! repetitions can be detected.

use cozy_chess::{Board, Color, Move, Piece};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FenError, MoveError};
use crate::notation;
use crate::types::Side;

/// Standard starting position.
pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Why a game is (or is not) over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Ongoing,
    Checkmate { winner: Side },
    Stalemate,
    FiftyMoveRule,
    Repetition,
    InsufficientMaterial,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        self != GameStatus::Ongoing
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Ongoing => f.write_str("ongoing"),
            GameStatus::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            GameStatus::Stalemate => f.write_str("stalemate"),
            GameStatus::FiftyMoveRule => f.write_str("fifty-move rule"),
            GameStatus::Repetition => f.write_str("threefold repetition"),
            GameStatus::InsufficientMaterial => f.write_str("insufficient material"),
        }
    }
}

/// Game state snapshot handed to engines.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
    /// Hashes of every position in this line, current one last
    history: Vec<u64>,
}

impl Position {
    pub fn startpos() -> Self {
        Self::from_board(Board::default())
    }

    /// Parse a FEN. The move counters may be omitted (EPD style).
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fen = fen.trim();
        let fields = fen.split_whitespace().count();
        let full = match fields {
            4 => format!("{fen} 0 1"),
            5 => format!("{fen} 1"),
            _ => fen.to_string(),
        };
        Board::from_fen(&full, false)
            .map(Self::from_board)
            .map_err(|_| FenError {
                fen: fen.to_string(),
            })
    }

    fn from_board(board: Board) -> Self {
        let history = vec![board.hash()];
        Self { board, history }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn fullmove_number(&self) -> u16 {
        self.board.fullmove_number()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        notation::legal_moves(&self.board)
    }

    /// Resolve a UCI or SAN token to a legal move in this position.
    pub fn parse_move(&self, token: &str) -> Result<Move, MoveError> {
        notation::parse_move(&self.board, token)
    }

    /// Standard UCI text for a move in this position.
    pub fn move_to_uci(&self, mv: Move) -> String {
        notation::move_to_uci(&self.board, mv)
    }

    /// Successor position after a legal move.
    pub fn play_move(&self, mv: Move) -> Result<Position, MoveError> {
        if !self.board.is_legal(mv) {
            return Err(MoveError::Illegal(mv.to_string()));
        }
        let mut board = self.board.clone();
        board.play_unchecked(mv);
        let mut history = self.history.clone();
        history.push(board.hash());
        Ok(Self { board, history })
    }

    /// Successor position after a move given as text.
    pub fn play(&self, token: &str) -> Result<Position, MoveError> {
        let mv = self.parse_move(token)?;
        self.play_move(mv)
    }

    pub fn status(&self) -> GameStatus {
        let has_moves = self.board.generate_moves(|_| true);
        if !has_moves {
            if self.board.checkers().is_empty() {
                return GameStatus::Stalemate;
            }
            return GameStatus::Checkmate {
                winner: Side::from(!self.board.side_to_move()),
            };
        }
        if self.board.halfmove_clock() >= 100 {
            return GameStatus::FiftyMoveRule;
        }
        if self.repetitions() >= 3 {
            return GameStatus::Repetition;
        }
        if self.insufficient_material() {
            return GameStatus::InsufficientMaterial;
        }
        GameStatus::Ongoing
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// How many times the current position has occurred in this line.
    pub fn repetitions(&self) -> usize {
        let current = self.board.hash();
        self.history.iter().filter(|&&h| h == current).count()
    }

    /// Bare kings, or kings plus a single minor piece.
    fn insufficient_material(&self) -> bool {
        let board = &self.board;
        let kings = board.pieces(Piece::King);
        let minors = board.pieces(Piece::Knight) | board.pieces(Piece::Bishop);
        let others = board.occupied() ^ kings;
        others.is_empty() || (others.len() == 1 && (others & minors) == others)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.board == other.board
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)
    }
}

#[cfg(test)]
#[path = "position_tests.rs"]
mod position_tests;
