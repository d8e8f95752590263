//! Core types for the engine arena
//!
//! This crate provides the pieces shared by every workload:
//! - Search limits and the engine reply shape
//! - Evaluation scores and their normalization to White's point of view
//! - A thin position adapter over `cozy-chess` (move tokens, game status)
//! - EPD test suite parsing
//!
//! Nothing in here talks to an engine process; see `arena-runner` for that.

pub mod error;
pub mod eval;
pub mod limits;
pub mod notation;
pub mod position;
pub mod suite;
pub mod types;

pub use error::*;
pub use eval::*;
pub use limits::*;
pub use position::*;
pub use suite::*;
pub use types::*;

pub use cozy_chess::{Color, Move};
