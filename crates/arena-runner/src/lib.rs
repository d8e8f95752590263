//! Engine runner for the arena
//!
//! This crate drives external engines:
//! - [`UciSession`]: one UCI engine process behind a request/response API
//! - [`BatchRunner`]: runs an EPD suite and scores best-move hits
//! - [`MatchRunner`]: plays two engines against each other while a reference
//!   engine evaluates every position
//!
//! Sessions are owned by exactly one caller and never restarted implicitly.

pub mod batch;
pub mod match_runner;
pub mod report;
pub mod session;
pub mod uci;

pub use batch::*;
pub use match_runner::*;
pub use report::*;
pub use session::*;
