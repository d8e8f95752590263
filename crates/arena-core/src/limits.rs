//! Search limits handed to engines.
//!
//! A limit carries exactly one discriminator per request. Engines interpret it
//! with their own search loop; the harness only needs it to build the `go`
//! command and to work out how long to wait for the reply.

use std::fmt;
use std::time::Duration;

/// Budget for a single search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    /// Fixed thinking time per move
    Time(Duration),
    /// Fixed search depth in plies
    Depth(u32),
}

impl SearchLimit {
    /// Create a time limit.
    pub fn time(move_time: Duration) -> Self {
        SearchLimit::Time(move_time)
    }

    /// Create a time limit from fractional seconds, as given on the command line.
    ///
    /// Returns `None` for negative, zero or non-finite values.
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        if !secs.is_finite() || secs <= 0.0 {
            return None;
        }
        Some(SearchLimit::Time(Duration::from_secs_f64(secs)))
    }

    /// Create a depth limit.
    pub fn depth(depth: u32) -> Self {
        SearchLimit::Depth(depth)
    }

    /// Wall-clock budget implied by the limit (None for depth limits).
    pub fn budget(&self) -> Option<Duration> {
        match self {
            SearchLimit::Time(t) => Some(*t),
            SearchLimit::Depth(_) => None,
        }
    }

    /// How long a caller should wait for the reply before giving up.
    ///
    /// Depth limits have no budget of their own, so `depth_budget` stands in.
    pub fn deadline(&self, depth_budget: Duration, grace: Duration) -> Duration {
        self.budget().unwrap_or(depth_budget) + grace
    }
}

impl Default for SearchLimit {
    fn default() -> Self {
        SearchLimit::Time(Duration::from_secs(1))
    }
}

impl fmt::Display for SearchLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchLimit::Time(t) => write!(f, "{}ms/move", t.as_millis()),
            SearchLimit::Depth(d) => write!(f, "depth {d}"),
        }
    }
}

#[cfg(test)]
#[path = "limits_tests.rs"]
mod limits_tests;
