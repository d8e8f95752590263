//! The slice of the UCI protocol the harness needs.
//!
//! Outgoing commands are plain strings; incoming lines are classified into
//! [`EngineLine`] without ever failing. Anything unrecognised is `Other`.

use arena_core::{Evaluation, Position, Score, SearchLimit};

pub fn position_command(position: &Position) -> String {
    format!("position fen {}", position.fen())
}

pub fn go_command(limit: &SearchLimit) -> String {
    match limit {
        SearchLimit::Time(t) => format!("go movetime {}", t.as_millis().max(1)),
        SearchLimit::Depth(d) => format!("go depth {d}"),
    }
}

pub fn setoption_command(name: &str, value: &str) -> String {
    format!("setoption name {name} value {value}")
}

/// Bound qualifier of a reported score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

/// Fields of an `info` line the harness cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub bound: Option<Bound>,
}

impl InfoLine {
    /// Lines for secondary principal variations do not describe the chosen move.
    pub fn is_primary(&self) -> bool {
        self.multipv.map_or(true, |n| n <= 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineLine {
    Id { name: String },
    Option { name: String },
    UciOk,
    ReadyOk,
    Info(InfoLine),
    /// `None` when the engine had no move (`(none)`, `0000`, or nothing at all)
    BestMove { mv: Option<String> },
    Other,
}

pub fn parse_line(line: &str) -> EngineLine {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("id") => match tokens.next() {
            Some("name") => EngineLine::Id {
                name: tokens.collect::<Vec<_>>().join(" "),
            },
            _ => EngineLine::Other,
        },
        Some("option") => parse_option(tokens),
        Some("uciok") => EngineLine::UciOk,
        Some("readyok") => EngineLine::ReadyOk,
        Some("info") => EngineLine::Info(parse_info(tokens)),
        Some("bestmove") => {
            let mv = tokens
                .next()
                .filter(|t| *t != "(none)" && *t != "0000")
                .map(str::to_string);
            EngineLine::BestMove { mv }
        }
        _ => EngineLine::Other,
    }
}

fn parse_option<'a>(mut tokens: impl Iterator<Item = &'a str>) -> EngineLine {
    if tokens.next() != Some("name") {
        return EngineLine::Other;
    }
    let name: Vec<&str> = tokens.take_while(|t| *t != "type").collect();
    if name.is_empty() {
        return EngineLine::Other;
    }
    EngineLine::Option {
        name: name.join(" "),
    }
}

fn parse_info<'a>(mut tokens: impl Iterator<Item = &'a str>) -> InfoLine {
    let mut info = InfoLine::default();
    while let Some(token) = tokens.next() {
        match token {
            "depth" => info.depth = tokens.next().and_then(|v| v.parse().ok()),
            "nodes" => info.nodes = tokens.next().and_then(|v| v.parse().ok()),
            "multipv" => info.multipv = tokens.next().and_then(|v| v.parse().ok()),
            "score" => {
                let kind = tokens.next();
                // Clamped so that negating a score can never overflow
                let value = tokens
                    .next()
                    .and_then(|v| v.parse::<i32>().ok())
                    .map(|v| v.max(-i32::MAX));
                info.score = match (kind, value) {
                    (Some("cp"), Some(cp)) => Some(Score::relative(Evaluation::Centipawns(cp))),
                    (Some("mate"), Some(n)) => Some(Score::relative(Evaluation::Mate(n))),
                    _ => None,
                };
            }
            "lowerbound" => info.bound = Some(Bound::Lower),
            "upperbound" => info.bound = Some(Bound::Upper),
            // Everything after these is free text or a move list
            "pv" | "string" | "refutation" | "currline" => break,
            _ => {}
        }
    }
    info
}

#[cfg(test)]
#[path = "uci_tests.rs"]
mod uci_tests;
