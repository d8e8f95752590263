//! EPD test suites.
//!
//! One entry per line: the first four FEN fields, then `;`-terminated
//! operations such as `bm Qd1+;` and `id "BK.01";`. Entries without a `bm`
//! operation are kept but have no expected moves, which makes them skipped
//! rather than failed.

use cozy_chess::Move;

use crate::error::SuiteFormatError;
use crate::position::Position;

/// One labelled test position.
#[derive(Debug, Clone)]
pub struct SuiteCase {
    /// `id` operand, or `#<n>` with `n` the 1-based entry number
    pub id: String,
    pub position: Position,
    /// Resolved `bm` moves; empty means "skip, not a failure"
    pub expected_moves: Vec<Move>,
    /// `bm` operands as written, for reports
    pub expected_tokens: Vec<String>,
}

impl SuiteCase {
    /// A case with no expected moves is excluded from scoring.
    pub fn is_scored(&self) -> bool {
        !self.expected_moves.is_empty()
    }

    /// Does `token` (UCI or SAN) name one of the expected moves?
    ///
    /// Errors if the token is not a legal move in the case position.
    pub fn accepts(&self, token: &str) -> Result<bool, crate::error::MoveError> {
        let mv = self.position.parse_move(token)?;
        Ok(self.expected_moves.contains(&mv))
    }

    pub fn expected_display(&self) -> String {
        self.expected_tokens.join(", ")
    }
}

/// Parsed suite: usable cases plus the entries that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct SuiteParse {
    pub cases: Vec<SuiteCase>,
    pub errors: Vec<SuiteFormatError>,
}

/// Parse a whole EPD file. Blank lines are ignored; bad entries are collected
/// in `errors` and the rest of the suite is still returned.
pub fn parse_suite(source: &str) -> SuiteParse {
    let mut parse = SuiteParse::default();
    let mut entry = 0;

    for (line_idx, line) in source.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        entry += 1;
        match parse_epd_line(line, entry) {
            Ok(case) => parse.cases.push(case),
            Err(reason) => parse.errors.push(SuiteFormatError {
                line: line_idx + 1,
                reason,
            }),
        }
    }

    parse
}

/// Parse one EPD record. `entry` is used for the default id.
pub fn parse_epd_line(line: &str, entry: usize) -> Result<SuiteCase, String> {
    let mut rest = line.trim();
    let mut board_fields = Vec::with_capacity(4);
    while board_fields.len() < 4 && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let mut field = &rest[..end];
        // `... w - -;` closes an empty operation list
        if board_fields.len() == 3 {
            field = field.strip_suffix(';').unwrap_or(field);
        }
        board_fields.push(field);
        rest = rest[end..].trim_start();
    }
    if board_fields.len() < 4 {
        return Err(format!("expected 4 position fields, found {}", board_fields.len()));
    }
    let ops_text = rest;

    let mut id = None;
    let mut bm: Vec<String> = Vec::new();
    let mut halfmove = 0u32;
    let mut fullmove = 1u32;

    for op in split_operations(ops_text) {
        let mut tokens = split_operands(&op).into_iter();
        let Some(opcode) = tokens.next() else { continue };
        let operands: Vec<String> = tokens.collect();
        match opcode.as_str() {
            "id" => id = operands.into_iter().next(),
            "bm" => bm.extend(operands),
            "hmvc" => halfmove = parse_counter(&opcode, &operands)?,
            "fmvn" => fullmove = parse_counter(&opcode, &operands)?,
            _ => {}
        }
    }

    let fen = format!("{} {halfmove} {fullmove}", board_fields.join(" "));
    let position = Position::from_fen(&fen).map_err(|e| e.to_string())?;

    let expected_moves = bm
        .iter()
        .map(|token| {
            position
                .parse_move(token)
                .map_err(|e| format!("bm operand: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SuiteCase {
        id: id.unwrap_or_else(|| format!("#{entry}")),
        position,
        expected_moves,
        expected_tokens: bm,
    })
}

fn parse_counter(opcode: &str, operands: &[String]) -> Result<u32, String> {
    operands
        .first()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| format!("{opcode} needs a numeric operand"))
}

/// Split on `;` outside of double quotes.
fn split_operations(text: &str) -> Vec<String> {
    let mut ops = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in text.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ';' if !quoted => {
                if !current.trim().is_empty() {
                    ops.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        ops.push(current.trim().to_string());
    }
    ops
}

/// Split on whitespace outside of double quotes, dropping the quotes.
fn split_operands(op: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in op.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
#[path = "suite_tests.rs"]
mod suite_tests;
