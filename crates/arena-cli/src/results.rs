//! Run results storage and reporting

use anyhow::{Context, Result};
use arena_core::{display_or_zero, MatchRecord, Side};
use arena_runner::{BatchResult, MatchReport, OutcomeKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

const RULE: &str = "------------------------------------------------";

/// Anything `arena` can write with `--json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunReport {
    Suite(BatchResult),
    Match(MatchReport),
}

impl RunReport {
    /// Save results to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("cannot serialize report")?;
        std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))
    }

    /// Load results from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("cannot parse {}", path.display()))
    }

    /// Generate a text report
    pub fn generate_report(&self) -> String {
        match self {
            RunReport::Suite(result) => suite_report(result),
            RunReport::Match(report) => match_report(report),
        }
    }
}

/// One console line per case, in the classic EPD-runner wording.
pub fn case_line(id: &str, kind: OutcomeKind, detail: &str) -> String {
    match kind {
        OutcomeKind::Pass => format!("[PASS] {id}: {detail}"),
        OutcomeKind::Fail => format!("[FAIL] {id}: {detail}"),
        OutcomeKind::Skipped => format!("Skipping {id}: {detail}"),
    }
}

pub fn suite_summary(result: &BatchResult) -> String {
    let mut out = String::new();
    if let Some(reason) = &result.halted {
        out.push_str(&format!("\nHalted: {reason}\n"));
        for case in &result.unattempted {
            out.push_str(&format!("Not attempted: {}\n", case.id));
        }
    }
    out.push_str(&format!("\n{RULE}\n"));
    out.push_str(&format!("Final Score: {}/{}\n", result.solved, result.total));
    out.push_str(RULE);
    out
}

fn suite_report(result: &BatchResult) -> String {
    let mut out = format!(
        "=== Suite run {} ===\nEngine: {}\nLimit: {}\nStarted: {}\n\n",
        result.run_id,
        result.engine,
        result.limit,
        result.started_at.to_rfc3339()
    );
    for outcome in &result.details {
        out.push_str(&case_line(&outcome.id, outcome.kind, &outcome.detail));
        out.push('\n');
    }
    out.push_str(&suite_summary(result));
    out
}

pub fn table_header() -> String {
    format!(
        "{:<12} | {:<10} | {:<10} | {:<10}\n{}",
        "Move",
        "White eval",
        "Black eval",
        "Reference",
        "-".repeat(50)
    )
}

/// The mover's evaluation goes in its own column; a missing one shows as 0.
pub fn table_row(record: &MatchRecord) -> String {
    let label = match record.side {
        Side::White => format!("{}. {}", record.fullmove, record.mv),
        Side::Black => format!("{}... {}", record.fullmove, record.mv),
    };
    let mover = display_or_zero(record.mover_eval);
    let (white, black) = match record.side {
        Side::White => (mover, String::new()),
        Side::Black => (String::new(), mover),
    };
    let reference = record
        .reference_eval
        .map(|e| e.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{label:<12} | {white:<10} | {black:<10} | {reference}")
}

pub fn match_summary(report: &MatchReport) -> String {
    format!(
        "\n{RULE}\nResult: {} ({})\nFinal position: {}\n{RULE}",
        report.outcome, report.termination, report.final_fen
    )
}

fn match_report(report: &MatchReport) -> String {
    let mut out = format!(
        "=== Match {} ===\nWhite: {}\nBlack: {}\nReference: {}\nLimit: {}\nStart: {}\n\n",
        report.run_id,
        report.white,
        report.black,
        report.reference.as_deref().unwrap_or("-"),
        report.limit,
        report.start_fen
    );
    out.push_str(&table_header());
    out.push('\n');
    for record in &report.records {
        out.push_str(&table_row(record));
        out.push('\n');
    }
    out.push_str(&match_summary(report));
    out
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod results_tests;
