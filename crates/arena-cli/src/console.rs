//! Live console output for runs.

use arena_core::{MatchRecord, SuiteFormatError};
use arena_runner::{BatchResult, CaseOutcome, MatchReport, ReportSink};
use std::io::Write;
use tracing::warn;

use crate::results::{case_line, match_summary, suite_summary, table_header, table_row};

/// Prints outcomes as they arrive. Logging goes to stderr, so this owns stdout.
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    table_started: bool,
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            table_started: false,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            warn!(error = %e, "cannot write to console");
        }
    }
}

impl<W: Write + Send> ReportSink for ConsoleSink<W> {
    fn suite_error(&mut self, error: &SuiteFormatError) {
        self.line(&format!("Skipping line {}: {}", error.line, error.reason));
    }

    fn case(&mut self, outcome: &CaseOutcome) {
        self.line(&case_line(&outcome.id, outcome.kind, &outcome.detail));
    }

    fn batch_summary(&mut self, result: &BatchResult) {
        self.line(&suite_summary(result));
    }

    fn ply(&mut self, record: &MatchRecord) {
        if !self.table_started {
            self.table_started = true;
            self.line(&table_header());
        }
        self.line(&table_row(record));
    }

    fn match_summary(&mut self, report: &MatchReport) {
        self.line(&match_summary(report));
        self.table_started = false;
    }
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod console_tests;
