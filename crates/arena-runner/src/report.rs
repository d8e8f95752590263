//! Where runners send their outcomes as they are produced.

use arena_core::{MatchRecord, SuiteFormatError};

use crate::batch::{BatchResult, CaseOutcome};
use crate::match_runner::MatchReport;

/// Consumer of run events.
///
/// Batch outcomes arrive in suite order and match records in ply order, even
/// when the batch ran on several workers. Runners only emit per-item events;
/// the summaries are sent by the caller once it is done resuming or retrying.
pub trait ReportSink: Send {
    fn suite_error(&mut self, _error: &SuiteFormatError) {}

    fn case(&mut self, _outcome: &CaseOutcome) {}

    fn batch_summary(&mut self, _result: &BatchResult) {}

    fn ply(&mut self, _record: &MatchRecord) {}

    fn match_summary(&mut self, _report: &MatchReport) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {}
