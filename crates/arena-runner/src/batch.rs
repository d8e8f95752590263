//! Batch runner for EPD suites
//!
//! Every scored case is searched once and the reply is compared with the
//! case's `bm` moves. Two ways to drive it:
//! - [`BatchRunner::run_with_session`]: one caller-owned session, sequential.
//!   A session failure halts the run and leaves the rest `unattempted`, the
//!   caller may continue on a fresh session with [`BatchRunner::resume_from`].
//! - [`BatchRunner::run`]: a pool of workers, each owning a session launched
//!   from a [`SessionFactory`]. Outcomes come back in suite order.

use arena_core::{ArenaError, SearchLimit, SessionError, SuiteCase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::report::ReportSink;
use crate::session::{EngineSession, SessionFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Pass,
    Fail,
    Skipped,
}

/// Result of one suite case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    /// 0-based position of the case in the suite
    pub index: usize,
    pub id: String,
    pub kind: OutcomeKind,
    /// Move token the engine sent, if it sent one
    pub played: Option<String>,
    pub expected: Vec<String>,
    pub detail: String,
    pub elapsed_ms: u64,
}

impl CaseOutcome {
    fn new(index: usize, case: &SuiteCase) -> Self {
        Self {
            index,
            id: case.id.clone(),
            kind: OutcomeKind::Skipped,
            played: None,
            expected: case.expected_tokens.clone(),
            detail: String::new(),
            elapsed_ms: 0,
        }
    }

    fn skipped(index: usize, case: &SuiteCase) -> Self {
        let mut outcome = Self::new(index, case);
        outcome.detail = "No best move defined in EPD.".to_string();
        outcome
    }
}

/// A case the run never got to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnattemptedCase {
    pub index: usize,
    pub id: String,
}

/// Aggregate of a suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub engine: String,
    pub limit: String,
    pub solved: usize,
    /// Scored cases that were attempted (skipped and unattempted excluded)
    pub total: usize,
    /// Outcomes in suite order
    pub details: Vec<CaseOutcome>,
    pub unattempted: Vec<UnattemptedCase>,
    /// Why the run stopped early, if it did
    pub halted: Option<String>,
}

impl BatchResult {
    pub fn new(engine: impl Into<String>, limit: &SearchLimit) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            engine: engine.into(),
            limit: limit.to_string(),
            solved: 0,
            total: 0,
            details: Vec::new(),
            unattempted: Vec::new(),
            halted: None,
        }
    }

    /// Fraction of attempted scored cases that passed.
    pub fn score(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.solved as f64 / self.total as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.halted.is_none() && self.unattempted.is_empty()
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.details.iter().filter(|o| o.kind == kind).count()
    }

    fn record(&mut self, outcome: CaseOutcome) {
        match outcome.kind {
            OutcomeKind::Pass => {
                self.solved += 1;
                self.total += 1;
            }
            OutcomeKind::Fail => self.total += 1,
            OutcomeKind::Skipped => {}
        }
        let at = self.details.partition_point(|o| o.index < outcome.index);
        self.details.insert(at, outcome);
    }

    fn leave_unattempted(&mut self, index: usize, case: &SuiteCase) {
        let at = self.unattempted.partition_point(|u| u.index < index);
        self.unattempted.insert(
            at,
            UnattemptedCase {
                index,
                id: case.id.clone(),
            },
        );
    }
}

/// Whether a worker may replace a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// A worker whose session fails retires
    #[default]
    Never,
    /// Up to `n` fresh sessions per worker
    Limit(u32),
}

impl RestartPolicy {
    fn allows(self, used: u32) -> bool {
        match self {
            RestartPolicy::Never => false,
            RestartPolicy::Limit(n) => used < n,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub limit: SearchLimit,
    /// Parallel sessions used by [`BatchRunner::run`]
    pub workers: usize,
    pub restart: RestartPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            limit: SearchLimit::default(),
            workers: 1,
            restart: RestartPolicy::Never,
        }
    }
}

/// Search one case and judge the reply.
///
/// The error is returned alongside the outcome when the session failed; the
/// session is then `Failed` and must not be used again.
async fn judge_case(
    session: &mut dyn EngineSession,
    index: usize,
    case: &SuiteCase,
    limit: &SearchLimit,
) -> (CaseOutcome, Option<SessionError>) {
    if !case.is_scored() {
        return (CaseOutcome::skipped(index, case), None);
    }
    let mut outcome = CaseOutcome::new(index, case);
    outcome.kind = OutcomeKind::Fail;

    let reply = match session.new_game().await {
        Ok(()) => session.submit(&case.position, limit).await,
        Err(e) => Err(e),
    };
    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => {
            outcome.detail = e.to_string();
            return (outcome, Some(e));
        }
    };

    outcome.elapsed_ms = u64::try_from(reply.elapsed.as_millis()).unwrap_or(u64::MAX);
    match case.accepts(&reply.best_move) {
        Ok(true) => {
            outcome.kind = OutcomeKind::Pass;
            outcome.detail = format!("Found {}", reply.best_move);
        }
        Ok(false) => {
            outcome.detail = format!(
                "Engine played {}, expected {}",
                reply.best_move,
                case.expected_display()
            );
        }
        Err(e) => outcome.detail = format!("Engine played {}: {e}", reply.best_move),
    }
    debug!(case = %case.id, kind = ?outcome.kind, mv = %reply.best_move, "case judged");
    outcome.played = Some(reply.best_move);
    (outcome, None)
}

/// Hands outcomes to the sink in suite order, however they arrive.
struct InOrder {
    next: usize,
    pending: BTreeMap<usize, CaseOutcome>,
}

impl InOrder {
    fn new() -> Self {
        Self {
            next: 0,
            pending: BTreeMap::new(),
        }
    }

    fn push(&mut self, outcome: CaseOutcome, sink: &mut dyn ReportSink) {
        self.pending.insert(outcome.index, outcome);
        while let Some(ready) = self.pending.remove(&self.next) {
            sink.case(&ready);
            self.next += 1;
        }
    }

    /// Skip over an index that will never produce an outcome.
    fn skip(&mut self, index: usize, sink: &mut dyn ReportSink) {
        if index == self.next {
            self.next += 1;
            while let Some(ready) = self.pending.remove(&self.next) {
                sink.case(&ready);
                self.next += 1;
            }
        }
    }

    fn flush(&mut self, sink: &mut dyn ReportSink) {
        for (_, outcome) in std::mem::take(&mut self.pending) {
            sink.case(&outcome);
        }
    }
}

type WorkQueue = Arc<Mutex<VecDeque<(usize, SuiteCase)>>>;

/// How a pool worker ended.
struct WorkerExit {
    launched: bool,
    error: Option<SessionError>,
}

async fn run_worker(
    worker: usize,
    factory: Arc<dyn SessionFactory>,
    queue: WorkQueue,
    limit: SearchLimit,
    restart: RestartPolicy,
    results: mpsc::UnboundedSender<CaseOutcome>,
) -> WorkerExit {
    let mut session = match factory.launch().await {
        Ok(session) => session,
        Err(e) => {
            warn!(worker, error = %e, "worker could not launch its engine");
            return WorkerExit {
                launched: false,
                error: Some(e),
            };
        }
    };
    let mut restarts = 0;

    loop {
        let next = queue.lock().await.pop_front();
        let Some((index, case)) = next else { break };

        let (outcome, failure) = judge_case(session.as_mut(), index, &case, &limit).await;
        if results.send(outcome).is_err() {
            break;
        }
        let Some(error) = failure else { continue };

        session.stop().await;
        if !restart.allows(restarts) {
            warn!(worker, error = %error, "session failed, retiring worker");
            return WorkerExit {
                launched: true,
                error: Some(error),
            };
        }
        restarts += 1;
        warn!(worker, restarts, error = %error, "session failed, launching a fresh one");
        session = match factory.launch().await {
            Ok(session) => session,
            Err(e) => {
                warn!(worker, error = %e, "relaunch failed, retiring worker");
                return WorkerExit {
                    launched: true,
                    error: Some(e),
                };
            }
        };
    }

    session.stop().await;
    WorkerExit {
        launched: true,
        error: None,
    }
}

/// Runs suites against one engine
pub struct BatchRunner {
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run `cases` in order on a caller-owned, started session.
    ///
    /// The session is not stopped; it may be `Failed` afterwards, in which
    /// case `halted` says why and `unattempted` lists what is left.
    pub async fn run_with_session(
        &self,
        cases: &[SuiteCase],
        session: &mut dyn EngineSession,
        sink: &mut dyn ReportSink,
    ) -> BatchResult {
        let mut result = BatchResult::new(session.name(), &self.config.limit);
        info!(engine = session.name(), cases = cases.len(), limit = %self.config.limit, "running suite");
        self.drive(&mut result, cases, (0..cases.len()).collect(), session, sink)
            .await;
        result
    }

    /// Continue a halted run on another session, merging into `result`.
    pub async fn resume_from(
        &self,
        result: &mut BatchResult,
        cases: &[SuiteCase],
        session: &mut dyn EngineSession,
        sink: &mut dyn ReportSink,
    ) {
        let pending: Vec<usize> = result.unattempted.drain(..).map(|u| u.index).collect();
        result.halted = None;
        info!(engine = session.name(), remaining = pending.len(), "resuming suite");
        self.drive(result, cases, pending, session, sink).await;
    }

    async fn drive(
        &self,
        result: &mut BatchResult,
        cases: &[SuiteCase],
        pending: Vec<usize>,
        session: &mut dyn EngineSession,
        sink: &mut dyn ReportSink,
    ) {
        let mut pending = pending.into_iter();

        while let Some(index) = pending.next() {
            let Some(case) = cases.get(index) else {
                continue;
            };
            if case.is_scored() && session.state().is_terminal() {
                result.halted = Some(format!("{} session is {}", session.name(), session.state()));
                self.halt(result, cases, Some(index).into_iter().chain(pending), sink);
                return;
            }

            let (outcome, failure) = judge_case(session, index, case, &self.config.limit).await;
            sink.case(&outcome);
            result.record(outcome);

            if let Some(error) = failure {
                warn!(engine = error.engine(), case = %case.id, error = %error, "session failed, halting suite");
                result.halted = Some(error.to_string());
                self.halt(result, cases, pending, sink);
                return;
            }
        }
    }

    /// Skipped cases need no engine, so they are still resolved; the rest is
    /// left unattempted.
    fn halt(
        &self,
        result: &mut BatchResult,
        cases: &[SuiteCase],
        rest: impl Iterator<Item = usize>,
        sink: &mut dyn ReportSink,
    ) {
        for index in rest {
            let Some(case) = cases.get(index) else {
                continue;
            };
            if case.is_scored() {
                result.leave_unattempted(index, case);
            } else {
                let outcome = CaseOutcome::skipped(index, case);
                sink.case(&outcome);
                result.record(outcome);
            }
        }
    }

    /// Run `cases` on a pool of `workers` sessions launched from `factory`.
    ///
    /// Fails only when no worker could launch a session at all.
    pub async fn run(
        &self,
        cases: &[SuiteCase],
        factory: Arc<dyn SessionFactory>,
        sink: &mut dyn ReportSink,
    ) -> Result<BatchResult, ArenaError> {
        let mut result = BatchResult::new(factory.name(), &self.config.limit);
        let mut order = InOrder::new();

        let mut work = VecDeque::new();
        for (index, case) in cases.iter().enumerate() {
            if case.is_scored() {
                work.push_back((index, case.clone()));
            } else {
                let outcome = CaseOutcome::skipped(index, case);
                order.push(outcome.clone(), sink);
                result.record(outcome);
            }
        }
        let workers = self.config.workers.clamp(1, work.len().max(1));
        info!(
            engine = factory.name(),
            cases = cases.len(),
            workers,
            limit = %self.config.limit,
            "running suite"
        );

        let queue: WorkQueue = Arc::new(Mutex::new(work));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pool = JoinSet::new();
        for worker in 0..workers {
            pool.spawn(run_worker(
                worker,
                factory.clone(),
                queue.clone(),
                self.config.limit,
                self.config.restart,
                tx.clone(),
            ));
        }
        drop(tx);

        while let Some(outcome) = rx.recv().await {
            order.push(outcome.clone(), sink);
            result.record(outcome);
        }

        let mut launched = 0;
        let mut last_error = None;
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(exit) => {
                    if exit.launched {
                        launched += 1;
                    }
                    if exit.error.is_some() {
                        last_error = exit.error;
                    }
                }
                Err(e) => warn!(error = %e, "batch worker panicked"),
            }
        }

        if launched == 0 {
            if let Some(error) = last_error {
                return Err(ArenaError::Session(error));
            }
        }

        let leftover: Vec<(usize, SuiteCase)> = queue.lock().await.drain(..).collect();
        for (index, case) in &leftover {
            result.leave_unattempted(*index, case);
            order.skip(*index, sink);
        }
        order.flush(sink);
        if !leftover.is_empty() {
            result.halted = Some(match last_error {
                Some(error) => format!("no workers left: {error}"),
                None => "no workers left".to_string(),
            });
        }

        info!(
            solved = result.solved,
            total = result.total,
            unattempted = result.unattempted.len(),
            "suite finished"
        );
        Ok(result)
    }
}
