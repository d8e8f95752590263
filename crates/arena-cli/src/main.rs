//! Arena CLI
//!
//! Run EPD suites against a UCI engine, or play two engines against each
//! other while a reference engine evaluates every position.

mod config;
mod console;
mod results;

use anyhow::{anyhow, bail, Context, Result};
use arena_core::{parse_suite, Position, SearchLimit};
use arena_runner::{
    BatchConfig, BatchRunner, EngineConfig, EngineSession, MatchConfig, MatchRunner, ReportSink,
    RestartPolicy, Seats, SessionFactory, UciSessionFactory,
};
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::ArenaConfig;
use console::ConsoleSink;
use results::RunReport;

const SUCCESS: i32 = 0;
/// The run finished early: a suite halted or a match was aborted
const RUN_INCOMPLETE: i32 = 1;
/// Bad arguments, unreadable files, engines that would not start
const SETUP_ERROR: i32 = 2;

#[derive(Parser)]
#[command(
    name = "arena",
    version,
    about = "Test UCI engines against EPD suites and compare them in evaluated matches"
)]
struct Cli {
    /// Engine definitions (TOML)
    #[arg(long, global = true, env = "ARENA_CONFIG")]
    config: Option<PathBuf>,

    /// UCI option for every engine started, as Name=Value
    #[arg(long = "option", global = true, value_parser = config::parse_option)]
    options: Vec<(String, String)>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an EPD suite and score best-move hits
    Suite(SuiteArgs),
    /// Play two engines against each other, optionally with a reference evaluator
    Match(MatchArgs),
    /// Print a report saved with --json
    Show {
        file: PathBuf,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct LimitArgs {
    /// Seconds per move
    #[arg(long)]
    time: Option<f64>,

    /// Fixed search depth
    #[arg(long)]
    depth: Option<u32>,
}

impl LimitArgs {
    fn resolve(&self) -> Result<SearchLimit> {
        match (self.time, self.depth) {
            (Some(secs), None) => SearchLimit::from_secs_f64(secs)
                .ok_or_else(|| anyhow!("--time must be a positive number of seconds, got {secs}")),
            (None, Some(0)) => bail!("--depth must be at least 1"),
            (None, Some(depth)) => Ok(SearchLimit::depth(depth)),
            _ => bail!("give exactly one of --time or --depth"),
        }
    }
}

#[derive(Args)]
struct SuiteArgs {
    /// Engine name from the config file, or path to an executable
    #[arg(long)]
    engine: String,

    /// EPD file
    #[arg(long)]
    suite: PathBuf,

    #[command(flatten)]
    limit: LimitArgs,

    /// Engine processes to run in parallel
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Fresh engines to launch after a session failure
    #[arg(long, default_value_t = 0)]
    restarts: u32,

    /// Write the result as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Args)]
struct MatchArgs {
    #[arg(long)]
    white: String,

    #[arg(long)]
    black: String,

    /// Engine that evaluates every position after each move
    #[arg(long)]
    reference: Option<String>,

    #[command(flatten)]
    limit: LimitArgs,

    #[arg(long, default_value_t = 18)]
    reference_depth: u32,

    /// Starting position (defaults to the standard one)
    #[arg(long)]
    fen: Option<String>,

    #[arg(long, default_value_t = 400)]
    max_plies: u32,

    /// Write the match log as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

/// Engine lookup shared by all commands.
struct Engines {
    config: ArenaConfig,
    options: Vec<(String, String)>,
}

impl Engines {
    fn resolve(&self, spec: &str) -> EngineConfig {
        self.config.resolve(spec, &self.options)
    }

    async fn launch(&self, spec: &str) -> Result<Box<dyn EngineSession>> {
        UciSessionFactory::new(self.resolve(spec))
            .launch()
            .await
            .with_context(|| format!("cannot start engine `{spec}`"))
    }
}

async fn run_suite(args: SuiteArgs, engines: &Engines) -> Result<i32> {
    let limit = args.limit.resolve()?;
    let source = std::fs::read_to_string(&args.suite)
        .with_context(|| format!("cannot read suite {}", args.suite.display()))?;

    let mut sink = ConsoleSink::new(io::stdout());
    let parse = parse_suite(&source);
    for error in &parse.errors {
        warn!(line = error.line, reason = %error.reason, "skipping suite entry");
        sink.suite_error(error);
    }
    if parse.cases.is_empty() {
        bail!("no usable entries in {}", args.suite.display());
    }

    let engine = engines.resolve(&args.engine);
    println!(
        "Starting {} on {}...",
        args.suite.display(),
        engine.path.display()
    );
    println!("Limit: {limit}\n");

    let restart = match args.restarts {
        0 => RestartPolicy::Never,
        n => RestartPolicy::Limit(n),
    };
    let runner = BatchRunner::new(BatchConfig {
        limit,
        workers: args.workers,
        restart,
    });
    let factory = UciSessionFactory::new(engine);

    let result = if args.workers > 1 {
        runner.run(&parse.cases, Arc::new(factory), &mut sink).await?
    } else {
        let mut session = factory
            .launch()
            .await
            .with_context(|| format!("cannot start engine `{}`", args.engine))?;
        let mut result = runner
            .run_with_session(&parse.cases, session.as_mut(), &mut sink)
            .await;

        let mut restarts = 0;
        while result.halted.is_some() && restarts < args.restarts {
            restarts += 1;
            session.stop().await;
            warn!(restarts, "launching a fresh engine for the remaining cases");
            match factory.launch().await {
                Ok(fresh) => session = fresh,
                Err(e) => {
                    warn!(error = %e, "relaunch failed");
                    break;
                }
            }
            runner
                .resume_from(&mut result, &parse.cases, session.as_mut(), &mut sink)
                .await;
        }
        session.stop().await;
        result
    };

    sink.batch_summary(&result);
    let complete = result.is_complete();
    if let Some(path) = &args.json {
        RunReport::Suite(result).save(path)?;
        info!(path = %path.display(), "result written");
    }
    Ok(if complete { SUCCESS } else { RUN_INCOMPLETE })
}

async fn run_match(args: MatchArgs, engines: &Engines) -> Result<i32> {
    let limit = args.limit.resolve()?;
    let initial = match &args.fen {
        Some(fen) => Position::from_fen(fen)?,
        None => Position::startpos(),
    };

    let mut white = engines.launch(&args.white).await?;
    let mut black = match engines.launch(&args.black).await {
        Ok(session) => session,
        Err(e) => {
            white.stop().await;
            return Err(e);
        }
    };
    let mut reference = match &args.reference {
        None => None,
        Some(spec) => match engines.launch(spec).await {
            Ok(session) => Some(session),
            Err(e) => {
                white.stop().await;
                black.stop().await;
                return Err(e);
            }
        },
    };

    println!(
        "=== {} vs {} (reference: {}) ===",
        white.name(),
        black.name(),
        reference.as_ref().map_or("-", |r| r.name())
    );
    println!("Limit: {limit}\n");

    let runner = MatchRunner::new(MatchConfig {
        limit,
        reference_depth: args.reference_depth,
        max_plies: args.max_plies,
    });
    let mut sink = ConsoleSink::new(io::stdout());
    let played = runner
        .run_match(
            initial,
            Seats {
                white: white.as_mut(),
                black: black.as_mut(),
            },
            reference
                .as_deref_mut()
                .map(|r| r as &mut dyn EngineSession),
            &mut sink,
        )
        .await;

    white.stop().await;
    black.stop().await;
    if let Some(reference) = reference.as_mut() {
        reference.stop().await;
    }

    let (report, code) = match played {
        Ok(report) => (report, SUCCESS),
        Err(aborted) => {
            eprintln!("{aborted}");
            (*aborted.report, RUN_INCOMPLETE)
        }
    };
    sink.match_summary(&report);
    if let Some(path) = &args.json {
        RunReport::Match(report).save(path)?;
        info!(path = %path.display(), "match log written");
    }
    Ok(code)
}

async fn run(cli: Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => ArenaConfig::load(path)?,
        None => ArenaConfig::default(),
    };
    let engines = Engines {
        config,
        options: cli.options,
    };

    match cli.command {
        Command::Suite(args) => run_suite(args, &engines).await,
        Command::Match(args) => run_match(args, &engines).await,
        Command::Show { file } => {
            println!("{}", RunReport::load(&file)?.generate_report());
            Ok(SUCCESS)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            SETUP_ERROR
        }
    };
    std::process::exit(code);
}
