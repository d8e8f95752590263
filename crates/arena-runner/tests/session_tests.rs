//! Process-level tests for `UciSession`, using small shell scripts as engines.
#![cfg(unix)]

use arena_core::{Evaluation, Position, Score, SearchLimit, SessionError, SessionState};
use arena_runner::{EngineConfig, EngineSession, SessionFactory, UciSession, UciSessionFactory};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const QUICK: SearchLimit = SearchLimit::Time(Duration::from_millis(50));

/// A UCI engine in `sh`. `on_go` is the shell snippet run for `go` commands.
fn fake_engine(dir: &TempDir, on_go: &str) -> EngineConfig {
    let log = dir.path().join("commands.log");
    let script = format!(
        r#"while read -r line; do
  echo "$line" >> "{log}"
  case "$line" in
    uci) echo "id name Fake 1.0"; echo "option name Hash type spin default 16 min 1 max 1024"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) {on_go} ;;
    quit) exit 0 ;;
  esac
done
"#,
        log = log.display(),
    );
    let path = dir.path().join("engine.sh");
    fs::write(&path, script).unwrap();

    let mut config = EngineConfig::new("fake", "/bin/sh").with_args(vec![path.display().to_string()]);
    config.handshake_timeout = Duration::from_secs(5);
    config.grace = Duration::from_millis(300);
    config.quit_grace = Duration::from_millis(300);
    config
}

fn commands(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join("commands.log")).unwrap_or_default()
}

async fn started(config: EngineConfig) -> UciSession {
    let mut session = UciSession::new(config);
    session.start().await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    session
}

#[tokio::test]
async fn test_missing_executable_is_launch_error() {
    let mut session = UciSession::new(EngineConfig::new(
        "ghost",
        Path::new("/nonexistent/engine-binary"),
    ));

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, SessionError::Launch { .. }));
    assert_eq!(err.engine(), "ghost");
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_handshake_without_uciok_times_out() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mute.sh");
    fs::write(&path, "while read -r line; do :; done\n").unwrap();
    let mut config = EngineConfig::new("mute", "/bin/sh").with_args(vec![path.display().to_string()]);
    config.handshake_timeout = Duration::from_millis(200);

    let mut session = UciSession::new(config);
    let err = session.start().await.unwrap_err();
    assert!(matches!(err, SessionError::Launch { .. }), "{err}");
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_search_reports_primary_line_score() {
    let dir = TempDir::new().unwrap();
    let config = fake_engine(
        &dir,
        r#"echo "info depth 5 score cp -35 nodes 1000 pv e7e5"; echo "info multipv 2 depth 5 score cp -90"; echo "bestmove e7e5 ponder g1f3""#,
    )
    .with_option("Hash", "64");
    let mut session = started(config).await;
    assert_eq!(session.engine_id(), Some("Fake 1.0"));

    let position = Position::startpos().play("e2e4").unwrap();
    let reply = session.submit(&position, &QUICK).await.unwrap();

    assert_eq!(reply.best_move, "e7e5");
    assert_eq!(reply.score, Some(Score::relative(Evaluation::Centipawns(-35))));
    assert_eq!(reply.depth, Some(5));
    assert_eq!(reply.nodes, Some(1000));
    assert_eq!(session.state(), SessionState::Ready);

    session.stop().await;
    let log = commands(&dir);
    assert!(log.contains("setoption name Hash value 64"), "{log}");
    assert!(log.contains(&format!("position fen {}", position.fen())), "{log}");
    assert!(log.contains("go movetime 50"), "{log}");
}

#[tokio::test]
async fn test_bound_scores_do_not_replace_exact_score() {
    let dir = TempDir::new().unwrap();
    let config = fake_engine(
        &dir,
        r#"echo "info depth 6 score cp 20 pv e2e4"; echo "info depth 7 score cp 55 lowerbound"; echo "bestmove e2e4""#,
    );
    let mut session = started(config).await;

    let reply = session.submit(&Position::startpos(), &QUICK).await.unwrap();
    assert_eq!(reply.score, Some(Score::relative(Evaluation::Centipawns(20))));
    assert_eq!(reply.depth, Some(7));
    session.stop().await;
}

#[tokio::test]
async fn test_bound_score_used_when_nothing_exact() {
    let dir = TempDir::new().unwrap();
    let config = fake_engine(
        &dir,
        r#"echo "info depth 3 score cp -10 upperbound"; echo "bestmove e2e4""#,
    );
    let mut session = started(config).await;

    let reply = session.submit(&Position::startpos(), &QUICK).await.unwrap();
    assert_eq!(reply.score, Some(Score::relative(Evaluation::Centipawns(-10))));
    session.stop().await;
}

#[tokio::test]
async fn test_search_reports_mate_score() {
    let dir = TempDir::new().unwrap();
    let config = fake_engine(
        &dir,
        r#"echo "info depth 9 score mate -3"; echo "bestmove e2e4""#,
    );
    let mut session = started(config).await;

    let reply = session
        .submit(&Position::startpos(), &SearchLimit::depth(9))
        .await
        .unwrap();
    assert_eq!(reply.score, Some(Score::relative(Evaluation::Mate(-3))));
    session.stop().await;
    assert!(commands(&dir).contains("go depth 9"));
}

#[tokio::test]
async fn test_silent_engine_times_out_then_fails_fast() {
    let dir = TempDir::new().unwrap();
    let config = fake_engine(&dir, ":");
    let mut session = started(config).await;

    let err = session.submit(&Position::startpos(), &QUICK).await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout { .. }), "{err}");
    assert_eq!(session.state(), SessionState::Failed);

    let before = commands(&dir).lines().count();
    let started_at = Instant::now();
    let err = session.submit(&Position::startpos(), &QUICK).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Unavailable {
            state: SessionState::Failed,
            ..
        }
    ));
    assert!(started_at.elapsed() < Duration::from_millis(50));
    assert_eq!(commands(&dir).lines().count(), before);

    session.stop().await;
}

#[tokio::test]
async fn test_bestmove_none_is_protocol_error() {
    let dir = TempDir::new().unwrap();
    let config = fake_engine(&dir, r#"echo "bestmove (none)""#);
    let mut session = started(config).await;

    let err = session.submit(&Position::startpos(), &QUICK).await.unwrap_err();
    assert!(matches!(err, SessionError::Protocol { .. }), "{err}");
    assert_eq!(session.state(), SessionState::Failed);
    session.stop().await;
}

#[tokio::test]
async fn test_engine_exit_mid_search_is_protocol_error() {
    let dir = TempDir::new().unwrap();
    let config = fake_engine(&dir, "exit 0");
    let mut session = started(config).await;

    let err = session.submit(&Position::startpos(), &QUICK).await.unwrap_err();
    match err {
        SessionError::Protocol { detail, .. } => assert!(detail.contains("exited"), "{detail}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_new_game_and_idempotent_stop() {
    let dir = TempDir::new().unwrap();
    let config = fake_engine(&dir, r#"echo "bestmove e2e4""#);
    let mut session = started(config).await;

    session.new_game().await.unwrap();
    session.stop().await;
    session.stop().await;
    assert_eq!(session.state(), SessionState::Stopped);

    let err = session.submit(&Position::startpos(), &QUICK).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Unavailable {
            state: SessionState::Stopped,
            ..
        }
    ));
    let log = commands(&dir);
    assert!(log.contains("ucinewgame"));
    assert!(log.contains("quit"));
}

#[tokio::test]
async fn test_session_cannot_be_started_twice() {
    let dir = TempDir::new().unwrap();
    let mut session = started(fake_engine(&dir, r#"echo "bestmove e2e4""#)).await;

    assert!(matches!(
        session.start().await,
        Err(SessionError::Unavailable { .. })
    ));
    session.stop().await;
}

#[tokio::test]
async fn test_factory_launches_started_sessions() {
    let dir = TempDir::new().unwrap();
    let factory = UciSessionFactory::new(fake_engine(&dir, r#"echo "bestmove d2d4""#));

    let mut session = factory.launch().await.unwrap();
    assert_eq!(session.name(), "fake");
    assert_eq!(session.state(), SessionState::Ready);
    let reply = session.submit(&Position::startpos(), &QUICK).await.unwrap();
    assert_eq!(reply.best_move, "d2d4");
    session.stop().await;
}
