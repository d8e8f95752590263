use super::*;
use std::time::Duration;

#[test]
fn test_go_commands() {
    assert_eq!(
        go_command(&SearchLimit::time(Duration::from_secs(2))),
        "go movetime 2000"
    );
    assert_eq!(go_command(&SearchLimit::depth(18)), "go depth 18");
    assert_eq!(
        go_command(&SearchLimit::time(Duration::from_micros(10))),
        "go movetime 1"
    );
}

#[test]
fn test_position_command_uses_fen() {
    assert_eq!(
        position_command(&Position::startpos()),
        "position fen rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    );
}

#[test]
fn test_handshake_lines() {
    assert_eq!(
        parse_line("id name Stockfish 16.1"),
        EngineLine::Id {
            name: "Stockfish 16.1".into()
        }
    );
    assert_eq!(parse_line("id author the team"), EngineLine::Other);
    assert_eq!(
        parse_line("option name Skill Level type spin default 20 min 0 max 20"),
        EngineLine::Option {
            name: "Skill Level".into()
        }
    );
    assert_eq!(parse_line("uciok"), EngineLine::UciOk);
    assert_eq!(parse_line("  readyok  "), EngineLine::ReadyOk);
}

#[test]
fn test_info_centipawns() {
    let EngineLine::Info(info) =
        parse_line("info depth 12 seldepth 18 multipv 1 score cp -35 nodes 123456 nps 1000 pv e7e5 g1f3")
    else {
        panic!("not an info line");
    };
    assert_eq!(info.depth, Some(12));
    assert_eq!(info.nodes, Some(123456));
    assert_eq!(info.score, Some(Score::relative(Evaluation::Centipawns(-35))));
    assert!(info.is_primary());
}

#[test]
fn test_info_mate_and_bounds() {
    let EngineLine::Info(info) = parse_line("info depth 30 score mate -4 lowerbound") else {
        panic!("not an info line");
    };
    assert_eq!(info.score, Some(Score::relative(Evaluation::Mate(-4))));
    assert_eq!(info.bound, Some(Bound::Lower));
}

#[test]
fn test_extreme_score_flips_back() {
    let EngineLine::Info(info) = parse_line("info score cp -2147483648") else {
        panic!("not an info line");
    };
    let parsed = Evaluation::Centipawns(-i32::MAX);
    assert_eq!(info.score, Some(Score::relative(parsed)));
    assert_eq!(parsed.flip().flip(), parsed);
}

#[test]
fn test_info_secondary_line_and_string() {
    let EngineLine::Info(info) = parse_line("info multipv 2 score cp 10") else {
        panic!("not an info line");
    };
    assert!(!info.is_primary());

    let EngineLine::Info(info) = parse_line("info string score cp 999 is not a score") else {
        panic!("not an info line");
    };
    assert_eq!(info.score, None);
}

#[test]
fn test_bestmove() {
    assert_eq!(
        parse_line("bestmove e2e4 ponder e7e5"),
        EngineLine::BestMove {
            mv: Some("e2e4".into())
        }
    );
    assert_eq!(parse_line("bestmove (none)"), EngineLine::BestMove { mv: None });
    assert_eq!(parse_line("bestmove 0000"), EngineLine::BestMove { mv: None });
    assert_eq!(parse_line("bestmove"), EngineLine::BestMove { mv: None });
}
