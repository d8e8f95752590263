//! Tests for terminal-position detection
//!
//! A match stops as soon as the position is terminal:
//! - Checkmate and stalemate
//! - Fifty-move rule
//! - Threefold repetition
//! - Insufficient material

use arena_core::{GameStatus, Position, Side};

fn status(fen: &str) -> GameStatus {
    Position::from_fen(fen).unwrap().status()
}

// =============================================================================
// Stalemate / Checkmate
// =============================================================================

#[test]
fn test_stalemate_king_in_corner() {
    // Black king on a8, white queen on b6, white king on c7
    assert_eq!(status("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1"), GameStatus::Stalemate);
}

#[test]
fn test_stalemate_king_and_pawn_endgame() {
    assert_eq!(status("6k1/6P1/6K1/8/8/8/8/8 b - - 0 1"), GameStatus::Stalemate);
}

#[test]
fn test_checkmate_is_not_stalemate() {
    // Scholar's mate
    let pos =
        Position::from_fen("r1bqkb1r/pppp1Qpp/2n2n2/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 4")
            .unwrap();
    assert_eq!(
        pos.status(),
        GameStatus::Checkmate {
            winner: Side::White
        }
    );
    assert!(pos.is_terminal());
}

#[test]
fn test_check_is_not_checkmate() {
    let pos =
        Position::from_fen("rnbqkbnr/ppppp1pp/8/5p1Q/4P3/8/PPPP1PPP/RNB1KBNR b KQkq - 1 2").unwrap();
    assert_eq!(pos.status(), GameStatus::Ongoing);
    assert!(!pos.legal_moves().is_empty());
}

#[test]
fn test_fools_mate_through_play() {
    let mut pos = Position::startpos();
    for mv in ["f3", "e5", "g4", "Qh4#"] {
        assert!(!pos.is_terminal());
        pos = pos.play(mv).unwrap();
    }
    assert_eq!(
        pos.status(),
        GameStatus::Checkmate {
            winner: Side::Black
        }
    );
}

// =============================================================================
// Fifty-Move Rule
// =============================================================================

#[test]
fn test_fifty_move_rule_at_100_halfmoves() {
    assert_eq!(
        status("8/8/8/4k3/8/4K3/4P3/8 w - - 100 60"),
        GameStatus::FiftyMoveRule
    );
}

#[test]
fn test_fifty_move_rule_at_99_halfmoves() {
    assert_eq!(
        status("8/8/8/4k3/8/4K3/4P3/8 w - - 99 60"),
        GameStatus::Ongoing
    );
}

#[test]
fn test_fifty_move_rule_reset_on_pawn_move() {
    let pos = Position::from_fen("8/8/8/4k3/8/3K4/4P3/8 w - - 99 60").unwrap();
    let next = pos.play("e2e4").unwrap();
    assert_eq!(next.status(), GameStatus::Ongoing);
    assert!(next.fen().contains(" 0 60"));
}

// =============================================================================
// Insufficient Material
// =============================================================================

#[test]
fn test_insufficient_material_king_vs_king() {
    assert_eq!(
        status("8/8/8/4k3/8/4K3/8/8 w - - 0 1"),
        GameStatus::InsufficientMaterial
    );
}

#[test]
fn test_insufficient_material_single_minor() {
    for fen in [
        "8/8/8/4k3/8/4KB2/8/8 w - - 0 1",
        "8/8/8/4k3/8/4K3/8/1N6 w - - 0 1",
        "8/8/4b3/4k3/8/4K3/8/8 w - - 0 1",
        "8/8/4n3/4k3/8/4K3/8/8 w - - 0 1",
    ] {
        assert_eq!(status(fen), GameStatus::InsufficientMaterial, "{fen}");
    }
}

#[test]
fn test_sufficient_material() {
    for fen in [
        "8/8/8/4k3/8/4K3/4P3/8 w - - 0 1",
        "8/8/8/4k3/8/4K3/8/4R3 w - - 0 1",
        "8/8/8/4k3/8/4K3/8/4Q3 w - - 0 1",
        "8/8/8/4k3/8/4K3/3NN3/8 w - - 0 1",
        "2b5/8/8/4k3/8/4K3/8/2B5 w - - 0 1",
    ] {
        assert_eq!(status(fen), GameStatus::Ongoing, "{fen}");
    }
}

// =============================================================================
// Repetition
// =============================================================================

#[test]
fn test_repetition_ignores_move_counters() {
    let mut pos = Position::from_fen(
        "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
    )
    .unwrap();
    for _ in 0..2 {
        for mv in ["Ng1", "Nb8", "Nf3", "Nc6"] {
            pos = pos.play(mv).unwrap();
        }
    }
    assert_eq!(pos.repetitions(), 3);
    assert_eq!(pos.status(), GameStatus::Repetition);
}
