//! Move token conversion.
//!
//! `cozy-chess` encodes castling as "king captures own rook" (`e1h1`), while
//! UCI engines and EPD files use the standard king destination (`e1g1`, `O-O`).
//! Everything that turns text into a [`Move`] or back goes through here.

use cozy_chess::{Board, File, Move, Piece, Square};

use crate::error::MoveError;

/// All legal moves in the position, in `cozy-chess` encoding.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::with_capacity(64);
    board.generate_moves(|piece_moves| {
        moves.extend(piece_moves);
        false
    });
    moves
}

fn is_castle(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// Standard UCI text for a legal move (`e1g1` rather than `e1h1`).
pub fn move_to_uci(board: &Board, mv: Move) -> String {
    if is_castle(board, mv) {
        let file = if mv.to.file() as usize > mv.from.file() as usize {
            File::G
        } else {
            File::C
        };
        let to = Square::new(file, mv.from.rank());
        return format!("{}{}", mv.from, to);
    }
    mv.to_string()
}

/// Looks like `e2e4` or `e7e8q`, regardless of legality.
pub fn looks_like_uci(token: &str) -> bool {
    let b = token.as_bytes();
    let square = |f: u8, r: u8| (b'a'..=b'h').contains(&f) && (b'1'..=b'8').contains(&r);
    match b.len() {
        4 => square(b[0], b[1]) && square(b[2], b[3]),
        5 => square(b[0], b[1]) && square(b[2], b[3]) && b"qrbnQRBN".contains(&b[4]),
        _ => false,
    }
}

/// Resolve a UCI token against the position.
///
/// Accepts both the standard castling form and the king-takes-rook form.
pub fn parse_uci_move(board: &Board, token: &str) -> Result<Move, MoveError> {
    if !looks_like_uci(token) {
        return Err(MoveError::Malformed(token.to_string()));
    }
    let mut mv: Move = token
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| MoveError::Malformed(token.to_string()))?;

    if !board.is_legal(mv) && board.piece_on(mv.from) == Some(Piece::King) {
        let from_file = mv.from.file() as i32;
        let to_file = mv.to.file() as i32;
        if (to_file - from_file).abs() == 2 {
            let rook_file = if to_file > from_file { File::H } else { File::A };
            mv.to = Square::new(rook_file, mv.from.rank());
        }
    }

    if board.is_legal(mv) {
        Ok(mv)
    } else {
        Err(MoveError::Illegal(token.to_string()))
    }
}

fn piece_from_char(c: char) -> Option<Piece> {
    match c {
        'N' => Some(Piece::Knight),
        'B' => Some(Piece::Bishop),
        'R' => Some(Piece::Rook),
        'Q' => Some(Piece::Queen),
        'K' => Some(Piece::King),
        _ => None,
    }
}

/// Resolve a SAN token (`Nf3`, `exd5`, `e8=Q+`, `O-O-O`, `R1a3`) against the position.
pub fn parse_san_move(board: &Board, token: &str) -> Result<Move, MoveError> {
    let malformed = || MoveError::Malformed(token.to_string());
    let san = token.trim_end_matches(['+', '#', '!', '?']);
    let legal = legal_moves(board);

    let castle = match san {
        "O-O" | "0-0" => Some(true),
        "O-O-O" | "0-0-0" => Some(false),
        _ => None,
    };
    if let Some(kingside) = castle {
        return legal
            .into_iter()
            .find(|&mv| {
                is_castle(board, mv)
                    && (mv.to.file() as usize > mv.from.file() as usize) == kingside
            })
            .ok_or_else(|| MoveError::Illegal(token.to_string()));
    }

    let (body, promotion) = match san.split_once('=') {
        Some((body, promo)) => {
            let mut chars = promo.chars();
            let piece = chars.next().and_then(piece_from_char).ok_or_else(malformed)?;
            if chars.next().is_some() {
                return Err(malformed());
            }
            (body, Some(piece))
        }
        None => {
            // `e8Q` without the `=`
            let mut chars = san.chars().rev();
            match (chars.next(), chars.next()) {
                (Some(last), Some(prev)) if prev.is_ascii_digit() && last != 'K' => {
                    match piece_from_char(last) {
                        Some(piece) => (&san[..san.len() - 1], Some(piece)),
                        None => (san, None),
                    }
                }
                _ => (san, None),
            }
        }
    };

    let mut chars = body.chars().peekable();
    let piece = match chars.peek().copied().and_then(piece_from_char) {
        Some(p) => {
            chars.next();
            p
        }
        None => Piece::Pawn,
    };
    let rest: String = chars.filter(|&c| c != 'x' && c != '-' && c != ':').collect();
    if rest.len() < 2 || !rest.is_ascii() {
        return Err(malformed());
    }
    let (hint, dest) = rest.split_at(rest.len() - 2);
    let to: Square = dest.parse().map_err(|_| malformed())?;
    if hint.len() > 2 || !hint.chars().all(|c| matches!(c, 'a'..='h' | '1'..='8')) {
        return Err(malformed());
    }

    let mut candidates = legal.into_iter().filter(|&mv| {
        if board.piece_on(mv.from) != Some(piece) || is_castle(board, mv) {
            return false;
        }
        if mv.to != to || mv.promotion != promotion {
            return false;
        }
        let from = mv.from.to_string();
        hint.chars().all(|c| from.contains(c))
    });

    match (candidates.next(), candidates.next()) {
        (Some(mv), None) => Ok(mv),
        (Some(_), Some(_)) => Err(MoveError::Ambiguous(token.to_string())),
        (None, _) => Err(MoveError::Illegal(token.to_string())),
    }
}

/// Resolve any move token: UCI when it has that shape, SAN otherwise.
pub fn parse_move(board: &Board, token: &str) -> Result<Move, MoveError> {
    let token = token.trim();
    if looks_like_uci(token) {
        parse_uci_move(board, token)
    } else {
        parse_san_move(board, token)
    }
}

#[cfg(test)]
#[path = "notation_tests.rs"]
mod notation_tests;
