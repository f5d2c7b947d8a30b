use cozy_chess::{Board, Move, Piece};

use crate::converters::{file_to_char, format_piece_upper, format_square, rank_to_char};

/// Parse Standard Algebraic Notation (SAN) move
///
/// Matching is done against the SAN of every legal move, so disambiguation,
/// castling and promotion follow exactly what [`format_san`] produces.
/// Check/mate markers, annotation glyphs, `0-0` castling and a missing `=`
/// before the promotion piece are tolerated.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let wanted = normalize(san);
    if wanted.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let mut found: Option<Move> = None;
    for mv in legal_moves(board) {
        if normalize(&format_san(board, mv)) == wanted {
            if found.is_some() {
                return Err(SanError::AmbiguousMove(san.to_string()));
            }
            found = Some(mv);
        }
    }

    found.ok_or_else(|| SanError::NoLegalMove(san.to_string()))
}

/// Format a move as SAN
pub fn format_san(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return format!("{}{}", format_square(mv.from), format_square(mv.to));
    };
    let side = board.side_to_move();

    let mut san = String::new();
    if piece == Piece::King && board.color_on(mv.to) == Some(side) {
        // cozy-chess encodes castling as the king capturing its own rook.
        if (mv.to.file() as usize) > (mv.from.file() as usize) {
            san.push_str("O-O");
        } else {
            san.push_str("O-O-O");
        }
    } else {
        let is_capture = board.color_on(mv.to) == Some(!side)
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        match piece {
            Piece::Pawn => {
                if is_capture {
                    san.push(file_to_char(mv.from.file()));
                }
            }
            _ => {
                san.push(format_piece_upper(piece));
                san.push_str(&disambiguation(board, mv, piece));
            }
        }

        if is_capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(format_piece_upper(promo));
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        if legal_moves(&after).is_empty() {
            san.push('#');
        } else {
            san.push('+');
        }
    }

    san
}

/// File, rank, or both, whichever separates `mv` from other moves of the same
/// piece type landing on the same square.
fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: Vec<Move> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to && other.from != mv.from && board.piece_on(other.from) == Some(piece)
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let shares_file = rivals.iter().any(|o| o.from.file() == mv.from.file());
    let shares_rank = rivals.iter().any(|o| o.from.rank() == mv.from.rank());

    if !shares_file {
        file_to_char(mv.from.file()).to_string()
    } else if !shares_rank {
        rank_to_char(mv.from.rank()).to_string()
    } else {
        format_square(mv.from)
    }
}

fn normalize(san: &str) -> String {
    san.trim()
        .trim_end_matches(['+', '#', '!', '?'])
        .replace("0-0-0", "O-O-O")
        .replace("0-0", "O-O")
        .replace('=', "")
}

pub(crate) fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

#[derive(Debug, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::parse_uci_move;

    fn board(fen: &str) -> Board {
        fen.parse().unwrap()
    }

    fn san_of(fen: &str, uci: &str) -> String {
        let b = board(fen);
        format_san(&b, parse_uci_move(uci).unwrap())
    }

    #[test]
    fn test_basic_moves() {
        let start = crate::fen::STANDARD_FEN;
        assert_eq!(san_of(start, "e2e4"), "e4");
        assert_eq!(san_of(start, "g1f3"), "Nf3");
    }

    #[test]
    fn test_capture_and_check() {
        // 1. e4 d5 2. exd5
        let fen = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2";
        assert_eq!(san_of(fen, "e4d5"), "exd5");
        // Scholar's mate final move.
        let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";
        assert_eq!(san_of(fen, "h5f7"), "Qxf7#");
    }

    #[test]
    fn test_castling_and_disambiguation() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(san_of(fen, "e1h1"), "O-O");
        assert_eq!(san_of(fen, "e1a1"), "O-O-O");
        // Two knights can reach d2.
        let fen = "4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1";
        assert_eq!(san_of(fen, "b1d2"), "Nbd2");
    }

    #[test]
    fn test_promotion() {
        let fen = "8/4P3/8/8/8/8/k7/4K3 w - - 0 1";
        assert_eq!(san_of(fen, "e7e8q"), "e8=Q");
    }

    #[test]
    fn test_parse_san_variants() {
        let b = board(crate::fen::STANDARD_FEN);
        assert_eq!(parse_san(&b, "e4").unwrap(), parse_uci_move("e2e4").unwrap());
        assert_eq!(parse_san(&b, "Nf3!?").unwrap(), parse_uci_move("g1f3").unwrap());
        assert!(matches!(parse_san(&b, "Ke2"), Err(SanError::NoLegalMove(_))));
        assert!(matches!(parse_san(&b, "  "), Err(SanError::InvalidFormat(_))));

        let castle = board("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(
            parse_san(&castle, "0-0").unwrap(),
            parse_uci_move("e1h1").unwrap()
        );

        let promo = board("8/4P3/8/8/8/8/k7/4K3 w - - 0 1");
        assert_eq!(
            parse_san(&promo, "e8Q").unwrap(),
            parse_uci_move("e7e8q").unwrap()
        );
    }
}
