//! UCI (Universal Chess Interface) utilities

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::converters::{format_piece, format_square, parse_piece, parse_square};

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
///
/// This function checks if the move is a castling move and converts it to the
/// appropriate cozy_chess format by finding the matching legal move.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    // Check if this looks like a UCI castling move (king moving 2 squares on rank 1 or 8)
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_rank_1_or_8 && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        // This looks like a castling move in UCI notation
        // Convert to cozy_chess notation
        let target_square = match (mv.from.rank(), mv.to.file()) {
            (Rank::First, File::G) => Square::new(File::H, Rank::First), // e1g1 → e1h1 (white kingside)
            (Rank::First, File::C) => Square::new(File::A, Rank::First), // e1c1 → e1a1 (white queenside)
            (Rank::Eighth, File::G) => Square::new(File::H, Rank::Eighth), // e8g8 → e8h8 (black kingside)
            (Rank::Eighth, File::C) => Square::new(File::A, Rank::Eighth), // e8c8 → e8a8 (black queenside)
            _ => return mv,                                                // Not a castling move
        };

        let converted = Move {
            from: mv.from,
            to: target_square,
            promotion: None,
        };

        // Verify the converted move is in the legal moves list
        if legal_moves.contains(&converted) {
            return converted;
        }
    }

    // Not a castling move or conversion didn't work, return original
    mv
}

/// Convert cozy_chess king-takes-rook castling back to the standard UCI form
/// (e1h1 → e1g1). Any other move is returned unchanged.
pub fn convert_cozy_castling_to_uci(board: &Board, mv: Move) -> Move {
    let side = board.side_to_move();
    let is_castle = board.piece_on(mv.from) == Some(Piece::King)
        && board.piece_on(mv.to) == Some(Piece::Rook)
        && board.color_on(mv.to) == Some(side);
    if !is_castle {
        return mv;
    }

    let file = if (mv.to.file() as usize) > (mv.from.file() as usize) {
        File::G
    } else {
        File::C
    };
    Move {
        from: mv.from,
        to: Square::new(file, mv.from.rank()),
        promotion: None,
    }
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

/// Parse a 4-5 character coordinate move token ("e2e4", "e7e8q").
pub fn parse_uci_move(token: &str) -> Option<Move> {
    if !token.is_ascii() || !(4..=5).contains(&token.len()) {
        return None;
    }
    let from = parse_square(&token[0..2])?;
    let to = parse_square(&token[2..4])?;
    let promotion = match token[4..].chars().next() {
        Some(c) => match parse_piece(c)? {
            Piece::Pawn | Piece::King => return None,
            piece => Some(piece),
        },
        None => None,
    };
    Some(Move {
        from,
        to,
        promotion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn test_parse_uci_move() {
        let mv = parse_uci_move("e7e8n").unwrap();
        assert_eq!(mv.promotion, Some(Piece::Knight));
        assert_eq!(format_uci_move(mv), "e7e8n");
        assert!(parse_uci_move("e7e8k").is_none());
        assert!(parse_uci_move("(none)").is_none());
        assert!(parse_uci_move("e2").is_none());
    }

    #[test]
    fn test_castling_conversions_round_trip() {
        let board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let mut legal = Vec::new();
        board.generate_moves(|mvs| {
            legal.extend(mvs);
            false
        });

        let uci = parse_uci_move("e1g1").unwrap();
        let cozy = convert_uci_castling_to_cozy(uci, &legal);
        assert_eq!(format_uci_move(cozy), "e1h1");
        assert_eq!(format_uci_move(convert_cozy_castling_to_uci(&board, cozy)), "e1g1");

        let queenside = convert_uci_castling_to_cozy(parse_uci_move("e1c1").unwrap(), &legal);
        assert_eq!(format_uci_move(queenside), "e1a1");
    }
}
