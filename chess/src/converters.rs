//! Conversions between cozy-chess types and their text forms.

use cozy_chess::{File, Piece, Rank, Square};

/// Format a square as algebraic text ("e4").
pub fn format_square(sq: Square) -> String {
    format!("{}{}", file_to_char(sq.file()), rank_to_char(sq.rank()))
}

/// Parse algebraic square text ("e4"). Returns `None` for anything else.
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = char_to_file(chars.next()?)?;
    let rank = char_to_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

pub fn file_to_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

pub fn rank_to_char(rank: Rank) -> char {
    match rank {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

pub fn char_to_file(c: char) -> Option<File> {
    match c {
        'a' => Some(File::A),
        'b' => Some(File::B),
        'c' => Some(File::C),
        'd' => Some(File::D),
        'e' => Some(File::E),
        'f' => Some(File::F),
        'g' => Some(File::G),
        'h' => Some(File::H),
        _ => None,
    }
}

pub fn char_to_rank(c: char) -> Option<Rank> {
    match c {
        '1' => Some(Rank::First),
        '2' => Some(Rank::Second),
        '3' => Some(Rank::Third),
        '4' => Some(Rank::Fourth),
        '5' => Some(Rank::Fifth),
        '6' => Some(Rank::Sixth),
        '7' => Some(Rank::Seventh),
        '8' => Some(Rank::Eighth),
        _ => None,
    }
}

/// Lowercase piece letter, as used in UCI promotion suffixes.
pub fn format_piece(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

/// Uppercase piece letter, as used in SAN.
pub fn format_piece_upper(piece: Piece) -> char {
    format_piece(piece).to_ascii_uppercase()
}

pub fn parse_piece(c: char) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        'p' => Some(Piece::Pawn),
        'n' => Some(Piece::Knight),
        'b' => Some(Piece::Bishop),
        'r' => Some(Piece::Rook),
        'q' => Some(Piece::Queen),
        'k' => Some(Piece::King),
        _ => None,
    }
}
