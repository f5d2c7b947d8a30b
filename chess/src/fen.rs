use cozy_chess::{Board, Color, Square};

use crate::types::{PieceColor, PieceKind};

/// FEN of the standard starting position.
pub const STANDARD_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    if parts.is_empty() {
        return Err(FenError::InvalidFormat);
    }
    if parts[0].split('/').count() != 8 {
        return Err(FenError::InvalidBoardLayout);
    }

    // Accept the four-field form some tools emit by filling in the clocks.
    let normalized = match parts.len() {
        4 => format!("{} 0 1", parts.join(" ")),
        6 => parts.join(" "),
        _ => return Err(FenError::InvalidFormat),
    };

    normalized.parse().map_err(|_| FenError::InvalidPosition)
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

/// The standard starting position with the given side to move.
pub fn standard_with_side_to_move(side: Color) -> Board {
    let fen = match side {
        Color::White => STANDARD_FEN.to_string(),
        Color::Black => STANDARD_FEN.replacen(" w ", " b ", 1),
    };
    // Both variants are fixed, valid positions.
    fen.parse().unwrap_or_default()
}

/// Rows of piece letters, `grid[rank][file]` with rank 0 being the first rank.
type Grid = [[Option<char>; 8]; 8];

/// Put `piece` on `square` (or empty it) and return the edited FEN.
///
/// Castling rights whose king or rook left its home square are dropped, the
/// en passant square is cleared and the halfmove clock restarts. The edited
/// position must still be legal.
pub fn edit_square(
    fen: &str,
    square: Square,
    piece: Option<(PieceKind, PieceColor)>,
) -> Result<String, FenError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() != 4 && fields.len() != 6 {
        return Err(FenError::InvalidFormat);
    }
    let mut grid = expand_placement(fields[0])?;
    grid[square.rank() as usize][square.file() as usize] = piece.map(|(kind, color)| match color {
        PieceColor::White => kind.to_char_upper(),
        PieceColor::Black => kind.to_char_lower(),
    });

    let edited = format!(
        "{} {} {} - 0 {}",
        compress_placement(&grid),
        fields[1],
        remaining_castling(fields[2], &grid),
        fields.get(5).copied().unwrap_or("1")
    );
    parse_fen(&edited)?;
    Ok(edited)
}

fn expand_placement(placement: &str) -> Result<Grid, FenError> {
    let rows: Vec<&str> = placement.split('/').collect();
    if rows.len() != 8 {
        return Err(FenError::InvalidBoardLayout);
    }
    let mut grid: Grid = [[None; 8]; 8];
    for (i, row) in rows.iter().enumerate() {
        let rank = 7 - i;
        let mut file = 0;
        for c in row.chars() {
            match c.to_digit(10) {
                Some(empty @ 1..=8) => file += empty as usize,
                Some(_) => return Err(FenError::InvalidBoardLayout),
                None if PieceKind::from_char(c).is_some() && file < 8 => {
                    grid[rank][file] = Some(c);
                    file += 1;
                }
                None => return Err(FenError::InvalidBoardLayout),
            }
        }
        if file != 8 {
            return Err(FenError::InvalidBoardLayout);
        }
    }
    Ok(grid)
}

fn compress_placement(grid: &Grid) -> String {
    let rows: Vec<String> = grid
        .iter()
        .rev()
        .map(|row| {
            let mut text = String::new();
            let mut empty = 0;
            for cell in row {
                match cell {
                    Some(c) => {
                        if empty > 0 {
                            text.push_str(&empty.to_string());
                            empty = 0;
                        }
                        text.push(*c);
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                text.push_str(&empty.to_string());
            }
            text
        })
        .collect();
    rows.join("/")
}

/// Castling rights from `rights` that the placement still supports.
fn remaining_castling(rights: &str, grid: &Grid) -> String {
    let kept: String = rights
        .chars()
        .filter(|right| {
            let (rank, king, rook, rook_file) = match *right {
                'K' => (0, 'K', 'R', 7),
                'Q' => (0, 'K', 'R', 0),
                'k' => (7, 'k', 'r', 7),
                'q' => (7, 'k', 'r', 0),
                _ => return false,
            };
            grid[rank][4] == Some(king) && grid[rank][rook_file] == Some(rook)
        })
        .collect();
    if kept.is_empty() {
        "-".to_string()
    } else {
        kept
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout")]
    InvalidBoardLayout,
    #[error("FEN describes an impossible position")]
    InvalidPosition,
}
