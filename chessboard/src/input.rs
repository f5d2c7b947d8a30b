//! Commands typed at the play prompt.

use std::path::PathBuf;

use chess::{parse_square, PieceColor, PieceKind, PlacedPiece};
use cozy_chess::Square;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Move {
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    },
    Undo,
    NewGame,
    ToggleAnalysis,
    Flip,
    /// Board editing: place a piece, replacing whatever stood there.
    Put(PlacedPiece),
    Clear(Square),
    LoadFen(String),
    LoadPgn(PathBuf),
    SavePgn(PathBuf),
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid piece: {0} (FEN letter, uppercase for White)")]
    InvalidPiece(String),
    #[error("Invalid promotion piece: {0}")]
    InvalidPromotion(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
}

pub const HELP: &str = "e2e4 / m e2 e4 [q] move | u undo | n new | a analysis | f flip | \
put <sq> <piece> / clear <sq> edit | fen <FEN> | load <file> | save <file> | q quit";

/// Parse one prompt line.
///
/// Moves are accepted as a single coordinate token (`e2e4`, `e7e8q`) or as
/// `m <from> <to> [piece]`.
pub fn parse_input(line: &str) -> Result<Input, InputError> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Err(InputError::Unknown(String::new()));
    };
    let rest = line[head.len()..].trim();

    match head {
        "u" | "undo" => Ok(Input::Undo),
        "n" | "new" => Ok(Input::NewGame),
        "a" | "analysis" => Ok(Input::ToggleAnalysis),
        "f" | "flip" => Ok(Input::Flip),
        "q" | "quit" => Ok(Input::Quit),
        "fen" => non_empty(rest, "fen").map(|fen| Input::LoadFen(fen.to_string())),
        "load" => non_empty(rest, "load").map(|path| Input::LoadPgn(PathBuf::from(path))),
        "save" => non_empty(rest, "save").map(|path| Input::SavePgn(PathBuf::from(path))),
        "put" => {
            let at = parts.next().ok_or(InputError::MissingArgument("put"))?;
            let letter = parts.next().ok_or(InputError::MissingArgument("put"))?;
            Ok(Input::Put(placed(square(at)?, letter)?))
        }
        "clear" => {
            let at = parts.next().ok_or(InputError::MissingArgument("clear"))?;
            Ok(Input::Clear(square(at)?))
        }
        "m" => {
            let from = parts.next().ok_or(InputError::MissingArgument("m"))?;
            let to = parts.next().ok_or(InputError::MissingArgument("m"))?;
            Ok(Input::Move {
                from: square(from)?,
                to: square(to)?,
                promotion: parts.next().map(promotion).transpose()?,
            })
        }
        token if (4..=5).contains(&token.len()) && token.is_ascii() => {
            let from = square(&token[0..2])?;
            let to = square(&token[2..4])?;
            let promotion = match token.get(4..) {
                Some("") | None => None,
                Some(piece) => Some(promotion(piece)?),
            };
            Ok(Input::Move {
                from,
                to,
                promotion,
            })
        }
        other => Err(InputError::Unknown(other.to_string())),
    }
}

/// A bare piece letter answering a promotion prompt.
pub fn parse_promotion(line: &str) -> Result<PieceKind, InputError> {
    promotion(line.trim())
}

fn non_empty<'a>(rest: &'a str, command: &'static str) -> Result<&'a str, InputError> {
    if rest.is_empty() {
        Err(InputError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

fn square(text: &str) -> Result<Square, InputError> {
    parse_square(text).ok_or_else(|| InputError::InvalidSquare(text.to_string()))
}

fn placed(square: Square, letter: &str) -> Result<PlacedPiece, InputError> {
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let kind = PieceKind::from_char(c)
                .ok_or_else(|| InputError::InvalidPiece(letter.to_string()))?;
            let color = if c.is_ascii_uppercase() {
                PieceColor::White
            } else {
                PieceColor::Black
            };
            Ok(PlacedPiece {
                kind,
                color,
                square,
            })
        }
        _ => Err(InputError::InvalidPiece(letter.to_string())),
    }
}

fn promotion(text: &str) -> Result<PieceKind, InputError> {
    let mut chars = text.chars();
    match (chars.next().and_then(PieceKind::from_char), chars.next()) {
        (Some(kind), None) if !matches!(kind, PieceKind::King | PieceKind::Pawn) => Ok(kind),
        _ => Err(InputError::InvalidPromotion(text.to_string())),
    }
}
