//! Rules-engine boundary over cozy-chess: game state, legality, termination,
//! FEN and PGN.

pub mod converters;
pub mod fen;
pub mod game;
pub mod openings;
pub mod pgn;
pub mod types;
pub mod uci;

pub use converters::*;
pub use fen::{edit_square, FenError, STANDARD_FEN};
pub use game::{
    DrawReason, Game, GameError, HistoryEntry, LegalMove, StartPosition, Termination,
};
pub use openings::detect_opening;
pub use pgn::GameResult;
pub use types::{PieceColor, PieceKind, PlacedPiece};
pub use uci::{convert_uci_castling_to_cozy, format_uci_move, parse_uci_move};
