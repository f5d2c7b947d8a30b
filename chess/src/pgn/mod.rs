//! PGN import/export and SAN.

pub mod parser;
pub mod san;
pub mod writer;

pub use parser::{parse_pgn, GameResult, PgnError, PgnGame, PgnMove};
pub use san::{format_san, parse_san, SanError};
pub use writer::write_pgn;
