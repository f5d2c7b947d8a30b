pub mod command;
pub mod parser;

pub use command::{GoParams, UciCommand};
pub use parser::{parse_line, parse_uci_message, UciMessage};

#[derive(Debug, thiserror::Error)]
pub enum UciError {
    #[error("Empty UCI line")]
    Empty,
    #[error("Malformed UCI message: {0}")]
    MalformedMessage(String),
    #[error("Unknown UCI message: {0}")]
    UnknownMessage(String),
}
