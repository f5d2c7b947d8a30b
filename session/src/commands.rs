use chess::{LegalMove, PieceKind};
use cozy_chess::Square;
use tokio::sync::{broadcast, oneshot};

use crate::config::GameSetup;
use crate::events::SessionEvent;
use crate::snapshot::SessionSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Promotion piece required")]
    PromotionRequired,
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    #[error("Invalid game record: {0}")]
    InvalidRecord(String),
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Game is over")]
    GameOver,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("No game in progress")]
    NoGame,
    #[error("Internal error: {0}")]
    Internal(String),
}

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
/// Opponent moves are never requested: the actor triggers them itself.
pub enum SessionCommand {
    NewGame {
        /// Replaces the current setup when given.
        setup: Option<GameSetup>,
        reply: Reply<SessionSnapshot>,
    },
    SubmitMove {
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
        reply: Reply<SessionSnapshot>,
    },
    Undo {
        reply: Reply<SessionSnapshot>,
    },
    LoadFen {
        fen: String,
        reply: Reply<SessionSnapshot>,
    },
    LoadPgn {
        pgn: String,
        reply: Reply<SessionSnapshot>,
    },
    ExportPgn {
        reply: Reply<String>,
    },
    SetAnalysis {
        enabled: bool,
        reply: Reply<SessionSnapshot>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    GetLegalMoves {
        from: Option<Square>,
        reply: oneshot::Sender<Vec<LegalMove>>,
    },
    Subscribe {
        reply: oneshot::Sender<(SessionSnapshot, broadcast::Receiver<SessionEvent>)>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
