use chess::{LegalMove, PieceKind};
use cozy_chess::Square;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::commands::{SessionCommand, SessionError};
use crate::config::GameSetup;
use crate::events::SessionEvent;
use crate::snapshot::SessionSnapshot;

/// Cheap, cloneable handle to a session actor.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(id: String, cmd_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { id, cmd_tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Start a new game from the standard position. `setup` replaces the
    /// current one when given.
    pub async fn new_game(&self, setup: Option<GameSetup>) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::NewGame { setup, reply: tx })
            .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn submit_move(
        &self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::SubmitMove {
            from,
            to,
            promotion,
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn undo(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Undo { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn load_fen(&self, fen: impl Into<String>) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::LoadFen {
            fen: fen.into(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn load_pgn(&self, pgn: impl Into<String>) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::LoadPgn {
            pgn: pgn.into(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn export_pgn(&self) -> Result<String, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::ExportPgn { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn set_analysis(&self, enabled: bool) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::SetAnalysis { enabled, reply: tx })
            .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetSnapshot { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    pub async fn legal_moves(&self, from: Option<Square>) -> Result<Vec<LegalMove>, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetLegalMoves { from, reply: tx })
            .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    pub async fn subscribe(
        &self,
    ) -> Result<(SessionSnapshot, broadcast::Receiver<SessionEvent>), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Subscribe { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    /// Stop the actor and the engine it owns.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SessionCommand::Shutdown { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::Internal("Session actor closed".into()))
    }
}
