use chess::PieceColor;
use engine::Score;

use crate::snapshot::SessionSnapshot;

/// Events broadcast from the session actor to all subscribers.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum SessionEvent {
    /// Full state snapshot after any transition.
    StateChanged(SessionSnapshot),
    /// Live engine evaluation of the current position.
    Analysis(AnalysisUpdate),
    /// Error notification.
    Error(String),
}

/// One engine evaluation of the position at `ply`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisUpdate {
    pub ply: usize,
    pub side_to_move: PieceColor,
    pub depth: Option<u32>,
    pub multipv: Option<u8>,
    /// From the side to move's point of view, as the engine reports it.
    pub score: Option<Score>,
    /// Same score from White's point of view.
    pub white_score: Option<Score>,
    /// `#3`, `-1.20`, ...; empty when the engine gave no score.
    pub score_text: String,
    pub pv: Vec<String>,
}
