use chess::{PieceColor, PlacedPiece};
use engine::Score;

use crate::events::AnalysisUpdate;
use crate::timer::TimerSnapshot;
use crate::types::{Difficulty, GameMode, SessionPhase};

/// Complete session state, sent on every transition so a front-end can
/// re-render from it alone.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub fen: String,
    pub side_to_move: PieceColor,
    pub phase: SessionPhase,
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub move_count: usize,
    pub history: Vec<MoveRecord>,
    /// (from, to) of the last move, castling in standard form.
    pub last_move: Option<(String, String)>,
    pub in_check: bool,
    pub pieces: Vec<PlacedPiece>,
    pub engine_available: bool,
    pub engine_thinking: bool,
    pub analysis_on: bool,
    pub analysis: Option<AnalysisUpdate>,
    pub eval_history: Vec<EvalPoint>,
    /// ECO name of the line played. Only White-first games from the standard
    /// setup are named; the table has no lines that open with a Black move.
    pub opening: Option<String>,
    pub timer: Option<TimerSnapshot>,
}

impl SessionSnapshot {
    pub fn piece_on(&self, square: cozy_chess::Square) -> Option<&PlacedPiece> {
        self.pieces.iter().find(|p| p.square == square)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub san: String,
    pub uci: String,
    pub color: PieceColor,
    pub fen_after: String,
}

/// Latest evaluation of the position after `ply` half-moves, White's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalPoint {
    pub ply: usize,
    pub score: Score,
}
