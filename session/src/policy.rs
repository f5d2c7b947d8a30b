//! Built-in opponent used when no engine is available or it fails to answer.

use chess::{Game, LegalMove, PieceKind};
use cozy_chess::{Move, Square};
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::types::Difficulty;

/// Weight of the opponent's best reply in the `Hard` evaluation.
const REPLY_WEIGHT: f64 = 0.6;
const CENTER_BONUS: f64 = 0.2;

const CENTER: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];

fn piece_value(kind: PieceKind) -> f64 {
    match kind {
        PieceKind::Pawn => 1.0,
        PieceKind::Knight => 3.0,
        PieceKind::Bishop => 3.1,
        PieceKind::Rook => 5.0,
        PieceKind::Queen => 9.0,
        PieceKind::King => 0.0,
    }
}

/// Static value of a move: what it captures plus a small bonus for landing
/// on a centre square.
pub fn move_value(mv: &LegalMove) -> f64 {
    let capture = mv.captured.map_or(0.0, piece_value);
    let center = if CENTER.contains(&mv.to) {
        CENTER_BONUS
    } else {
        0.0
    };
    capture + center
}

/// Pick a move for the side to move, or `None` if it has no legal move.
/// Promotions are always to a queen; among equal scores the first move wins.
pub fn choose_move(game: &Game, difficulty: Difficulty) -> Option<Move> {
    let candidates = candidates(game);
    if candidates.is_empty() {
        return None;
    }

    let chosen = match difficulty {
        Difficulty::Easy => candidates.choose(&mut thread_rng())?,
        Difficulty::Medium => first_max(&candidates, move_value)?,
        Difficulty::Hard => first_max(&candidates, |mv| {
            move_value(mv) - REPLY_WEIGHT * best_reply_value(game, mv.mv)
        })?,
    };
    Some(chosen.mv)
}

fn candidates(game: &Game) -> Vec<LegalMove> {
    game.legal_moves_from(None)
        .into_iter()
        .filter(|mv| mv.promotion.is_none_or(|p| p == PieceKind::Queen))
        .collect()
}

/// Value of the opponent's best answer to `mv`, never below zero.
fn best_reply_value(game: &Game, mv: Move) -> f64 {
    let mut after = game.clone();
    if after.make_move(mv).is_err() {
        return 0.0;
    }
    after
        .legal_moves_from(None)
        .iter()
        .map(move_value)
        .fold(0.0, f64::max)
}

fn first_max<F>(moves: &[LegalMove], score: F) -> Option<&LegalMove>
where
    F: Fn(&LegalMove) -> f64,
{
    let mut best: Option<(&LegalMove, f64)> = None;
    for mv in moves {
        let value = score(mv);
        if best.is_none_or(|(_, top)| value > top) {
            best = Some((mv, value));
        }
    }
    best.map(|(mv, _)| mv)
}
