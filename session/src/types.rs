use std::fmt;
use std::str::FromStr;

use chess::{DrawReason, PieceColor, Termination};

/// Who plays which side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    HumanVsComputer { human_side: PieceColor },
    HumanVsHuman,
}

impl GameMode {
    pub fn is_human(&self, side: PieceColor) -> bool {
        match self {
            Self::HumanVsHuman => true,
            Self::HumanVsComputer { human_side } => *human_side == side,
        }
    }
}

impl Default for GameMode {
    fn default() -> Self {
        Self::HumanVsComputer {
            human_side: PieceColor::White,
        }
    }
}

/// Strength of the built-in opponent used when no engine answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    /// Uniformly random legal move.
    Easy,
    /// Best immediate capture/centre value.
    #[default]
    Medium,
    /// Immediate value minus the opponent's best reply.
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty '{}' (easy, medium, hard)", other)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Checkmate,
    Stalemate,
    Repetition,
    FiftyMove,
    InsufficientMaterial,
    FlagFall,
}

/// How a finished game ended. `winner` is `None` for draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOutcome {
    pub reason: EndReason,
    pub winner: Option<PieceColor>,
}

impl GameOutcome {
    /// The side that ran out of time loses.
    pub fn flag_fall(flagged: PieceColor) -> Self {
        Self {
            reason: EndReason::FlagFall,
            winner: Some(flagged.opposite()),
        }
    }
}

impl From<Termination> for GameOutcome {
    fn from(termination: Termination) -> Self {
        match termination {
            Termination::Checkmate { winner } => Self {
                reason: EndReason::Checkmate,
                winner: Some(winner),
            },
            Termination::Draw(reason) => Self {
                reason: match reason {
                    DrawReason::Stalemate => EndReason::Stalemate,
                    DrawReason::Repetition => EndReason::Repetition,
                    DrawReason::FiftyMove => EndReason::FiftyMove,
                    DrawReason::InsufficientMaterial => EndReason::InsufficientMaterial,
                },
                winner: None,
            },
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            EndReason::Checkmate => "checkmate",
            EndReason::Stalemate => "stalemate",
            EndReason::Repetition => "threefold repetition",
            EndReason::FiftyMove => "the fifty-move rule",
            EndReason::InsufficientMaterial => "insufficient material",
            EndReason::FlagFall => "time",
        };
        match self.winner {
            Some(PieceColor::White) => write!(f, "White wins on {}", reason),
            Some(PieceColor::Black) => write!(f, "Black wins on {}", reason),
            None => write!(f, "Draw by {}", reason),
        }
    }
}

/// Where the session is in the turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No game started yet.
    #[default]
    Idle,
    AwaitingHumanMove,
    AwaitingOpponentMove,
    GameOver { outcome: GameOutcome },
}

impl SessionPhase {
    pub fn is_over(&self) -> bool {
        matches!(self, Self::GameOver { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_sides() {
        let mode = GameMode::HumanVsComputer {
            human_side: PieceColor::Black,
        };
        assert!(mode.is_human(PieceColor::Black));
        assert!(!mode.is_human(PieceColor::White));
        assert!(GameMode::HumanVsHuman.is_human(PieceColor::White));
    }

    #[test]
    fn test_outcome_from_termination() {
        let outcome = GameOutcome::from(Termination::Checkmate {
            winner: PieceColor::Black,
        });
        assert_eq!(outcome.reason, EndReason::Checkmate);
        assert_eq!(outcome.winner, Some(PieceColor::Black));
        assert_eq!(outcome.to_string(), "Black wins on checkmate");

        let draw = GameOutcome::from(Termination::Draw(DrawReason::FiftyMove));
        assert_eq!(draw.winner, None);
        assert_eq!(draw.to_string(), "Draw by the fifty-move rule");
    }

    #[test]
    fn test_flag_fall_winner() {
        let outcome = GameOutcome::flag_fall(PieceColor::White);
        assert_eq!(outcome.winner, Some(PieceColor::Black));
        assert_eq!(outcome.reason, EndReason::FlagFall);
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("grandmaster".parse::<Difficulty>().is_err());
    }
}
