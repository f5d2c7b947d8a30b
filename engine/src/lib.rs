//! UCI engine plumbing: line parser, process adapter and request broker.
//!
//! The [`adapter::EngineAdapter`] owns one long-lived engine process and turns
//! its output into [`EngineEvent`]s. The [`broker`] runs an actor on top of the
//! adapter and serves one-shot best-move requests and streaming analysis
//! against that single process.

pub mod adapter;
pub mod broker;
pub mod error;
pub mod locate;
pub mod uci;

pub use adapter::{EngineAdapter, EngineConfig, RequestId};
pub use broker::{AnalysisRequest, AnalysisSubscription, BestMoveRequest, BrokerHandle, BrokerStatus};
pub use error::EngineError;
pub use locate::{default_candidates, EngineCandidate};
pub use uci::{parse_line, parse_uci_message, GoParams, UciCommand, UciError, UciMessage};

/// Events received from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Ready,
    Info(EngineInfo),
    BestMove(BestMove),
    Error(String),
}

/// Engine analysis information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub multipv: Option<u8>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub score: Option<Score>,
    /// Principal variation as the engine printed it (space-separated moves).
    pub pv: String,
}

impl EngineInfo {
    pub fn score_centipawns(&self) -> Option<i32> {
        match self.score {
            Some(Score::Centipawns(cp)) => Some(cp),
            _ => None,
        }
    }

    pub fn score_mate(&self) -> Option<i32> {
        match self.score {
            Some(Score::Mate(n)) => Some(n),
            _ => None,
        }
    }

    pub fn pv_moves(&self) -> Vec<&str> {
        self.pv.split_whitespace().collect()
    }

    /// Presentation text for the score, empty when there is none.
    pub fn score_text(&self) -> String {
        self.score.map(|s| s.score_text()).unwrap_or_default()
    }
}

/// Engine evaluation, from the side to move's point of view.
///
/// Mate: positive N = side to move mates in N,
/// negative N = side to move gets mated in N.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

impl Score {
    /// `#3` / `#-2` for mates, pawns with two decimals otherwise (`0.35`).
    pub fn score_text(&self) -> String {
        match self {
            Self::Centipawns(cp) => format!("{:.2}", *cp as f64 / 100.0),
            Self::Mate(n) => format!("#{}", n),
        }
    }

    /// Convert to centipawns for comparison. Mate scores use large values.
    pub fn to_cp(&self) -> i32 {
        match self {
            Self::Centipawns(cp) => *cp,
            Self::Mate(m) => {
                if *m > 0 {
                    30000 - *m * 100
                } else {
                    -30000 - *m * 100
                }
            }
        }
    }

    /// Negate the score (flip perspective).
    pub fn negate(&self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    /// Fill level of an evaluation bar in `[0, 1]`; 1 means the side whose
    /// perspective the score is in is winning. Centipawns saturate at ±300.
    pub fn bar_fraction(&self) -> f64 {
        match self {
            Self::Mate(m) => {
                if *m > 0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Centipawns(cp) => {
                let clamped = (*cp).clamp(-300, 300);
                (clamped + 300) as f64 / 600.0
            }
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.score_text())
    }
}

/// Terminal result of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BestMove {
    /// Coordinate move ("e2e4", "e7e8q"); `None` when the engine had no move.
    pub mv: Option<String>,
    pub ponder: Option<String>,
}
