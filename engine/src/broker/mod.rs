//! Single-process request broker.
//!
//! One actor task owns the [`EngineAdapter`](crate::EngineAdapter) and
//! multiplexes best-move requests and streaming analysis onto it. At most one
//! request is live at a time; starting a new one supersedes the previous one,
//! and output still arriving from a superseded search is dropped.

mod actor;
mod commands;
mod handle;

pub use handle::{AnalysisSubscription, BrokerHandle};

use crate::RequestId;

/// Upper bound for MultiPV lines in an analysis request.
pub const MAX_MULTIPV: u8 = 4;

/// Streaming evaluation of one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub fen: String,
    pub depth: u32,
    pub multipv: u8,
}

impl AnalysisRequest {
    /// Depth is at least 1; MultiPV is clamped to `1..=4`.
    pub fn new(fen: impl Into<String>, depth: u32, multipv: u8) -> Self {
        Self {
            fen: fen.into(),
            depth: depth.max(1),
            multipv: multipv.clamp(1, MAX_MULTIPV),
        }
    }
}

/// One-shot move choice for a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMoveRequest {
    pub fen: String,
    pub depth: u32,
    /// When set, the search is bounded by time instead of depth.
    pub movetime_ms: Option<u64>,
}

impl BestMoveRequest {
    pub fn new(fen: impl Into<String>, depth: u32, movetime_ms: Option<u64>) -> Self {
        Self {
            fen: fen.into(),
            depth: depth.max(1),
            movetime_ms,
        }
    }
}

/// Broker state visible to handles and subscriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStatus {
    pub ready: bool,
    pub dead: bool,
    /// The only request whose output is still delivered.
    pub live: Option<RequestId>,
    /// A search is still running, or its output is still being handed over.
    pub searching: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_request_clamps() {
        let req = AnalysisRequest::new("fen", 0, 9);
        assert_eq!(req.depth, 1);
        assert_eq!(req.multipv, 4);

        let req = AnalysisRequest::new("fen", 18, 0);
        assert_eq!(req.depth, 18);
        assert_eq!(req.multipv, 1);
    }

    #[test]
    fn test_best_move_request_keeps_movetime() {
        let req = BestMoveRequest::new("fen", 12, Some(800));
        assert_eq!(req.movetime_ms, Some(800));
        assert_eq!(BestMoveRequest::new("fen", 0, None).depth, 1);
    }
}
