use std::time::{Duration, Instant};

use chess::PieceColor;

/// Per-move clock: each move gets the same budget, counted down for the side
/// to move and reset whenever a move is played.
#[derive(Debug, Clone)]
pub struct MoveTimer {
    budget: Duration,
    remaining: Duration,
    active_side: Option<PieceColor>,
    last_tick: Instant,
}

/// Timer state for the front-end to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub budget_ms: u64,
    pub remaining_ms: u64,
    pub active_side: Option<PieceColor>,
}

impl MoveTimer {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            remaining: budget,
            active_side: None,
            last_tick: Instant::now(),
        }
    }

    /// Tick the timer, decrementing the active side's remaining time.
    /// Returns true if the flag has fallen.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;

        if self.active_side.is_none() {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        self.remaining.is_zero()
    }

    /// Start a fresh budget for `side`.
    pub fn start(&mut self, side: PieceColor) {
        self.remaining = self.budget;
        self.active_side = Some(side);
        self.last_tick = Instant::now();
    }

    pub fn stop(&mut self) {
        self.active_side = None;
    }

    pub fn is_active(&self) -> bool {
        self.active_side.is_some()
    }

    pub fn active_side(&self) -> Option<PieceColor> {
        self.active_side
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn to_snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            budget_ms: self.budget.as_millis() as u64,
            remaining_ms: self.remaining.as_millis() as u64,
            active_side: self.active_side,
        }
    }
}

/// `m:ss`, rounding up so a running clock never shows 0:00.
pub fn format_clock(ms: u64) -> String {
    let secs = ms.div_ceil(1000);
    format!("{}:{:02}", secs / 60, secs % 60)
}
