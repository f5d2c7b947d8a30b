//! Text for the play screen, derived from session snapshots only.

use chess::{format_square, rank_to_char, PieceColor};
use cozy_chess::{File, Rank, Square};
use session::{format_clock, GameMode, SessionPhase, SessionSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardCell {
    pub square: Square,
    /// FEN letter of the occupant, `.` when empty.
    pub glyph: char,
    pub dark: bool,
    pub last_move: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRow {
    pub label: char,
    pub cells: Vec<BoardCell>,
}

/// Rows top to bottom as the player sees them. `flipped` puts Black at the
/// bottom.
pub fn board_rows(snapshot: &SessionSnapshot, flipped: bool) -> Vec<BoardRow> {
    let last = snapshot.last_move.as_ref();
    let mut ranks: Vec<Rank> = Rank::ALL.to_vec();
    let mut files: Vec<File> = File::ALL.to_vec();
    if flipped {
        files.reverse();
    } else {
        ranks.reverse();
    }

    ranks
        .into_iter()
        .map(|rank| BoardRow {
            label: rank_to_char(rank),
            cells: files
                .iter()
                .map(|&file| {
                    let square = Square::new(file, rank);
                    let name = format_square(square);
                    BoardCell {
                        square,
                        glyph: snapshot
                            .piece_on(square)
                            .map_or('.', |p| p.fen_char()),
                        dark: (file as usize + rank as usize) % 2 == 0,
                        last_move: last.is_some_and(|(from, to)| *from == name || *to == name),
                    }
                })
                .collect(),
        })
        .collect()
}

pub fn file_labels(flipped: bool) -> String {
    let files = if flipped { "hgfedcba" } else { "abcdefgh" };
    files
        .chars()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether the board should start with Black at the bottom.
pub fn default_flip(mode: GameMode) -> bool {
    matches!(
        mode,
        GameMode::HumanVsComputer {
            human_side: PieceColor::Black
        }
    )
}

fn side_name(side: PieceColor) -> &'static str {
    match side {
        PieceColor::White => "White",
        PieceColor::Black => "Black",
    }
}

pub fn status_text(snapshot: &SessionSnapshot) -> String {
    match snapshot.phase {
        SessionPhase::Idle => "Type n to start a game".to_string(),
        SessionPhase::AwaitingHumanMove => {
            let check = if snapshot.in_check { " (check)" } else { "" };
            format!("{} to move{}", side_name(snapshot.side_to_move), check)
        }
        SessionPhase::AwaitingOpponentMove => "Computer thinking…".to_string(),
        SessionPhase::GameOver { outcome } => outcome.to_string(),
    }
}

/// Evaluation from White's point of view with the start of the main line.
pub fn eval_text(snapshot: &SessionSnapshot) -> Option<String> {
    let analysis = snapshot.analysis.as_ref()?;
    let score = analysis.white_score.map(|s| s.score_text())?;
    let depth = analysis
        .depth
        .map_or_else(|| "?".to_string(), |d| d.to_string());
    let line = analysis
        .pv
        .iter()
        .take(6)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    Some(format!("depth {} eval {}  {}", depth, score, line))
}

pub fn clock_text(snapshot: &SessionSnapshot) -> Option<String> {
    let timer = snapshot.timer?;
    match timer.active_side {
        Some(side) => Some(format!(
            "{} {}",
            side_name(side),
            format_clock(timer.remaining_ms)
        )),
        None => Some(format!("-- {}", format_clock(timer.budget_ms))),
    }
}

/// Moves in numbered pairs, most recent last.
pub fn move_list(snapshot: &SessionSnapshot) -> Vec<String> {
    let mut lines = Vec::new();
    let mut iter = snapshot.history.iter().peekable();
    let mut number = 1;
    if iter.peek().is_some_and(|m| m.color == PieceColor::Black) {
        if let Some(first) = iter.next() {
            lines.push(format!("{}. … {}", number, first.san));
            number += 1;
        }
    }
    while let Some(white) = iter.next() {
        match iter.next() {
            Some(black) => lines.push(format!("{}. {} {}", number, white.san, black.san)),
            None => lines.push(format!("{}. {}", number, white.san)),
        }
        number += 1;
    }
    lines
}
