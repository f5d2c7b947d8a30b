use cozy_chess::{Board, Color, GameStatus, Move, Piece, Square};

use crate::converters::format_square;
use crate::pgn::{self, format_san, parse_pgn, parse_san, GameResult};
use crate::types::{PieceColor, PieceKind, PlacedPiece};
use crate::uci::{convert_cozy_castling_to_uci, convert_uci_castling_to_cozy, format_uci_move, parse_uci_move};

/// Main game state wrapper around cozy-chess Board
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    history: Vec<HistoryEntry>,
    pgn_tags: Vec<(String, String)>,
    start_position: StartPosition,
    /// Position hashes from the start through the current position.
    seen: Vec<u64>,
}

/// Record of one played move
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub mv: Move,
    pub from: Square,
    pub to: Square,
    pub piece: Piece,             // Piece that made the move
    pub piece_color: Color,       // Color of the piece that moved
    pub captured: Option<Piece>,  // Captured piece, en passant included
    pub promotion: Option<Piece>, // Promotion piece if any
    pub san: String,              // Standard Algebraic Notation
    pub uci: String,              // Coordinate notation, castling as e1g1
    pub fen: String,              // FEN after this move
}

/// A legal move described for callers outside the rules engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LegalMove {
    /// The move as the rules engine plays it.
    pub mv: Move,
    pub from: Square,
    /// Destination in standard notation (castling lands on g/c file).
    pub to: Square,
    pub promotion: Option<PieceKind>,
    pub is_capture: bool,
    pub captured: Option<PieceKind>,
    pub san: String,
    pub uci: String,
}

/// Starting position of the game
#[derive(Debug, Clone)]
pub enum StartPosition {
    Standard,
    Fen(String),
}

/// Why a game is over, as far as the board alone can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Checkmate { winner: PieceColor },
    Draw(DrawReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    Stalemate,
    Repetition,
    FiftyMove,
    InsufficientMaterial,
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        Self::from_board(Board::default(), StartPosition::Standard)
    }

    /// Standard starting position with `side` to move first.
    pub fn with_first_mover(side: PieceColor) -> Self {
        match side {
            PieceColor::White => Self::new(),
            PieceColor::Black => {
                let board = crate::fen::standard_with_side_to_move(Color::Black);
                let fen = crate::fen::format_fen(&board);
                Self::from_board(board, StartPosition::Fen(fen))
            }
        }
    }

    /// Create a game from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position = crate::fen::parse_fen(fen)?;
        let normalized = crate::fen::format_fen(&position);
        Ok(Self::from_board(position, StartPosition::Fen(normalized)))
    }

    /// Load a game record. The `FEN` tag, if present, sets the start position.
    pub fn from_pgn(text: &str) -> Result<Self, GameError> {
        let record = parse_pgn(text).map_err(|e| GameError::InvalidRecord(e.to_string()))?;

        let mut game = match record.tag("FEN") {
            Some(fen) => Self::from_fen(fen)
                .map_err(|e| GameError::InvalidRecord(format!("bad FEN tag: {}", e)))?,
            None => Self::new(),
        };

        for (ply, pgn_move) in record.moves.iter().enumerate() {
            let mv = parse_san(&game.position, &pgn_move.san).map_err(|e| {
                GameError::InvalidRecord(format!("ply {}: {}", ply + 1, e))
            })?;
            game.make_move(mv)?;
        }

        game.pgn_tags = record
            .tags
            .into_iter()
            .filter(|(name, _)| name != "SetUp" && name != "FEN")
            .collect();
        if record.result != GameResult::Ongoing {
            game.set_tag("Result", record.result.as_pgn());
        }

        Ok(game)
    }

    fn from_board(position: Board, start_position: StartPosition) -> Self {
        let seen = vec![position.hash()];
        Self {
            position,
            history: Vec::new(),
            pgn_tags: Vec::new(),
            start_position,
            seen,
        }
    }

    /// Get the current board position
    pub fn position(&self) -> &Board {
        &self.position
    }

    /// Get the move history
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn start_position(&self) -> &StartPosition {
        &self.start_position
    }

    /// Make a move on the board
    pub fn make_move(&mut self, mv: Move) -> Result<HistoryEntry, GameError> {
        if !self.position.is_legal(mv) {
            return Err(GameError::IllegalMove);
        }

        let piece = self
            .position
            .piece_on(mv.from)
            .ok_or(GameError::IllegalMove)?;
        let piece_color = self
            .position
            .color_on(mv.from)
            .ok_or(GameError::IllegalMove)?;

        let captured = captured_piece(&self.position, mv);
        let san = format_san(&self.position, mv);
        let uci = format_uci_move(convert_cozy_castling_to_uci(&self.position, mv));

        self.position.play_unchecked(mv);
        self.seen.push(self.position.hash());

        let entry = HistoryEntry {
            mv,
            from: mv.from,
            to: mv.to,
            piece,
            piece_color,
            captured,
            promotion: mv.promotion,
            san,
            uci,
            fen: self.to_fen(),
        };

        self.history.push(entry.clone());

        Ok(entry)
    }

    /// Play a move given as squares. Castling may be given either way
    /// (e1g1 or e1h1). Returns `None` if the move is illegal.
    pub fn play(&mut self, from: Square, to: Square, promotion: Option<Piece>) -> Option<HistoryEntry> {
        let mv = convert_uci_castling_to_cozy(
            Move {
                from,
                to,
                promotion,
            },
            &self.legal_moves(),
        );
        self.make_move(mv).ok()
    }

    /// Resolve a coordinate move token ("e2e4", "e1g1", "e7e8q") to a legal move.
    pub fn find_uci_move(&self, token: &str) -> Option<Move> {
        let parsed = parse_uci_move(token)?;
        let legal = self.legal_moves();
        let mv = convert_uci_castling_to_cozy(parsed, &legal);
        legal.contains(&mv).then_some(mv)
    }

    /// Undo the last move
    pub fn undo(&mut self) -> Result<(), GameError> {
        if self.history.is_empty() {
            return Err(GameError::NothingToUndo);
        }

        self.history.pop();
        self.rebuild_position()?;

        Ok(())
    }

    /// Get all legal moves for the current position
    pub fn legal_moves(&self) -> Vec<Move> {
        pgn::san::legal_moves(&self.position)
    }

    /// Legal moves, optionally restricted to those leaving `from`, with
    /// capture and notation details.
    pub fn legal_moves_from(&self, from: Option<Square>) -> Vec<LegalMove> {
        self.legal_moves()
            .into_iter()
            .filter(|mv| from.map_or(true, |sq| mv.from == sq))
            .map(|mv| {
                let captured = captured_piece(&self.position, mv);
                let standard = convert_cozy_castling_to_uci(&self.position, mv);
                LegalMove {
                    mv,
                    from: mv.from,
                    to: standard.to,
                    promotion: mv.promotion.map(PieceKind::from),
                    is_capture: captured.is_some(),
                    captured: captured.map(PieceKind::from),
                    san: format_san(&self.position, mv),
                    uci: format_uci_move(standard),
                }
            })
            .collect()
    }

    /// Whether moving from `from` to `to` is a legal pawn promotion.
    pub fn is_promotion(&self, from: Square, to: Square) -> bool {
        self.legal_moves()
            .iter()
            .any(|mv| mv.from == from && mv.to == to && mv.promotion.is_some())
    }

    pub fn piece_at(&self, square: Square) -> Option<PlacedPiece> {
        let kind = self.position.piece_on(square)?;
        let color = self.position.color_on(square)?;
        Some(PlacedPiece {
            kind: kind.into(),
            color: color.into(),
            square,
        })
    }

    /// Get the current game status
    pub fn status(&self) -> GameStatus {
        self.position.status()
    }

    /// Get the side to move
    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn is_checkmate(&self) -> bool {
        matches!(self.termination(), Some(Termination::Checkmate { .. }))
    }

    pub fn is_draw(&self) -> bool {
        self.draw_reason().is_some()
    }

    pub fn draw_reason(&self) -> Option<DrawReason> {
        match self.termination() {
            Some(Termination::Draw(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Game-ending condition of the current position, if any.
    pub fn termination(&self) -> Option<Termination> {
        let in_check = !self.position.checkers().is_empty();
        if self.legal_moves().is_empty() {
            return Some(if in_check {
                Termination::Checkmate {
                    winner: PieceColor::from(!self.position.side_to_move()),
                }
            } else {
                Termination::Draw(DrawReason::Stalemate)
            });
        }
        if self.position.halfmove_clock() >= 100 {
            return Some(Termination::Draw(DrawReason::FiftyMove));
        }
        if self.repetition_count() >= 3 {
            return Some(Termination::Draw(DrawReason::Repetition));
        }
        if insufficient_material(&self.position) {
            return Some(Termination::Draw(DrawReason::InsufficientMaterial));
        }
        None
    }

    /// How many times the current position has occurred, this one included.
    pub fn repetition_count(&self) -> usize {
        let current = self.position.hash();
        self.seen.iter().filter(|&&h| h == current).count()
    }

    /// Export position to FEN string
    pub fn to_fen(&self) -> String {
        crate::fen::format_fen(&self.position)
    }

    pub fn tags(&self) -> &[(String, String)] {
        &self.pgn_tags
    }

    pub fn set_tag(&mut self, name: &str, value: &str) {
        match self.pgn_tags.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.pgn_tags.push((name.to_string(), value.to_string())),
        }
    }

    /// Result of the game: board termination first, then an explicit
    /// `Result` tag (resignation, flag fall), otherwise ongoing.
    pub fn result(&self) -> GameResult {
        match self.termination() {
            Some(Termination::Checkmate {
                winner: PieceColor::White,
            }) => GameResult::WhiteWins,
            Some(Termination::Checkmate {
                winner: PieceColor::Black,
            }) => GameResult::BlackWins,
            Some(Termination::Draw(_)) => GameResult::Draw,
            None => match self.pgn_tags.iter().find(|(k, _)| k == "Result") {
                Some((_, v)) if v == "1-0" => GameResult::WhiteWins,
                Some((_, v)) if v == "0-1" => GameResult::BlackWins,
                Some((_, v)) if v == "1/2-1/2" => GameResult::Draw,
                _ => GameResult::Ongoing,
            },
        }
    }

    /// Export the game record as PGN text.
    pub fn to_pgn(&self) -> String {
        let mut tags = self.pgn_tags.clone();
        let start = self.start_board();
        if let StartPosition::Fen(fen) = &self.start_position {
            tags.push(("SetUp".to_string(), "1".to_string()));
            tags.push(("FEN".to_string(), fen.clone()));
        }
        let sans: Vec<String> = self.history.iter().map(|e| e.san.clone()).collect();
        pgn::write_pgn(
            &tags,
            &sans,
            self.result(),
            start.fullmove_number(),
            start.side_to_move() == Color::Black,
        )
    }

    /// Last move as (from, to) square text, castling in standard form.
    pub fn last_move(&self) -> Option<(String, String)> {
        self.history.last().map(|e| {
            let to = &e.uci[2..4];
            (format_square(e.from), to.to_string())
        })
    }

    fn start_board(&self) -> Board {
        match &self.start_position {
            StartPosition::Standard => Board::default(),
            StartPosition::Fen(fen) => crate::fen::parse_fen(fen).unwrap_or_default(),
        }
    }

    /// Rebuild position from start + history (for undo)
    fn rebuild_position(&mut self) -> Result<(), GameError> {
        let mut board = match &self.start_position {
            StartPosition::Standard => Board::default(),
            StartPosition::Fen(fen) => crate::fen::parse_fen(fen)?,
        };
        let mut seen = vec![board.hash()];

        for entry in &self.history {
            if !board.is_legal(entry.mv) {
                return Err(GameError::IllegalMove);
            }
            board.play_unchecked(entry.mv);
            seen.push(board.hash());
        }

        self.position = board;
        self.seen = seen;
        Ok(())
    }
}

/// Piece removed by `mv`: the occupant of the target square, or the pawn
/// taken en passant. Castling (king onto own rook) captures nothing.
fn captured_piece(board: &Board, mv: Move) -> Option<Piece> {
    let side = board.side_to_move();
    if board.color_on(mv.to) == Some(!side) {
        return board.piece_on(mv.to);
    }
    let is_en_passant = board.piece_on(mv.from) == Some(Piece::Pawn)
        && mv.from.file() != mv.to.file()
        && board.piece_on(mv.to).is_none();
    is_en_passant.then_some(Piece::Pawn)
}

fn insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }

    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    let minors = knights.len() + bishops.len();
    if minors <= 1 {
        return true;
    }
    if !knights.is_empty() {
        return false;
    }

    // Bishops only: a draw when they all stand on one square colour.
    let mut shades = bishops
        .into_iter()
        .map(|sq| (sq.file() as usize + sq.rank() as usize) % 2);
    let first = shades.next();
    shades.all(|s| Some(s) == first)
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move")]
    IllegalMove,
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Invalid position: {0}")]
    InvalidPosition(#[from] crate::fen::FenError),
    #[error("Invalid game record: {0}")]
    InvalidRecord(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_all(game: &mut Game, moves: &[&str]) {
        for token in moves {
            let mv = game.find_uci_move(token).unwrap_or_else(|| panic!("illegal {}", token));
            game.make_move(mv).unwrap();
        }
    }

    #[test]
    fn test_make_move_and_undo() {
        let mut game = Game::new();
        let entry = game.play(Square::E2, Square::E4, None).unwrap();
        assert_eq!(entry.san, "e4");
        assert_eq!(entry.uci, "e2e4");
        assert_eq!(game.side_to_move(), Color::Black);

        game.undo().unwrap();
        assert_eq!(game.to_fen(), crate::fen::STANDARD_FEN);
        assert!(matches!(game.undo(), Err(GameError::NothingToUndo)));
    }

    #[test]
    fn test_illegal_move_returns_none() {
        let mut game = Game::new();
        assert!(game.play(Square::E2, Square::E5, None).is_none());
        assert!(game.history().is_empty());
    }

    #[test]
    fn test_castling_via_standard_notation() {
        let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let entry = game.play(Square::E1, Square::G1, None).unwrap();
        assert_eq!(entry.san, "O-O");
        assert_eq!(entry.uci, "e1g1");
        assert_eq!(entry.captured, None);
        assert_eq!(game.last_move(), Some(("e1".to_string(), "g1".to_string())));
    }

    #[test]
    fn test_en_passant_capture_is_reported() {
        let game = Game::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        let moves = game.legal_moves_from(Some(Square::E5));
        let ep = moves.iter().find(|m| m.uci == "e5d6").unwrap();
        assert!(ep.is_capture);
        assert_eq!(ep.captured, Some(PieceKind::Pawn));
        assert_eq!(ep.san, "exd6");
    }

    #[test]
    fn test_checkmate_detection() {
        let mut game = Game::new();
        play_all(&mut game, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert!(game.is_checkmate());
        assert_eq!(
            game.termination(),
            Some(Termination::Checkmate {
                winner: PieceColor::Black
            })
        );
        assert_eq!(game.result(), GameResult::BlackWins);
    }

    #[test]
    fn test_stalemate_and_insufficient_material() {
        let stalemate = Game::from_fen("k7/8/1QK5/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(stalemate.draw_reason(), Some(DrawReason::Stalemate));

        let bare = Game::from_fen("8/8/8/4k3/8/8/8/4KN2 w - - 0 1").unwrap();
        assert_eq!(bare.draw_reason(), Some(DrawReason::InsufficientMaterial));

        let rook = Game::from_fen("8/8/8/4k3/8/8/8/4KR2 w - - 0 1").unwrap();
        assert!(!rook.is_draw());
    }

    #[test]
    fn test_fifty_move_rule() {
        let game = Game::from_fen("8/8/8/4k3/8/8/8/R3K3 w - - 100 80").unwrap();
        assert_eq!(game.draw_reason(), Some(DrawReason::FiftyMove));
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new();
        play_all(
            &mut game,
            &["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"],
        );
        assert_eq!(game.repetition_count(), 3);
        assert_eq!(game.draw_reason(), Some(DrawReason::Repetition));

        game.undo().unwrap();
        assert!(!game.is_draw());
    }

    #[test]
    fn test_pgn_round_trip() {
        let mut game = Game::new();
        play_all(&mut game, &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]);
        game.set_tag("White", "Alice");
        let pgn = game.to_pgn();
        assert!(pgn.contains("[White \"Alice\"]"));
        assert!(pgn.contains("1. e4 e5 2. Nf3 Nc6 3. Bb5 *"));

        let loaded = Game::from_pgn(&pgn).unwrap();
        assert_eq!(loaded.to_fen(), game.to_fen());
        assert_eq!(loaded.history().len(), 5);
    }

    #[test]
    fn test_pgn_from_fen_start() {
        let mut game = Game::with_first_mover(PieceColor::Black);
        play_all(&mut game, &["e7e5", "e2e4"]);
        let pgn = game.to_pgn();
        assert!(pgn.contains("[SetUp \"1\"]"));
        assert!(pgn.contains("1... e5 2. e4"));
        let loaded = Game::from_pgn(&pgn).unwrap();
        assert_eq!(loaded.to_fen(), game.to_fen());
    }

    #[test]
    fn test_invalid_record_is_rejected() {
        assert!(matches!(
            Game::from_pgn("1. e4 e5 2. Ke3 Ke6 3. Qh8"),
            Err(GameError::InvalidRecord(_))
        ));
        assert!(matches!(
            Game::from_fen("garbage"),
            Err(GameError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_promotion_detection_and_piece_at() {
        let game = Game::from_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").unwrap();
        assert!(game.is_promotion(Square::E7, Square::E8));
        assert!(!game.is_promotion(Square::E1, Square::E2));
        let pawn = game.piece_at(Square::E7).unwrap();
        assert_eq!(pawn.kind, PieceKind::Pawn);
        assert_eq!(pawn.color, PieceColor::White);
        assert!(game.piece_at(Square::E4).is_none());
    }
}
