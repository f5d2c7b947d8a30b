use chess::{
    detect_opening, format_square, Game, HistoryEntry, LegalMove, PieceColor, PieceKind,
    StartPosition,
};
use cozy_chess::{Move, Square};
use engine::{AnalysisSubscription, BrokerHandle, EngineInfo};

use crate::commands::SessionError;
use crate::config::{EngineSettings, GameSetup, SessionConfig};
use crate::events::AnalysisUpdate;
use crate::snapshot::{EvalPoint, MoveRecord, SessionSnapshot};
use crate::starter::{resolve_starter, StarterStore};
use crate::timer::MoveTimer;
use crate::types::{GameOutcome, SessionPhase};

/// Internal mutable state, owned entirely by the session actor. No locks.
pub(crate) struct SessionState {
    pub session_id: String,
    pub game: Game,
    pub setup: GameSetup,
    pub engine_settings: EngineSettings,
    pub phase: SessionPhase,
    pub engine: Option<BrokerHandle>,
    pub engine_thinking: bool,
    /// Bumped on every position change; opponent replies carry the value they
    /// were requested under and are discarded when it no longer matches.
    pub turn: u64,
    pub analysis_on: bool,
    pub analysis_sub: Option<AnalysisSubscription>,
    pub analysis: Option<AnalysisUpdate>,
    pub eval_history: Vec<EvalPoint>,
    pub timer: Option<MoveTimer>,
    pub starter_store: Option<StarterStore>,
}

impl SessionState {
    pub fn new(session_id: String, config: SessionConfig, engine: Option<BrokerHandle>) -> Self {
        Self {
            session_id,
            game: Game::new(),
            setup: config.setup,
            engine_settings: config.engine,
            phase: SessionPhase::Idle,
            engine,
            engine_thinking: false,
            turn: 0,
            analysis_on: config.analyze,
            analysis_sub: None,
            analysis: None,
            eval_history: Vec::new(),
            timer: None,
            starter_store: config.data_dir.as_deref().map(StarterStore::new),
        }
    }

    /// Build a full snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let history: Vec<MoveRecord> = self
            .game
            .history()
            .iter()
            .map(history_entry_to_record)
            .collect();

        // A Black-first standard game starts from a FEN and is left unnamed.
        let opening = match self.game.start_position() {
            StartPosition::Standard => {
                let sans: Vec<&str> = history.iter().map(|m| m.san.as_str()).collect();
                detect_opening(&sans)
            }
            StartPosition::Fen(_) => None,
        };

        let pieces = self
            .game
            .position()
            .occupied()
            .into_iter()
            .filter_map(|sq| self.game.piece_at(sq))
            .collect();

        SessionSnapshot {
            session_id: self.session_id.clone(),
            fen: self.game.to_fen(),
            side_to_move: self.side_to_move(),
            phase: self.phase,
            mode: self.setup.mode,
            difficulty: self.setup.difficulty,
            move_count: history.len(),
            history,
            last_move: self.game.last_move(),
            in_check: !self.game.position().checkers().is_empty(),
            pieces,
            engine_available: self.engine.as_ref().is_some_and(BrokerHandle::is_ready),
            engine_thinking: self.engine_thinking,
            analysis_on: self.analysis_on,
            analysis: self.analysis.clone(),
            eval_history: self.eval_history.clone(),
            opening,
            timer: self.timer.as_ref().map(MoveTimer::to_snapshot),
        }
    }

    pub fn side_to_move(&self) -> PieceColor {
        PieceColor::from(self.game.side_to_move())
    }

    pub fn opponent_to_move(&self) -> bool {
        self.phase == SessionPhase::AwaitingOpponentMove
    }

    pub fn in_play(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::AwaitingHumanMove | SessionPhase::AwaitingOpponentMove
        )
    }

    pub fn timer_active(&self) -> bool {
        self.timer.as_ref().is_some_and(MoveTimer::is_active)
    }

    /// Start a game from the standard position, the starter chosen by the
    /// setup's policy.
    pub fn new_game(&mut self, setup: Option<GameSetup>) {
        if let Some(setup) = setup {
            self.setup = setup;
        }
        let starter = resolve_starter(self.setup.starter, self.starter_store.as_ref());
        tracing::info!(mode = ?self.setup.mode, ?starter, "New game");
        self.start(Game::with_first_mover(starter));
    }

    /// Replace the game with a position. State is untouched on error.
    pub fn load_fen(&mut self, fen: &str) -> Result<(), SessionError> {
        let game =
            Game::from_fen(fen).map_err(|e| SessionError::InvalidPosition(e.to_string()))?;
        tracing::info!("Loaded position {}", fen);
        self.start(game);
        Ok(())
    }

    /// Replace the game with a recorded one. State is untouched on error.
    pub fn load_pgn(&mut self, pgn: &str) -> Result<(), SessionError> {
        let game = Game::from_pgn(pgn).map_err(|e| SessionError::InvalidRecord(e.to_string()))?;
        tracing::info!(plies = game.history().len(), "Loaded game record");
        self.start(game);
        Ok(())
    }

    fn start(&mut self, game: Game) {
        self.game = game;
        self.eval_history.clear();
        self.analysis = None;
        self.timer = self.setup.move_timer.map(MoveTimer::new);
        self.position_changed();
    }

    /// A move from the human side of the board.
    pub fn submit_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Idle => return Err(SessionError::NoGame),
            SessionPhase::GameOver { .. } => return Err(SessionError::GameOver),
            SessionPhase::AwaitingOpponentMove => return Err(SessionError::NotYourTurn),
            SessionPhase::AwaitingHumanMove => {}
        }
        if promotion.is_none() && self.game.is_promotion(from, to) {
            return Err(SessionError::PromotionRequired);
        }

        let entry = self
            .game
            .play(from, to, promotion.map(Into::into))
            .ok_or_else(|| {
                SessionError::IllegalMove(format!("{}{}", format_square(from), format_square(to)))
            })?;
        tracing::debug!(san = %entry.san, "Human move");
        self.position_changed();
        Ok(())
    }

    /// A move chosen by the engine or the built-in opponent, already matched
    /// against the legal moves.
    pub fn apply_opponent_move(&mut self, mv: Move) -> Result<(), SessionError> {
        if !self.opponent_to_move() {
            return Err(SessionError::NotYourTurn);
        }
        let entry = self
            .game
            .make_move(mv)
            .map_err(|e| SessionError::Internal(format!("opponent move rejected: {}", e)))?;
        tracing::debug!(san = %entry.san, "Opponent move");
        self.position_changed();
        Ok(())
    }

    /// Take back the last move. Against the computer, take back as many plies
    /// as it takes for the human to be on move again.
    pub fn undo(&mut self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Idle {
            return Err(SessionError::NoGame);
        }
        let plies = self.plies_to_undo();
        if plies == 0 || self.game.history().len() < plies {
            return Err(SessionError::NothingToUndo);
        }
        for _ in 0..plies {
            self.game
                .undo()
                .map_err(|e| SessionError::Internal(e.to_string()))?;
        }
        if self.game.tags().iter().any(|(name, _)| name == "Result") {
            self.game.set_tag("Result", "*");
        }
        let remaining = self.game.history().len();
        self.eval_history.retain(|p| p.ply <= remaining);
        tracing::debug!(plies, "Undo");
        self.position_changed();
        Ok(())
    }

    fn plies_to_undo(&self) -> usize {
        let Some(last) = self.game.history().last() else {
            return 0;
        };
        let last_mover = PieceColor::from(last.piece_color);
        if self.setup.mode.is_human(last_mover) {
            1
        } else {
            2
        }
    }

    fn position_changed(&mut self) {
        self.turn += 1;
        self.engine_thinking = false;
        self.analysis = None;
        self.phase = match self.game.termination() {
            Some(termination) => {
                let outcome = GameOutcome::from(termination);
                tracing::info!("Game over: {}", outcome);
                SessionPhase::GameOver { outcome }
            }
            None if self.setup.mode.is_human(self.side_to_move()) => {
                SessionPhase::AwaitingHumanMove
            }
            None => SessionPhase::AwaitingOpponentMove,
        };
        self.sync_timer();
    }

    /// The clock runs for a human on move and restarts with every move.
    fn sync_timer(&mut self) {
        let side = self.side_to_move();
        let human_on_move = self.phase == SessionPhase::AwaitingHumanMove;
        if let Some(timer) = self.timer.as_mut() {
            if human_on_move {
                timer.start(side);
            } else {
                timer.stop();
            }
        }
    }

    /// Tick the clock and return true if a flag fell.
    pub fn tick_timer(&mut self) -> bool {
        let Some(timer) = self.timer.as_mut() else {
            return false;
        };
        if !timer.tick() {
            return false;
        }
        let Some(loser) = timer.active_side() else {
            return false;
        };
        timer.stop();

        let outcome = GameOutcome::flag_fall(loser);
        let result = match loser {
            PieceColor::White => "0-1",
            PieceColor::Black => "1-0",
        };
        self.game.set_tag("Result", result);
        self.phase = SessionPhase::GameOver { outcome };
        self.turn += 1;
        self.engine_thinking = false;
        self.analysis = None;
        tracing::info!("Game over: {}", outcome);
        true
    }

    /// Fold an engine evaluation of the current position into the session.
    pub fn record_analysis(&mut self, info: EngineInfo) -> AnalysisUpdate {
        let ply = self.game.history().len();
        let side_to_move = self.side_to_move();
        let white_score = info.score.map(|s| match side_to_move {
            PieceColor::White => s,
            PieceColor::Black => s.negate(),
        });

        if info.multipv.unwrap_or(1) == 1 {
            if let Some(score) = white_score {
                match self.eval_history.iter_mut().find(|p| p.ply == ply) {
                    Some(point) => point.score = score,
                    None => self.eval_history.push(EvalPoint { ply, score }),
                }
            }
        }

        let update = AnalysisUpdate {
            ply,
            side_to_move,
            depth: info.depth,
            multipv: info.multipv,
            score: info.score,
            white_score,
            score_text: info.score_text(),
            pv: info.pv_moves().into_iter().map(str::to_string).collect(),
        };
        if update.multipv.unwrap_or(1) == 1 {
            self.analysis = Some(update.clone());
        }
        update
    }

    pub fn legal_moves(&self, from: Option<Square>) -> Vec<LegalMove> {
        if !self.in_play() {
            return Vec::new();
        }
        self.game.legal_moves_from(from)
    }
}

fn history_entry_to_record(entry: &HistoryEntry) -> MoveRecord {
    MoveRecord {
        san: entry.san.clone(),
        uci: entry.uci.clone(),
        color: entry.piece_color.into(),
        fen_after: entry.fen.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starter::StarterPolicy;
    use crate::types::{EndReason, GameMode};
    use engine::Score;

    fn hvh_state() -> SessionState {
        let config = SessionConfig {
            setup: GameSetup {
                mode: GameMode::HumanVsHuman,
                ..GameSetup::default()
            },
            ..SessionConfig::default()
        };
        let mut state = SessionState::new("test".to_string(), config, None);
        state.new_game(None);
        state
    }

    #[test]
    fn test_idle_until_new_game() {
        let mut state = SessionState::new("test".to_string(), SessionConfig::default(), None);
        assert_eq!(state.phase, SessionPhase::Idle);
        assert_eq!(
            state.submit_move(Square::E2, Square::E4, None),
            Err(SessionError::NoGame)
        );
        assert!(state.legal_moves(None).is_empty());
    }

    #[test]
    fn test_moves_hand_over_between_humans() {
        let mut state = hvh_state();
        assert_eq!(state.phase, SessionPhase::AwaitingHumanMove);
        state.submit_move(Square::E2, Square::E4, None).unwrap();
        assert_eq!(state.side_to_move(), PieceColor::Black);
        assert_eq!(state.phase, SessionPhase::AwaitingHumanMove);

        let snap = state.snapshot();
        assert_eq!(snap.move_count, 1);
        assert_eq!(snap.last_move, Some(("e2".to_string(), "e4".to_string())));
        assert_eq!(snap.pieces.len(), 32);
        assert_eq!(snap.opening.as_deref(), Some("B00 · King's Pawn Opening"));
    }

    #[test]
    fn test_illegal_move_keeps_phase() {
        let mut state = hvh_state();
        let turn = state.turn;
        let err = state.submit_move(Square::E2, Square::E5, None).unwrap_err();
        assert_eq!(err, SessionError::IllegalMove("e2e5".to_string()));
        assert_eq!(state.phase, SessionPhase::AwaitingHumanMove);
        assert_eq!(state.turn, turn);
    }

    #[test]
    fn test_promotion_requires_piece() {
        let mut state = hvh_state();
        state.load_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        assert_eq!(
            state.submit_move(Square::A7, Square::A8, None),
            Err(SessionError::PromotionRequired)
        );
        state
            .submit_move(Square::A7, Square::A8, Some(PieceKind::Knight))
            .unwrap();
        assert_eq!(state.game.history()[0].san, "a8=N");
    }

    #[test]
    fn test_undo_takes_back_both_plies_against_computer() {
        let config = SessionConfig::default();
        let mut state = SessionState::new("test".to_string(), config, None);
        state.new_game(None);
        state.submit_move(Square::E2, Square::E4, None).unwrap();
        assert!(state.opponent_to_move());
        let reply = state.game.find_uci_move("e7e5").unwrap();
        state.apply_opponent_move(reply).unwrap();

        state.undo().unwrap();
        assert_eq!(state.game.history().len(), 0);
        assert_eq!(state.phase, SessionPhase::AwaitingHumanMove);
        assert_eq!(state.undo(), Err(SessionError::NothingToUndo));
    }

    #[test]
    fn test_undo_while_opponent_thinks_takes_one_ply() {
        let mut state = SessionState::new("test".to_string(), SessionConfig::default(), None);
        state.new_game(None);
        state.submit_move(Square::D2, Square::D4, None).unwrap();
        state.engine_thinking = true;
        let turn = state.turn;

        state.undo().unwrap();
        assert_eq!(state.game.history().len(), 0);
        assert!(!state.engine_thinking);
        assert!(state.turn > turn);
    }

    #[test]
    fn test_invalid_inputs_leave_game_untouched() {
        let mut state = hvh_state();
        state.submit_move(Square::G1, Square::F3, None).unwrap();
        let fen = state.game.to_fen();

        assert!(matches!(
            state.load_fen("not a fen"),
            Err(SessionError::InvalidPosition(_))
        ));
        assert!(matches!(
            state.load_pgn("1. e4 Ke3"),
            Err(SessionError::InvalidRecord(_))
        ));
        assert_eq!(state.game.to_fen(), fen);
        assert_eq!(state.game.history().len(), 1);
    }

    #[test]
    fn test_checkmate_ends_game() {
        let mut state = hvh_state();
        for (from, to) in [
            (Square::F2, Square::F3),
            (Square::E7, Square::E5),
            (Square::G2, Square::G4),
            (Square::D8, Square::H4),
        ] {
            state.submit_move(from, to, None).unwrap();
        }
        match state.phase {
            SessionPhase::GameOver { outcome } => {
                assert_eq!(outcome.reason, EndReason::Checkmate);
                assert_eq!(outcome.winner, Some(PieceColor::Black));
            }
            other => panic!("expected game over, got {:?}", other),
        }
        assert_eq!(
            state.submit_move(Square::A2, Square::A3, None),
            Err(SessionError::GameOver)
        );
    }

    #[test]
    fn test_black_starter_in_standard_position() {
        let config = SessionConfig {
            setup: GameSetup {
                mode: GameMode::HumanVsHuman,
                starter: StarterPolicy::Fixed(PieceColor::Black),
                ..GameSetup::default()
            },
            ..SessionConfig::default()
        };
        let mut state = SessionState::new("test".to_string(), config, None);
        state.new_game(None);
        assert_eq!(state.side_to_move(), PieceColor::Black);
        state.submit_move(Square::E7, Square::E5, None).unwrap();
        assert_eq!(state.side_to_move(), PieceColor::White);
        state.submit_move(Square::E2, Square::E4, None).unwrap();
        assert_eq!(state.snapshot().opening, None);
    }

    #[test]
    fn test_eval_history_keeps_latest_per_ply() {
        let mut state = hvh_state();
        let info = |depth, cp| EngineInfo {
            depth: Some(depth),
            score: Some(Score::Centipawns(cp)),
            pv: "e2e4 e7e5".to_string(),
            ..Default::default()
        };
        state.record_analysis(info(5, 20));
        state.record_analysis(info(9, 35));
        assert_eq!(state.eval_history.len(), 1);
        assert_eq!(state.eval_history[0].score, Score::Centipawns(35));

        state.submit_move(Square::E2, Square::E4, None).unwrap();
        let update = state.record_analysis(info(6, 40));
        assert_eq!(update.ply, 1);
        // Black to move: White's view is negated.
        assert_eq!(update.white_score, Some(Score::Centipawns(-40)));
        assert_eq!(update.score_text, "0.40");
        assert_eq!(state.eval_history.len(), 2);

        state.new_game(None);
        assert!(state.eval_history.is_empty());
    }

    #[test]
    fn test_flag_fall_sets_result() {
        let config = SessionConfig {
            setup: GameSetup {
                mode: GameMode::HumanVsHuman,
                move_timer: Some(std::time::Duration::from_millis(10)),
                ..GameSetup::default()
            },
            ..SessionConfig::default()
        };
        let mut state = SessionState::new("test".to_string(), config, None);
        state.new_game(None);
        assert!(state.timer_active());
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(state.tick_timer());
        assert_eq!(
            state.phase,
            SessionPhase::GameOver {
                outcome: GameOutcome::flag_fall(PieceColor::White)
            }
        );
        assert!(state.game.to_pgn().contains("[Result \"0-1\"]"));
        assert!(!state.timer_active());
    }
}
