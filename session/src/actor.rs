use engine::{
    AnalysisRequest, AnalysisSubscription, BestMoveRequest, BrokerHandle, EngineError, EngineInfo,
};
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::Instrument;

use crate::commands::{SessionCommand, SessionError};
use crate::events::SessionEvent;
use crate::policy;
use crate::state::SessionState;

/// Answer to one opponent best-move request, tagged with the turn it was
/// requested for.
pub(crate) struct OpponentReply {
    turn: u64,
    result: Result<Option<String>, EngineError>,
}

struct Actor {
    state: SessionState,
    event_tx: broadcast::Sender<SessionEvent>,
    reply_tx: mpsc::Sender<OpponentReply>,
}

/// The main session actor loop.
/// Owns all mutable state. Processes commands, opponent replies, analysis
/// updates and clock ticks sequentially.
pub(crate) async fn run_session_actor(
    state: SessionState,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    let session_id = state.session_id.clone();
    run_session_actor_inner(state, cmd_rx, event_tx)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await;
}

async fn run_session_actor_inner(
    state: SessionState,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    tracing::info!("Session actor started");

    let (reply_tx, mut reply_rx) = mpsc::channel(8);
    let mut actor = Actor {
        state,
        event_tx,
        reply_tx,
    };

    let mut timer_interval = time::interval(time::Duration::from_millis(100));
    timer_interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    let mut done = None;
    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown { reply }) => {
                        done = Some(reply);
                        break;
                    }
                    None => break,
                    Some(cmd) => actor.handle_command(cmd).await,
                }
            }

            Some(reply) = reply_rx.recv() => {
                actor.handle_opponent_reply(reply).await;
            }

            update = next_analysis(&mut actor.state.analysis_sub), if actor.state.analysis_sub.is_some() => {
                match update {
                    Some(info) => actor.forward_analysis(info),
                    // Superseded, or the engine went away.
                    None => actor.state.analysis_sub = None,
                }
            }

            _ = timer_interval.tick(), if actor.state.timer_active() => {
                if actor.state.tick_timer() {
                    actor.state.analysis_sub = None;
                    actor.broadcast_state();
                }
            }
        }
    }

    tracing::info!("Session actor shutting down");
    actor.state.analysis_sub = None;
    if let Some(engine) = actor.state.engine.take() {
        engine.shutdown().await;
    }
    if let Some(reply) = done {
        let _ = reply.send(());
    }
    tracing::info!("Session actor exited");
}

async fn next_analysis(sub: &mut Option<AnalysisSubscription>) -> Option<EngineInfo> {
    match sub.as_mut() {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

impl Actor {
    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::NewGame { setup, reply } => {
                self.abandon_opponent_search().await;
                self.state.new_game(setup);
                self.broadcast_state();
                let _ = reply.send(Ok(self.state.snapshot()));
                self.advance().await;
            }
            SessionCommand::SubmitMove {
                from,
                to,
                promotion,
                reply,
            } => {
                let result = self.state.submit_move(from, to, promotion);
                self.reply_and_advance(result, reply).await;
            }
            SessionCommand::Undo { reply } => {
                let thinking = self.state.engine_thinking;
                let result = self.state.undo();
                if result.is_ok() && thinking {
                    self.stop_engine().await;
                }
                self.reply_and_advance(result, reply).await;
            }
            SessionCommand::LoadFen { fen, reply } => {
                let thinking = self.state.engine_thinking;
                let result = self.state.load_fen(&fen);
                if result.is_ok() && thinking {
                    self.stop_engine().await;
                }
                self.reply_and_advance(result, reply).await;
            }
            SessionCommand::LoadPgn { pgn, reply } => {
                let thinking = self.state.engine_thinking;
                let result = self.state.load_pgn(&pgn);
                if result.is_ok() && thinking {
                    self.stop_engine().await;
                }
                self.reply_and_advance(result, reply).await;
            }
            SessionCommand::ExportPgn { reply } => {
                let result = if self.state.phase == crate::SessionPhase::Idle {
                    Err(SessionError::NoGame)
                } else {
                    Ok(self.state.game.to_pgn())
                };
                let _ = reply.send(result);
            }
            SessionCommand::SetAnalysis { enabled, reply } => {
                tracing::debug!(enabled, "Live analysis toggled");
                self.state.analysis_on = enabled;
                self.refresh_analysis().await;
                self.broadcast_state();
                let _ = reply.send(Ok(self.state.snapshot()));
            }
            SessionCommand::GetSnapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
            SessionCommand::GetLegalMoves { from, reply } => {
                let _ = reply.send(self.state.legal_moves(from));
            }
            SessionCommand::Subscribe { reply } => {
                let snapshot = self.state.snapshot();
                let rx = self.event_tx.subscribe();
                let _ = reply.send((snapshot, rx));
            }
            SessionCommand::Shutdown { .. } => unreachable!(),
        }
    }

    async fn reply_and_advance(
        &mut self,
        result: Result<(), SessionError>,
        reply: tokio::sync::oneshot::Sender<Result<crate::SessionSnapshot, SessionError>>,
    ) {
        match result {
            Ok(()) => {
                self.broadcast_state();
                let _ = reply.send(Ok(self.state.snapshot()));
                self.advance().await;
            }
            Err(e) => {
                tracing::debug!("Rejected: {}", e);
                let _ = reply.send(Err(e));
            }
        }
    }

    /// Let the opponent move while it is on move, then restart analysis for
    /// the resulting position.
    async fn advance(&mut self) {
        while self.state.opponent_to_move() && !self.state.engine_thinking {
            if let Some(engine) = self.available_engine() {
                self.request_engine_move(engine);
                self.broadcast_state();
                break;
            }
            if !self.play_fallback_move() {
                break;
            }
        }
        self.refresh_analysis().await;
    }

    fn request_engine_move(&mut self, engine: BrokerHandle) {
        // One process serves both; the best-move search replaces the analysis.
        self.state.analysis_sub = None;
        self.state.analysis = None;

        let settings = self.state.engine_settings;
        let request = BestMoveRequest::new(
            self.state.game.to_fen(),
            settings.depth,
            settings.movetime_ms,
        );
        let turn = self.state.turn;
        let reply_tx = self.reply_tx.clone();
        self.state.engine_thinking = true;
        tracing::debug!(turn, "Requesting engine move");

        tokio::spawn(async move {
            let result = engine.request_best_move(request, settings.timeout).await;
            let _ = reply_tx.send(OpponentReply { turn, result }).await;
        });
    }

    /// Returns false when the built-in opponent had nothing to play.
    fn play_fallback_move(&mut self) -> bool {
        let Some(mv) = policy::choose_move(&self.state.game, self.state.setup.difficulty) else {
            tracing::warn!("Opponent on move without a legal move");
            return false;
        };
        match self.state.apply_opponent_move(mv) {
            Ok(()) => {
                self.broadcast_state();
                true
            }
            Err(e) => {
                tracing::error!("Failed to apply fallback move: {}", e);
                let _ = self.event_tx.send(SessionEvent::Error(e.to_string()));
                false
            }
        }
    }

    async fn handle_opponent_reply(&mut self, reply: OpponentReply) {
        if reply.turn != self.state.turn || !self.state.opponent_to_move() {
            tracing::debug!(turn = reply.turn, current = self.state.turn, "Discarding stale engine reply");
            return;
        }
        self.state.engine_thinking = false;

        let engine_move = match reply.result {
            Ok(Some(uci)) => {
                let mv = self.state.game.find_uci_move(&uci);
                if mv.is_none() {
                    tracing::warn!("Engine suggested illegal move {}, using fallback", uci);
                }
                mv
            }
            Ok(None) => {
                tracing::warn!("Engine returned no move, using fallback");
                None
            }
            Err(e) if e.is_fatal() => {
                self.disable_engine(&e);
                None
            }
            Err(e) => {
                tracing::warn!("Engine move failed ({}), using fallback", e);
                None
            }
        };

        match engine_move {
            Some(mv) => match self.state.apply_opponent_move(mv) {
                Ok(()) => self.broadcast_state(),
                Err(e) => {
                    tracing::error!("Failed to apply engine move: {}", e);
                    self.play_fallback_move();
                }
            },
            None => {
                self.play_fallback_move();
            }
        }
        self.advance().await;
    }

    /// Re-issue analysis for the current position, or stop it when it is off
    /// or nothing is left to analyse.
    async fn refresh_analysis(&mut self) {
        self.state.analysis_sub = None;
        self.state.analysis = None;
        if !self.state.analysis_on || self.state.engine_thinking || !self.state.in_play() {
            return;
        }
        let Some(engine) = self.available_engine() else {
            return;
        };

        let settings = self.state.engine_settings;
        let request = AnalysisRequest::new(
            self.state.game.to_fen(),
            settings.analysis_depth,
            settings.analysis_multipv,
        );
        match engine.analyze(request).await {
            Ok(sub) => {
                tracing::debug!(id = %sub.id(), "Analysis started");
                self.state.analysis_sub = Some(sub);
            }
            Err(e) if e.is_fatal() => self.disable_engine(&e),
            Err(e) => tracing::debug!("Analysis not started: {}", e),
        }
    }

    fn forward_analysis(&mut self, info: EngineInfo) {
        let update = self.state.record_analysis(info);
        let _ = self.event_tx.send(SessionEvent::Analysis(update));
    }

    /// The engine if it can take a request now. A dead engine is dropped for
    /// the rest of the session.
    fn available_engine(&mut self) -> Option<BrokerHandle> {
        let engine = self.state.engine.as_ref()?;
        if engine.is_ready() {
            return Some(engine.clone());
        }
        if engine.status().dead {
            self.disable_engine(&EngineError::ProcessDead);
        }
        None
    }

    fn disable_engine(&mut self, error: &EngineError) {
        let Some(engine) = self.state.engine.take() else {
            return;
        };
        tracing::error!("Engine disabled for this session: {}", error);
        self.state.analysis_sub = None;
        self.state.analysis = None;
        self.state.engine_thinking = false;
        let _ = self.event_tx.send(SessionEvent::Error(format!(
            "Engine unavailable ({}), using the built-in opponent",
            error
        )));
        tokio::spawn(async move {
            engine.shutdown().await;
        });
    }

    async fn abandon_opponent_search(&mut self) {
        if self.state.engine_thinking {
            self.stop_engine().await;
        }
    }

    async fn stop_engine(&mut self) {
        if let Some(engine) = self.state.engine.as_ref() {
            if let Err(e) = engine.stop_all().await {
                tracing::debug!("stop_all failed: {}", e);
            }
        }
    }

    fn broadcast_state(&self) {
        let _ = self
            .event_tx
            .send(SessionEvent::StateChanged(self.state.snapshot()));
    }
}
