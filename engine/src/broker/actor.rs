use std::collections::VecDeque;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;

use super::commands::BrokerCommand;
use super::{AnalysisRequest, BestMoveRequest, BrokerStatus};
use crate::uci::{GoParams, UciCommand};
use crate::{BestMove, EngineAdapter, EngineError, EngineEvent, EngineInfo, RequestId};

/// Buffered analysis updates per subscription.
pub(crate) const UPDATE_BUFFER: usize = 64;

/// Updates held by the broker while a subscription's buffer is full. Past this
/// the oldest held update is evicted; the newest is always kept.
const BACKLOG_LIMIT: usize = 64;

struct AnalysisSink {
    tx: mpsc::Sender<EngineInfo>,
    /// Waiting for buffer space, oldest first.
    backlog: VecDeque<EngineInfo>,
}

enum LiveKind {
    Analysis(AnalysisSink),
    BestMove(oneshot::Sender<Result<Option<String>, EngineError>>),
}

struct LiveRequest {
    id: RequestId,
    kind: LiveKind,
}

struct BrokerState {
    adapter: EngineAdapter,
    live: Option<LiveRequest>,
    /// Searches sent with `go` that have not answered `bestmove` yet, oldest
    /// first. Engine output always belongs to the head.
    in_flight: VecDeque<RequestId>,
    status_tx: watch::Sender<BrokerStatus>,
    death_logged: bool,
}

/// The broker actor loop.
/// Owns the adapter. Processes commands and engine events sequentially.
pub(crate) async fn run_broker(
    adapter: EngineAdapter,
    cmd_rx: mpsc::Receiver<BrokerCommand>,
    status_tx: watch::Sender<BrokerStatus>,
) {
    let state = BrokerState {
        adapter,
        live: None,
        in_flight: VecDeque::new(),
        status_tx,
        death_logged: false,
    };
    run_broker_inner(state, cmd_rx)
        .instrument(tracing::info_span!("broker"))
        .await;
}

async fn run_broker_inner(mut state: BrokerState, mut cmd_rx: mpsc::Receiver<BrokerCommand>) {
    tracing::info!("Broker actor started");
    state.publish_status();

    let mut done = None;
    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(BrokerCommand::Shutdown { reply }) => {
                        done = Some(reply);
                        break;
                    }
                    None => break,
                    Some(cmd) => handle_command(&mut state, cmd).await,
                }
            }

            permit = reserve_slot(state.backlog_sender()), if state.has_backlog() => {
                state.flush_backlog(permit).await;
            }

            Some(event) = state.adapter.recv_event(), if state.adapter.has_events() => {
                handle_engine_event(&mut state, event).await;
            }
        }
        state.publish_status();
    }

    tracing::info!("Broker actor shutting down");
    state.live = None;
    state.publish_status();
    state.adapter.shutdown().await;
    if let Some(reply) = done {
        let _ = reply.send(());
    }
    tracing::info!("Broker actor exited");
}

/// Waits for buffer space in a lagging subscription. `None` when it closed.
async fn reserve_slot(
    tx: Option<mpsc::Sender<EngineInfo>>,
) -> Option<mpsc::OwnedPermit<EngineInfo>> {
    match tx {
        Some(tx) => tx.reserve_owned().await.ok(),
        None => std::future::pending().await,
    }
}

async fn handle_command(state: &mut BrokerState, cmd: BrokerCommand) {
    match cmd {
        BrokerCommand::Analyze {
            request,
            updates,
            reply,
        } => {
            state.supersede();
            match state.start_analysis(&request).await {
                Ok(id) => {
                    tracing::debug!(%id, depth = request.depth, multipv = request.multipv, "Analysis started");
                    state.live = Some(LiveRequest {
                        id,
                        kind: LiveKind::Analysis(AnalysisSink {
                            tx: updates,
                            backlog: VecDeque::new(),
                        }),
                    });
                    state.publish_status();
                    if reply.send(Ok(id)).is_err() {
                        state.cancel(id).await;
                    }
                }
                Err(e) => {
                    state.publish_status();
                    let _ = reply.send(Err(e));
                }
            }
        }
        BrokerCommand::BestMove {
            request,
            started,
            reply,
        } => {
            state.supersede();
            match state.start_best_move(&request).await {
                Ok(id) => {
                    tracing::debug!(%id, depth = request.depth, movetime = ?request.movetime_ms, "Best-move search started");
                    state.live = Some(LiveRequest {
                        id,
                        kind: LiveKind::BestMove(reply),
                    });
                    state.publish_status();
                    // Caller already gave up.
                    if started.send(Ok(id)).is_err() {
                        state.cancel(id).await;
                    }
                }
                Err(e) => {
                    state.publish_status();
                    let _ = started.send(Err(e));
                }
            }
        }
        BrokerCommand::Cancel { id } => state.cancel(id).await,
        BrokerCommand::StopAll { reply } => {
            state.supersede();
            state.publish_status();
            if !state.adapter.is_dead() {
                if let Err(e) = state.adapter.stop().await {
                    tracing::debug!("stop failed: {}", e);
                }
            }
            let _ = reply.send(());
        }
        BrokerCommand::Shutdown { .. } => unreachable!(),
    }
}

async fn handle_engine_event(state: &mut BrokerState, event: EngineEvent) {
    match event {
        EngineEvent::Info(info) => state.deliver_info(info).await,
        EngineEvent::BestMove(best) => state.resolve_best_move(best),
        EngineEvent::Ready => {
            tracing::debug!("Engine ready");
        }
        EngineEvent::Error(msg) => state.fail_all(&msg),
    }
}

impl AnalysisSink {
    fn hold(&mut self, info: EngineInfo) {
        if self.backlog.len() == BACKLOG_LIMIT {
            self.backlog.pop_front();
        }
        self.backlog.push_back(info);
    }
}

impl BrokerState {
    fn status(&self) -> BrokerStatus {
        BrokerStatus {
            ready: self.adapter.is_ready(),
            dead: self.adapter.is_dead(),
            live: self.live.as_ref().map(|l| l.id),
            searching: !self.in_flight.is_empty() || self.has_backlog(),
        }
    }

    /// Must run before any reply that depends on the live request changing.
    fn publish_status(&self) {
        let status = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    /// Retire the live request. A pending best-move learns it was replaced;
    /// an analysis subscription just stops receiving.
    fn supersede(&mut self) {
        if let Some(live) = self.live.take() {
            tracing::debug!(id = %live.id, "Superseding live request");
            if let LiveKind::BestMove(reply) = live.kind {
                let _ = reply.send(Err(EngineError::Superseded));
            }
        }
    }

    async fn cancel(&mut self, id: RequestId) {
        if self.live.as_ref().is_some_and(|l| l.id == id) {
            tracing::debug!(%id, "Cancelling request");
            self.live = None;
            self.publish_status();
            if !self.adapter.is_dead() {
                let _ = self.adapter.stop().await;
            }
        }
    }

    async fn start_analysis(&mut self, request: &AnalysisRequest) -> Result<RequestId, EngineError> {
        let setup = [
            UciCommand::set_option("MultiPV", request.multipv),
            UciCommand::Position {
                fen: request.fen.clone(),
            },
        ];
        self.start_search(setup, GoParams::depth(request.depth))
            .await
    }

    async fn start_best_move(&mut self, request: &BestMoveRequest) -> Result<RequestId, EngineError> {
        let setup = [UciCommand::Position {
            fen: request.fen.clone(),
        }];
        let go = match request.movetime_ms {
            Some(ms) => GoParams::movetime(ms),
            None => GoParams::depth(request.depth),
        };
        self.start_search(setup, go).await
    }

    async fn start_search(
        &mut self,
        setup: impl IntoIterator<Item = UciCommand>,
        go: GoParams,
    ) -> Result<RequestId, EngineError> {
        self.adapter.stop().await?;
        for cmd in setup {
            self.adapter.send(cmd).await?;
        }
        let id = self.adapter.begin_request();
        self.adapter.send(UciCommand::Go(go)).await?;
        self.in_flight.push_back(id);
        Ok(id)
    }

    async fn deliver_info(&mut self, info: EngineInfo) {
        let Some(&head) = self.in_flight.front() else {
            tracing::trace!("Info with no search in flight");
            return;
        };
        let Some(live) = self.live.as_ref() else {
            tracing::trace!(search = %head, "Dropping info, nothing live");
            return;
        };
        if live.id != head {
            tracing::trace!(search = %head, live = %live.id, "Dropping info from superseded search");
            return;
        }
        let Some(LiveRequest {
            kind: LiveKind::Analysis(sink),
            ..
        }) = self.live.as_mut()
        else {
            return;
        };

        // Anything held back goes first to keep the order.
        if !sink.backlog.is_empty() {
            sink.hold(info);
            return;
        }
        match sink.tx.try_send(info) {
            Ok(()) => {}
            Err(TrySendError::Full(info)) => {
                tracing::trace!(id = %head, "Subscriber lagging, holding info");
                sink.hold(info);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(id = %head, "Subscriber gone, stopping analysis");
                self.cancel(head).await;
            }
        }
    }

    fn has_backlog(&self) -> bool {
        matches!(
            &self.live,
            Some(LiveRequest {
                kind: LiveKind::Analysis(sink),
                ..
            }) if !sink.backlog.is_empty()
        )
    }

    fn backlog_sender(&self) -> Option<mpsc::Sender<EngineInfo>> {
        match &self.live {
            Some(LiveRequest {
                kind: LiveKind::Analysis(sink),
                ..
            }) if !sink.backlog.is_empty() => Some(sink.tx.clone()),
            _ => None,
        }
    }

    async fn flush_backlog(&mut self, permit: Option<mpsc::OwnedPermit<EngineInfo>>) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        let id = live.id;
        let LiveKind::Analysis(sink) = &mut live.kind else {
            return;
        };
        match (permit, sink.backlog.pop_front()) {
            (Some(permit), Some(info)) => {
                permit.send(info);
            }
            (None, _) => {
                tracing::debug!(%id, "Subscriber gone, stopping analysis");
                self.cancel(id).await;
            }
            (Some(_), None) => {}
        }
    }

    fn resolve_best_move(&mut self, best: BestMove) {
        let Some(head) = self.in_flight.pop_front() else {
            tracing::debug!("bestmove with no search in flight: {:?}", best);
            return;
        };

        match self.live.take() {
            Some(LiveRequest {
                id,
                kind: LiveKind::BestMove(reply),
            }) if id == head => {
                tracing::debug!(%id, mv = ?best.mv, "Best move resolved");
                self.publish_status();
                let _ = reply.send(Ok(best.mv));
            }
            // A finished analysis stays live (and quiet) until superseded.
            other => {
                if other.as_ref().is_none_or(|l| l.id != head) {
                    tracing::trace!(search = %head, "Discarding bestmove of superseded search");
                }
                self.live = other;
            }
        }
    }

    fn fail_all(&mut self, msg: &str) {
        if !self.death_logged {
            tracing::error!("Engine process died: {}", msg);
            self.death_logged = true;
        }
        self.in_flight.clear();
        if let Some(live) = self.live.take() {
            if let LiveKind::BestMove(reply) = live.kind {
                let _ = reply.send(Err(EngineError::ProcessDead));
            }
        }
        self.publish_status();
    }
}
