use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_stream::Stream;

use super::actor::{run_broker, UPDATE_BUFFER};
use super::commands::BrokerCommand;
use super::{AnalysisRequest, BestMoveRequest, BrokerStatus};
use crate::{EngineAdapter, EngineCandidate, EngineConfig, EngineError, EngineInfo, RequestId};

/// Cheap, cloneable handle to a broker actor.
#[derive(Clone)]
pub struct BrokerHandle {
    cmd_tx: mpsc::Sender<BrokerCommand>,
    status_rx: watch::Receiver<BrokerStatus>,
}

impl BrokerHandle {
    /// Load an engine from the first working candidate and start a broker on it.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn start(
        candidates: &[EngineCandidate],
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let adapter = EngineAdapter::start(candidates, config).await?;
        Ok(Self::spawn(adapter))
    }

    /// Run a broker over an adapter that has already been started.
    pub fn spawn(adapter: EngineAdapter) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (status_tx, status_rx) = watch::channel(BrokerStatus {
            ready: adapter.is_ready(),
            dead: adapter.is_dead(),
            live: None,
            searching: false,
        });
        tokio::spawn(run_broker(adapter, cmd_rx, status_tx));
        Self { cmd_tx, status_rx }
    }

    pub fn status(&self) -> BrokerStatus {
        *self.status_rx.borrow()
    }

    pub fn is_ready(&self) -> bool {
        let status = self.status();
        status.ready && !status.dead && !self.cmd_tx.is_closed()
    }

    /// Start streaming analysis, replacing whatever was running.
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisSubscription, EngineError> {
        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_BUFFER);
        let (tx, rx) = oneshot::channel();
        self.send(BrokerCommand::Analyze {
            request,
            updates: updates_tx,
            reply: tx,
        })
        .await?;
        let id = rx.await.map_err(|_| EngineError::Closed)??;

        Ok(AnalysisSubscription {
            id,
            rx: updates_rx,
            status_rx: self.status_rx.clone(),
            cmd_tx: self.cmd_tx.clone(),
            cancelled: false,
        })
    }

    /// Ask for one move. Resolves with the engine's `bestmove` (`None` when it
    /// has no move), or `Timeout` once `timeout` has passed, in which case the
    /// search is abandoned.
    pub async fn request_best_move(
        &self,
        request: BestMoveRequest,
        timeout: Duration,
    ) -> Result<Option<String>, EngineError> {
        let deadline = Instant::now() + timeout;
        let (started_tx, started_rx) = oneshot::channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(BrokerCommand::BestMove {
            request,
            started: started_tx,
            reply: reply_tx,
        })
        .await?;

        // If this times out the actor sees the dropped receiver and stops the search.
        let id = match tokio::time::timeout_at(deadline, started_rx).await {
            Ok(started) => started.map_err(|_| EngineError::Closed)??,
            Err(_) => return Err(EngineError::Timeout),
        };

        match tokio::time::timeout_at(deadline, reply_rx).await {
            Ok(reply) => reply.map_err(|_| EngineError::Closed)?,
            Err(_) => {
                tracing::warn!(%id, "No bestmove within {:?}, abandoning search", timeout);
                let _ = self.cmd_tx.try_send(BrokerCommand::Cancel { id });
                Err(EngineError::Timeout)
            }
        }
    }

    /// Stop any running search. Safe to call when idle.
    pub async fn stop_all(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(BrokerCommand::StopAll { reply: tx })
            .await
            .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    /// Quit the engine and wait for the actor to finish.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(BrokerCommand::Shutdown { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    async fn send(&self, cmd: BrokerCommand) -> Result<(), EngineError> {
        if self.status().dead {
            return Err(EngineError::ProcessDead);
        }
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| EngineError::Closed)
    }
}

/// Live analysis updates for one request.
///
/// Yields `None` once a newer request has been issued or the engine died, even
/// if updates were still buffered. Dropping the subscription stops the search
/// when it is still the live one.
pub struct AnalysisSubscription {
    id: RequestId,
    rx: mpsc::Receiver<EngineInfo>,
    status_rx: watch::Receiver<BrokerStatus>,
    cmd_tx: mpsc::Sender<BrokerCommand>,
    cancelled: bool,
}

impl AnalysisSubscription {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        !self.cancelled && self.status_rx.borrow().live == Some(self.id)
    }

    pub async fn recv(&mut self) -> Option<EngineInfo> {
        std::future::poll_fn(|cx| self.poll_update(cx)).await
    }

    /// Resolves once this analysis has stopped producing output: the engine
    /// finished the search and every update was handed to this subscription's
    /// buffer, or the subscription is no longer live. Buffered updates can
    /// still be read with [`try_recv`](Self::try_recv) afterwards.
    pub fn finished(&self) -> impl std::future::Future<Output = ()> + 'static {
        let id = self.id;
        let mut status_rx = self.status_rx.clone();
        async move {
            let _ = status_rx
                .wait_for(|s| s.live != Some(id) || !s.searching)
                .await;
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<EngineInfo> {
        if !self.is_live() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Stop the search if it is still running for this subscription.
    pub fn cancel(&mut self) {
        if self.is_live() {
            let _ = self.cmd_tx.try_send(BrokerCommand::Cancel { id: self.id });
        }
        self.cancelled = true;
        self.rx.close();
    }

    pub fn into_stream(self) -> impl Stream<Item = EngineInfo> {
        self
    }

    fn poll_update(&mut self, cx: &mut Context<'_>) -> Poll<Option<EngineInfo>> {
        if !self.is_live() {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            // Liveness can change while the update sat in the buffer.
            Poll::Ready(Some(info)) if self.is_live() => Poll::Ready(Some(info)),
            Poll::Ready(_) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Stream for AnalysisSubscription {
    type Item = EngineInfo;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<EngineInfo>> {
        self.get_mut().poll_update(cx)
    }
}

impl Drop for AnalysisSubscription {
    fn drop(&mut self) {
        if !self.cancelled {
            self.cancel();
        }
    }
}

impl std::fmt::Debug for AnalysisSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSubscription")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}
