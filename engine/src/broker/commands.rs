use tokio::sync::{mpsc, oneshot};

use super::{AnalysisRequest, BestMoveRequest};
use crate::{EngineError, EngineInfo, RequestId};

/// Commands sent to the broker actor. Each embeds a oneshot for the reply.
pub(crate) enum BrokerCommand {
    Analyze {
        request: AnalysisRequest,
        updates: mpsc::Sender<EngineInfo>,
        reply: oneshot::Sender<Result<RequestId, EngineError>>,
    },
    BestMove {
        request: BestMoveRequest,
        /// Answered as soon as the search has been issued.
        started: oneshot::Sender<Result<RequestId, EngineError>>,
        reply: oneshot::Sender<Result<Option<String>, EngineError>>,
    },
    /// Stop `id` if it is still the live request.
    Cancel { id: RequestId },
    StopAll {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
