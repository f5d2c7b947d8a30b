/// Failures surfaced by the adapter and the broker.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No load candidate produced a working engine. Terminal for the instance.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
    /// A command other than the handshake was issued before `readyok`.
    #[error("Engine not ready")]
    NotReady,
    /// The engine process exited after it became ready.
    #[error("Engine process died")]
    ProcessDead,
    /// No answer within the caller's ceiling.
    #[error("Timed out waiting for the engine")]
    Timeout,
    /// A newer request replaced this one before it resolved.
    #[error("Request superseded by a newer one")]
    Superseded,
    #[error("Engine handshake failed: {0}")]
    Handshake(String),
    /// The broker task is gone.
    #[error("Engine broker closed")]
    Closed,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether the engine should be treated as gone for the rest of the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::ProcessDead | Self::Closed | Self::Handshake(_)
        )
    }
}
