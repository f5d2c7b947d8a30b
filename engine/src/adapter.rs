use crate::locate::EngineCandidate;
use crate::uci::{parse_line, UciCommand};
use crate::{EngineError, EngineEvent};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

/// Identifies one search request issued through an adapter. Ids only grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Configuration for engine start-up and performance tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub skill_level: Option<u8>,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
    /// How long a candidate gets to answer `readyok`.
    pub handshake_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            skill_level: None,
            threads: None,
            hash_mb: None,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Owns one long-lived engine process and its command/event lifecycle.
///
/// Output lines are parsed on a reader task and queued as [`EngineEvent`]s in
/// emission order. Commands go through a writer task. Nothing is filtered
/// here: deciding which events are stale is the broker's job.
pub struct EngineAdapter {
    process: Option<Child>,
    stdin: mpsc::Sender<String>,
    event_rx: mpsc::Receiver<EngineEvent>,
    ready: bool,
    dead: bool,
    death_reported: bool,
    last_request: u64,
    current_request: Option<RequestId>,
}

impl EngineAdapter {
    /// Try each candidate in order and return the first one that starts and
    /// completes the `uci`/`isready` handshake.
    #[tracing::instrument(level = "info", skip_all, fields(candidates = candidates.len()))]
    pub async fn start(
        candidates: &[EngineCandidate],
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let mut failures = Vec::new();

        for candidate in candidates {
            tracing::debug!("Trying engine candidate: {}", candidate);
            match Self::launch(candidate, config).await {
                Ok(adapter) => {
                    tracing::info!("Engine loaded from {}", candidate);
                    return Ok(adapter);
                }
                Err(e) => {
                    tracing::warn!("Engine candidate {} failed: {}", candidate, e);
                    failures.push(format!("{}: {}", candidate, e));
                }
            }
        }

        tracing::error!("No engine candidate could be loaded");
        if failures.is_empty() {
            return Err(EngineError::Unavailable("no candidates given".to_string()));
        }
        Err(EngineError::Unavailable(failures.join("; ")))
    }

    async fn launch(candidate: &EngineCandidate, config: &EngineConfig) -> Result<Self, EngineError> {
        let mut process = tokio::process::Command::new(&candidate.program)
            .args(&candidate.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Handshake("engine has no stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Handshake("engine has no stdout".to_string()))?;

        let mut adapter = Self::from_io(stdout, stdin, Some(process));
        if let Err(e) = adapter.handshake(config.handshake_timeout).await {
            adapter.shutdown().await;
            return Err(e);
        }
        adapter.apply_config(config).await?;
        Ok(adapter)
    }

    /// Build an adapter over arbitrary byte streams. `reader` is the engine's
    /// output, `writer` its input. The adapter is not ready until
    /// [`handshake`](Self::handshake) succeeds.
    pub fn from_io<R, W>(reader: R, writer: W, process: Option<Child>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(256);
        let (stdin_tx, stdin_rx) = mpsc::channel::<String>(32);

        tokio::spawn(read_output(reader, event_tx));
        tokio::spawn(write_input(writer, stdin_rx));

        Self {
            process,
            stdin: stdin_tx,
            event_rx,
            ready: false,
            dead: false,
            death_reported: false,
            last_request: 0,
            current_request: None,
        }
    }

    /// Send the capability query and readiness ping, then wait for `readyok`.
    pub async fn handshake(&mut self, timeout: Duration) -> Result<(), EngineError> {
        self.send(UciCommand::Uci).await?;
        self.send(UciCommand::IsReady).await?;

        tracing::debug!("Waiting for readyok from engine");
        let wait = tokio::time::timeout(timeout, async {
            while let Some(event) = self.event_rx.recv().await {
                if matches!(event, EngineEvent::Ready) {
                    return Ok(());
                }
                tracing::trace!("Ignoring event during handshake: {:?}", event);
            }
            Err(EngineError::Handshake(
                "engine closed before sending readyok".to_string(),
            ))
        })
        .await;

        match wait {
            Ok(Ok(())) => {
                tracing::debug!("Received readyok, engine ready");
                self.ready = true;
                Ok(())
            }
            Ok(Err(e)) => {
                self.dead = true;
                Err(e)
            }
            Err(_) => Err(EngineError::Handshake(
                "timeout waiting for readyok".to_string(),
            )),
        }
    }

    async fn apply_config(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        if let Some(level) = config.skill_level {
            tracing::info!("Setting skill level to {}", level);
            self.send(UciCommand::set_option("Skill Level", level.min(20)))
                .await?;
        }
        if let Some(threads) = config.threads {
            let threads = threads.clamp(1, 16);
            tracing::info!("Setting Threads to {}", threads);
            self.send(UciCommand::set_option("Threads", threads)).await?;
        }
        if let Some(hash_mb) = config.hash_mb {
            let hash_mb = hash_mb.clamp(1, 2048);
            tracing::info!("Setting Hash to {} MB", hash_mb);
            self.send(UciCommand::set_option("Hash", hash_mb)).await?;
        }
        Ok(())
    }

    /// Forward one command verbatim.
    pub async fn send(&mut self, cmd: UciCommand) -> Result<(), EngineError> {
        if self.dead {
            return Err(EngineError::ProcessDead);
        }
        if !self.ready && !cmd.is_handshake() {
            tracing::warn!("Refusing {:?} before handshake", cmd);
            return Err(EngineError::NotReady);
        }

        let line = cmd.to_string();
        tracing::debug!("Queueing command: {}", line);
        if self.stdin.send(line).await.is_err() {
            tracing::error!("Engine input closed");
            self.dead = true;
            return Err(EngineError::ProcessDead);
        }
        Ok(())
    }

    /// Cancel whatever search may be running. Harmless when idle.
    pub async fn stop(&mut self) -> Result<(), EngineError> {
        self.send(UciCommand::Stop).await
    }

    /// Allocate the id for a new request and make it the current one.
    pub fn begin_request(&mut self) -> RequestId {
        self.last_request += 1;
        let id = RequestId(self.last_request);
        self.current_request = Some(id);
        id
    }

    pub fn current_request(&self) -> Option<RequestId> {
        self.current_request
    }

    pub fn is_ready(&self) -> bool {
        self.ready && !self.dead
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// False once the end of the event stream has been reported.
    pub fn has_events(&self) -> bool {
        !self.death_reported
    }

    /// Next event in emission order. When the engine's output ends the adapter
    /// marks itself dead and yields a single [`EngineEvent::Error`], then
    /// `None` from then on.
    pub async fn recv_event(&mut self) -> Option<EngineEvent> {
        if self.death_reported {
            return None;
        }
        match self.event_rx.recv().await {
            Some(event) => {
                if matches!(event, EngineEvent::Ready) {
                    self.ready = true;
                }
                Some(event)
            }
            None => {
                tracing::warn!("Engine output closed");
                self.dead = true;
                self.death_reported = true;
                Some(EngineEvent::Error("engine process exited".to_string()))
            }
        }
    }

    /// Try to receive an event from the engine (non-blocking)
    pub fn try_recv_event(&mut self) -> Option<EngineEvent> {
        let event = self.event_rx.try_recv().ok()?;
        tracing::trace!("Received event: {:?}", event);
        Some(event)
    }

    /// Shutdown the engine
    pub async fn shutdown(mut self) {
        if !self.dead {
            let _ = self.stdin.send(UciCommand::Quit.to_string()).await;
        }
        if let Some(mut process) = self.process.take() {
            let _ = tokio::time::timeout(Duration::from_secs(1), process.wait()).await;
            let _ = process.kill().await;
        }
    }
}

/// Reader task: engine output lines → parsed events. Ends at EOF, which
/// closes the event channel.
async fn read_output<R>(reader: R, event_tx: mpsc::Sender<EngineEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                tracing::warn!("Engine stdout EOF - engine closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                tracing::trace!("UCI << {}", trimmed);

                if let Some(event) = parse_line(trimmed) {
                    if event_tx.send(event).await.is_err() {
                        tracing::debug!("Event receiver dropped");
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::error!("Error reading from engine stdout: {}", e);
                break;
            }
        }
    }
    tracing::info!("Output reader task exiting");
}

/// Writer task: command lines → engine input.
async fn write_input<W>(mut writer: W, mut stdin_rx: mpsc::Receiver<String>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    while let Some(cmd) = stdin_rx.recv().await {
        tracing::trace!("UCI >> {}", cmd);

        if let Err(e) = writer.write_all(format!("{}\n", cmd).as_bytes()).await {
            tracing::error!("Failed to write to engine stdin: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            tracing::error!("Failed to flush engine stdin: {}", e);
            break;
        }
    }
    tracing::info!("Stdin writer task exiting");
}
