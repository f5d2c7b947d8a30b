//! In-memory engine behind a broker, for driving a session without a process.
#![allow(dead_code)]

use std::time::Duration;

use engine::{BrokerHandle, EngineAdapter};
use session::{EngineSettings, GameMode, GameSetup, SessionConfig, SessionEvent};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, WriteHalf};
use tokio::sync::broadcast;
use tokio::time::{timeout, Instant};

pub const PATIENCE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Answers every timed search with `pick(fen)` after `delay`; `stop`
    /// answers at once. Depth searches report two infos and `bestmove`.
    Play {
        pick: fn(&str) -> &'static str,
        delay: Duration,
    },
    /// Handshakes, then never answers `go` or `stop`.
    Silent,
    /// Closes its streams on the first `go`.
    Crash,
}

pub async fn fake_broker(behaviour: Behaviour) -> BrokerHandle {
    let (engine_side, adapter_side) = tokio::io::duplex(64 * 1024);
    tokio::spawn(run_fake_engine(engine_side, behaviour));

    let (reader, writer) = tokio::io::split(adapter_side);
    let mut adapter = EngineAdapter::from_io(reader, writer, None);
    adapter
        .handshake(Duration::from_secs(1))
        .await
        .expect("fake engine handshake");
    BrokerHandle::spawn(adapter)
}

pub fn config(mode: GameMode) -> SessionConfig {
    SessionConfig {
        setup: GameSetup {
            mode,
            ..GameSetup::default()
        },
        engine: EngineSettings {
            movetime_ms: Some(50),
            timeout: Duration::from_secs(2),
            analysis_depth: 2,
            ..EngineSettings::default()
        },
        data_dir: None,
        analyze: false,
    }
}

/// Next event matching `pred`, skipping everything else.
pub async fn wait_for<F>(events: &mut broadcast::Receiver<SessionEvent>, mut pred: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    let deadline = Instant::now() + PATIENCE;
    loop {
        let event = match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(event)) => event,
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(e)) => panic!("event channel closed: {}", e),
            Err(_) => panic!("no matching event within {:?}", PATIENCE),
        };
        if pred(&event) {
            return event;
        }
    }
}

pub async fn wait_for_moves(events: &mut broadcast::Receiver<SessionEvent>, count: usize) {
    wait_for(events, |e| {
        matches!(e, SessionEvent::StateChanged(s) if s.move_count == count)
    })
    .await;
}

async fn run_fake_engine(io: DuplexStream, behaviour: Behaviour) {
    let (read, mut write) = tokio::io::split(io);
    let mut lines = BufReader::new(read).lines();
    let mut fen = String::new();
    let mut pending: Option<(Instant, &'static str)> = None;

    loop {
        let due = pending.map(|(at, _)| at);
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else {
                    return;
                };
                let mut tokens = line.split_whitespace();
                match tokens.next().unwrap_or("") {
                    "uci" => emit(&mut write, &["id name FakeFish", "uciok"]).await,
                    "isready" => emit(&mut write, &["readyok"]).await,
                    "position" => {
                        fen = line.trim_start_matches("position fen ").to_string();
                    }
                    "go" => {
                        let (pick, delay) = match behaviour {
                            Behaviour::Play { pick, delay } => (pick, delay),
                            Behaviour::Silent => continue,
                            Behaviour::Crash => return,
                        };
                        if tokens.next() == Some("depth") {
                            emit(
                                &mut write,
                                &[
                                    "info depth 1 score cp 30 pv e2e4",
                                    "info depth 2 multipv 1 score cp 25 pv e2e4 e7e5",
                                    "bestmove e2e4",
                                ],
                            )
                            .await;
                        } else {
                            pending = Some((Instant::now() + delay, pick(&fen)));
                        }
                    }
                    "stop" => {
                        if let Some((_, mv)) = pending.take() {
                            let reply = format!("bestmove {}", mv);
                            emit(&mut write, &[reply.as_str()]).await;
                        }
                    }
                    "quit" => return,
                    _ => {}
                }
            }
            _ = sleep_until(due), if due.is_some() => {
                if let Some((_, mv)) = pending.take() {
                    let reply = format!("bestmove {}", mv);
                    emit(&mut write, &[reply.as_str()]).await;
                }
            }
        }
    }
}

async fn sleep_until(due: Option<Instant>) {
    match due {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn emit(write: &mut WriteHalf<DuplexStream>, lines: &[&str]) {
    for line in lines {
        if write.write_all(format!("{}\n", line).as_bytes()).await.is_err() {
            return;
        }
    }
    let _ = write.flush().await;
}

/// Await `fut`, failing the test after [`PATIENCE`].
pub async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    timeout(PATIENCE, fut).await.expect("timed out")
}
