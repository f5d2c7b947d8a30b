//! In-memory UCI engine for driving the adapter and broker without a process.
#![allow(dead_code)]

use std::time::Duration;

use engine::{BrokerHandle, EngineAdapter};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, WriteHalf};
use tokio::sync::mpsc;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// How the fake engine reacts to `go`.
#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Reports every depth up to `depth`, then answers `bestmove best`.
    Responsive { depth: u32, best: &'static str },
    /// Reports two shallow depths and keeps searching until `stop`, which
    /// produces a deep trailing info and `bestmove a2a3`.
    Endless,
    /// Never answers `go` or `stop`.
    Silent,
    /// Closes its streams on `go`.
    Crash,
    /// Answers `uci` but never `isready`.
    NeverReady,
}

/// Adapter wired to a fake engine, plus the log of every line the engine read.
pub fn fake_adapter(behaviour: Behaviour) -> (EngineAdapter, mpsc::UnboundedReceiver<String>) {
    let (engine_side, adapter_side) = tokio::io::duplex(64 * 1024);
    let (log_tx, log_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_fake_engine(engine_side, behaviour, log_tx));

    let (reader, writer) = tokio::io::split(adapter_side);
    (EngineAdapter::from_io(reader, writer, None), log_rx)
}

/// Handshaken adapter behind a broker.
pub async fn fake_broker(behaviour: Behaviour) -> (BrokerHandle, mpsc::UnboundedReceiver<String>) {
    let (mut adapter, log) = fake_adapter(behaviour);
    adapter
        .handshake(Duration::from_secs(1))
        .await
        .expect("fake engine handshake");
    (BrokerHandle::spawn(adapter), log)
}

/// Commands the engine has read so far, handshake excluded.
pub fn drain_commands(log: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(line) = log.try_recv() {
        if line != "uci" && line != "isready" {
            lines.push(line);
        }
    }
    lines
}

async fn run_fake_engine(
    io: DuplexStream,
    behaviour: Behaviour,
    log: mpsc::UnboundedSender<String>,
) {
    let (read, mut write) = tokio::io::split(io);
    let mut lines = BufReader::new(read).lines();
    let mut searching = false;

    while let Ok(Some(line)) = lines.next_line().await {
        let _ = log.send(line.clone());
        let keyword = line.split_whitespace().next().unwrap_or("");

        match keyword {
            "uci" => emit(&mut write, &["id name FakeFish 1.0", "id author nobody", "uciok"]).await,
            "isready" => {
                if !matches!(behaviour, Behaviour::NeverReady) {
                    emit(&mut write, &["readyok"]).await;
                }
            }
            "go" => match behaviour {
                Behaviour::Responsive { depth, best } => {
                    let mut out = Vec::new();
                    for d in 1..=depth {
                        out.push(format!(
                            "info depth {} seldepth {} score cp {} nodes {} pv {} e7e5",
                            d,
                            d + 2,
                            10 + d,
                            d * 1000,
                            best
                        ));
                    }
                    out.push(format!("bestmove {} ponder e7e5", best));
                    let refs: Vec<&str> = out.iter().map(String::as_str).collect();
                    emit(&mut write, &refs).await;
                }
                Behaviour::Endless => {
                    searching = true;
                    emit(
                        &mut write,
                        &[
                            "info depth 1 score cp 5 pv e2e4",
                            "info depth 2 score cp 7 pv e2e4 e7e5",
                        ],
                    )
                    .await;
                }
                Behaviour::Silent | Behaviour::NeverReady => {}
                Behaviour::Crash => return,
            },
            "stop" => {
                if searching {
                    searching = false;
                    emit(
                        &mut write,
                        &["info depth 99 score cp 999 pv a2a3", "bestmove a2a3"],
                    )
                    .await;
                }
            }
            "quit" => return,
            _ => {}
        }
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
