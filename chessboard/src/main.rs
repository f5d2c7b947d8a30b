//! Chessboard: play against a UCI engine (or a built-in opponent when none is
//! installed) in the terminal, or query the engine directly.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{
    default_candidates, AnalysisRequest, BestMoveRequest, BrokerHandle, EngineConfig, EngineError,
    EngineInfo,
};
use session::{config, Difficulty, GameMode, GameSetup, SessionConfig, StarterPolicy};
use tokio_stream::StreamExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod input;
mod ui;
mod view;

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Parser)]
#[command(name = "chessboard", about = "Terminal chess with UCI engine support")]
struct Cli {
    /// Log to stderr instead of the daily log file.
    #[arg(long, global = true)]
    log_stderr: bool,

    /// Path to a UCI engine. Falls back to CHESSBOARD_ENGINE_PATH, then PATH.
    #[arg(long, global = true)]
    engine: Option<PathBuf>,

    /// When omitted, starts a game with default settings.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game in the terminal.
    Play(PlayArgs),
    /// Print live engine analysis of a position.
    Analyze {
        #[arg(long, default_value = START_FEN)]
        fen: String,
        #[arg(long, default_value_t = 18)]
        depth: u32,
        #[arg(long, default_value_t = 1)]
        multipv: u8,
        /// Stop after this many updates.
        #[arg(long, default_value_t = 20)]
        updates: usize,
    },
    /// Ask the engine for one move.
    Bestmove {
        #[arg(long, default_value = START_FEN)]
        fen: String,
        #[arg(long, default_value_t = 12)]
        depth: u32,
        /// Search time; takes precedence over depth.
        #[arg(long)]
        movetime: Option<u64>,
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Human against the computer.
    Hvc,
    /// Two humans at one keyboard.
    Hvh,
}

#[derive(Args, Default)]
struct PlayArgs {
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Side the human plays against the computer: white or black.
    #[arg(long, value_parser = parse_side)]
    side: Option<chess::PieceColor>,
    /// Built-in opponent strength: easy, medium or hard.
    #[arg(long)]
    difficulty: Option<Difficulty>,
    /// Who moves first: white, black, random or alternate.
    #[arg(long)]
    starter: Option<StarterPolicy>,
    /// Seconds per move; the side to move loses when it runs out.
    #[arg(long)]
    move_timer: Option<u64>,
    /// Play against the built-in opponent even if an engine is installed.
    #[arg(long)]
    no_engine: bool,
    /// Start with live analysis on.
    #[arg(long)]
    analyze: bool,
    /// Engine `Skill Level` option (0-20).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=20))]
    skill: Option<u8>,
}

fn parse_side(s: &str) -> Result<chess::PieceColor, String> {
    chess::PieceColor::from_str_opt(s).ok_or_else(|| format!("unknown side '{}'", s))
}

impl PlayArgs {
    fn setup(&self) -> GameSetup {
        let mode = match self.mode {
            Some(ModeArg::Hvh) => GameMode::HumanVsHuman,
            Some(ModeArg::Hvc) | None => GameMode::HumanVsComputer {
                human_side: self.side.unwrap_or(chess::PieceColor::White),
            },
        };
        GameSetup {
            mode,
            difficulty: self.difficulty.unwrap_or_default(),
            starter: self.starter.unwrap_or_default(),
            move_timer: self.move_timer.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_stderr)?;
    tracing::info!("Chessboard starting up");

    match cli.command {
        None => play(PlayArgs::default(), cli.engine).await?,
        Some(Commands::Play(args)) => play(args, cli.engine).await?,
        Some(Commands::Analyze {
            fen,
            depth,
            multipv,
            updates,
        }) => analyze(cli.engine, fen, depth, multipv, updates).await?,
        Some(Commands::Bestmove {
            fen,
            depth,
            movetime,
            timeout_ms,
        }) => bestmove(cli.engine, fen, depth, movetime, timeout_ms).await?,
    }

    tracing::info!("Chessboard shutting down");
    Ok(())
}

/// Returns the appender guard, which must live until exit for the file log to
/// be flushed.
fn init_logging(
    to_stderr: bool,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if to_stderr {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
        return Ok(None);
    }

    let log_dir = config::log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "chessboard");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();
    Ok(Some(guard))
}

async fn connect_engine(
    path: Option<PathBuf>,
    skill_level: Option<u8>,
) -> Result<BrokerHandle, EngineError> {
    let configured = path.or_else(config::engine_path);
    let candidates = default_candidates(configured.as_deref());
    let engine_config = EngineConfig {
        skill_level,
        handshake_timeout: config::handshake_timeout(),
        ..EngineConfig::default()
    };
    BrokerHandle::start(&candidates, &engine_config).await
}

async fn play(args: PlayArgs, engine_path: Option<PathBuf>) -> anyhow::Result<()> {
    let engine = if args.no_engine {
        None
    } else {
        match connect_engine(engine_path, args.skill).await {
            Ok(broker) => Some(broker),
            Err(e) => {
                tracing::warn!("No engine available: {}", e);
                None
            }
        }
    };
    if engine.is_none() {
        println!("No UCI engine found; the built-in opponent will play.");
    }

    let session = session::spawn_session(
        SessionConfig {
            setup: args.setup(),
            engine: session::EngineSettings::from_env(),
            data_dir: Some(config::data_dir()),
            analyze: args.analyze,
        },
        engine,
    );
    session.new_game(None).await?;

    let result = ui::run_play(session.clone()).await;
    session.shutdown().await;
    result
}

async fn analyze(
    engine_path: Option<PathBuf>,
    fen: String,
    depth: u32,
    multipv: u8,
    updates: usize,
) -> anyhow::Result<()> {
    let broker = connect_engine(engine_path, None)
        .await
        .context("starting engine")?;
    let mut subscription = broker
        .analyze(AnalysisRequest::new(fen, depth, multipv))
        .await?;

    // The subscription stays open after the engine finishes; stop then, or
    // after `updates` lines, whichever comes first.
    let finished = subscription.finished();
    tokio::pin!(finished);
    let mut printed = 0;
    while printed < updates {
        tokio::select! {
            biased;

            info = subscription.next() => match info {
                Some(info) => {
                    print_info(&info);
                    printed += 1;
                }
                None => break,
            },
            _ = &mut finished => {
                while printed < updates {
                    let Some(info) = subscription.try_recv() else {
                        break;
                    };
                    print_info(&info);
                    printed += 1;
                }
                break;
            }
        }
    }
    drop(subscription);
    broker.shutdown().await;
    Ok(())
}

fn print_info(info: &EngineInfo) {
    println!(
        "depth {:>2}  multipv {}  score {:>6}  {}",
        info.depth.unwrap_or(0),
        info.multipv.unwrap_or(1),
        info.score_text(),
        info.pv
    );
}

async fn bestmove(
    engine_path: Option<PathBuf>,
    fen: String,
    depth: u32,
    movetime: Option<u64>,
    timeout_ms: u64,
) -> anyhow::Result<()> {
    let broker = connect_engine(engine_path, None)
        .await
        .context("starting engine")?;
    let result = broker
        .request_best_move(
            BestMoveRequest::new(fen, depth, movetime),
            Duration::from_millis(timeout_ms),
        )
        .await;
    broker.shutdown().await;

    match result? {
        Some(mv) => println!("bestmove {}", mv),
        None => println!("bestmove (none)"),
    }
    Ok(())
}
