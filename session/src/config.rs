//! Runtime configuration for a chessboard session.
//!
//! Every tunable has a compile-time default and can be overridden through a
//! dedicated environment variable; the binary layers its CLI flags on top.

use std::path::PathBuf;
use std::time::Duration;

use crate::starter::StarterPolicy;
use crate::types::{Difficulty, GameMode};

/// Default search depth for the opponent's best-move requests.
const DEFAULT_ENGINE_DEPTH: u32 = 12;

/// Default thinking time per opponent move (in milliseconds).
const DEFAULT_ENGINE_MOVETIME_MS: u64 = 1200;

/// Default ceiling on waiting for one opponent move (in milliseconds).
const DEFAULT_BESTMOVE_TIMEOUT_MS: u64 = 5000;

/// Default engine handshake timeout (in seconds).
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Default depth for live analysis.
const DEFAULT_ANALYSIS_DEPTH: u32 = 18;

/// Fallback data directory when no platform directory can be determined.
const FALLBACK_DATA_DIR: &str = "./data";

/// Get an explicitly configured engine binary.
///
/// Priority:
/// 1. `CHESSBOARD_ENGINE_PATH` env variable if set
/// 2. `None`, leaving the search to the default candidate list
pub fn engine_path() -> Option<PathBuf> {
    std::env::var_os("CHESSBOARD_ENGINE_PATH").map(PathBuf::from)
}

/// Get the directory for persisted state (the alternating starter).
///
/// Priority:
/// 1. `CHESSBOARD_DATA_DIR` env variable if set
/// 2. the platform data directory for `chessboard`
/// 3. `./data` as fallback
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESSBOARD_DATA_DIR") {
        return PathBuf::from(dir);
    }

    directories::ProjectDirs::from("", "", "chessboard")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}

/// Get the directory for rolling log files.
///
/// Priority:
/// 1. `CHESSBOARD_LOG_DIR` env variable if set
/// 2. `<data dir>/logs`
pub fn log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESSBOARD_LOG_DIR") {
        return PathBuf::from(dir);
    }

    data_dir().join("logs")
}

/// Get the engine handshake timeout.
///
/// Priority:
/// 1. `CHESSBOARD_HANDSHAKE_TIMEOUT_SECS` env variable if set (falls back to
///    the default if the value cannot be parsed as a `u64`)
/// 2. `10` seconds as fallback
pub fn handshake_timeout() -> Duration {
    let secs = std::env::var("CHESSBOARD_HANDSHAKE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Get the ceiling on one opponent best-move request.
///
/// Priority:
/// 1. `CHESSBOARD_BESTMOVE_TIMEOUT_MS` env variable if set (falls back to the
///    default if the value cannot be parsed as a `u64`)
/// 2. `5000` ms as fallback
pub fn best_move_timeout() -> Duration {
    let ms = std::env::var("CHESSBOARD_BESTMOVE_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_BESTMOVE_TIMEOUT_MS);
    Duration::from_millis(ms)
}

/// How the next game is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameSetup {
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub starter: StarterPolicy,
    /// Per-move budget; `None` disables the clock.
    pub move_timer: Option<Duration>,
}

/// Search parameters the session uses when talking to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub depth: u32,
    /// Takes precedence over `depth` when set.
    pub movetime_ms: Option<u64>,
    pub timeout: Duration,
    pub analysis_depth: u32,
    pub analysis_multipv: u8,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            depth: DEFAULT_ENGINE_DEPTH,
            movetime_ms: Some(DEFAULT_ENGINE_MOVETIME_MS),
            timeout: Duration::from_millis(DEFAULT_BESTMOVE_TIMEOUT_MS),
            analysis_depth: DEFAULT_ANALYSIS_DEPTH,
            analysis_multipv: 1,
        }
    }
}

impl EngineSettings {
    /// Defaults with the environment's best-move timeout applied.
    pub fn from_env() -> Self {
        Self {
            timeout: best_move_timeout(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub setup: GameSetup,
    pub engine: EngineSettings,
    /// Where the alternating starter is remembered; `None` keeps it in memory
    /// for this session only.
    pub data_dir: Option<PathBuf>,
    /// Start with live analysis switched on.
    pub analyze: bool,
}
