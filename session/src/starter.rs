//! Which colour moves first in a new game from the standard position.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chess::PieceColor;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarterPolicy {
    Fixed(PieceColor),
    Random,
    /// Flip the colour of the previous game, remembered across runs.
    Alternating,
}

impl Default for StarterPolicy {
    fn default() -> Self {
        Self::Fixed(PieceColor::White)
    }
}

impl FromStr for StarterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" => Ok(Self::Fixed(PieceColor::White)),
            "black" => Ok(Self::Fixed(PieceColor::Black)),
            "random" => Ok(Self::Random),
            "alternate" | "alternating" => Ok(Self::Alternating),
            other => Err(format!(
                "unknown starter '{}' (white, black, random, alternate)",
                other
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StarterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct StarterRecord {
    last_starter: PieceColor,
}

/// Remembers the last starter in `<data dir>/starter.json`.
#[derive(Debug, Clone)]
pub struct StarterStore {
    path: PathBuf,
}

impl StarterStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("starter.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns None if nothing has been saved yet.
    pub fn load(&self) -> Result<Option<PieceColor>, StarterError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let record: StarterRecord = serde_json::from_str(&contents)?;
        Ok(Some(record.last_starter))
    }

    pub fn save(&self, starter: PieceColor) -> Result<(), StarterError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&StarterRecord {
            last_starter: starter,
        })?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Decide the starter for a new game. Alternation starts from White as the
/// assumed previous starter, so the first alternating game is Black's; a
/// store that cannot be read or written is logged and treated the same way.
pub fn resolve_starter(policy: StarterPolicy, store: Option<&StarterStore>) -> PieceColor {
    match policy {
        StarterPolicy::Fixed(color) => color,
        StarterPolicy::Random => {
            if rand::thread_rng().gen_bool(0.5) {
                PieceColor::White
            } else {
                PieceColor::Black
            }
        }
        StarterPolicy::Alternating => {
            let previous = match store.map(StarterStore::load) {
                Some(Ok(Some(color))) => color,
                Some(Err(e)) => {
                    tracing::warn!("Failed to read starter state: {}", e);
                    PieceColor::White
                }
                _ => PieceColor::White,
            };
            let next = previous.opposite();
            if let Some(store) = store {
                if let Err(e) = store.save(next) {
                    tracing::warn!("Failed to save starter state: {}", e);
                }
            }
            next
        }
    }
}
