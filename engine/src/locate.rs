//! Where to look for an engine binary.

use std::fmt;
use std::path::{Path, PathBuf};

/// One place an engine might be loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCandidate {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl EngineCandidate {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for EngineCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Common system install locations, checked after the local ones.
const SYSTEM_PATHS: [&str; 4] = [
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/opt/homebrew/bin/stockfish",
    "/usr/games/stockfish",
];

/// Ordered load candidates, local first:
///
/// 1. an explicitly configured path,
/// 2. `engine/stockfish` next to the running executable,
/// 3. system install locations that exist,
/// 4. `stockfish` resolved through `PATH`.
pub fn default_candidates(configured: Option<&Path>) -> Vec<EngineCandidate> {
    let mut candidates = Vec::new();

    if let Some(path) = configured {
        candidates.push(EngineCandidate::new(path));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let bundled = dir.join("engine").join("stockfish");
            if bundled.exists() {
                candidates.push(EngineCandidate::new(bundled));
            }
        }
    }

    for path in SYSTEM_PATHS {
        if Path::new(path).exists() {
            candidates.push(EngineCandidate::new(path));
        }
    }

    candidates.push(EngineCandidate::new("stockfish"));
    candidates.dedup();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_comes_first() {
        let candidates = default_candidates(Some(Path::new("/opt/engines/sf")));
        assert_eq!(candidates[0].program, PathBuf::from("/opt/engines/sf"));
        assert_eq!(
            candidates.last().map(|c| c.program.clone()),
            Some(PathBuf::from("stockfish"))
        );
    }

    #[test]
    fn test_display_includes_args() {
        let candidate = EngineCandidate::new("/bin/engine").with_args(["--uci"]);
        assert_eq!(candidate.to_string(), "/bin/engine --uci");
    }
}
