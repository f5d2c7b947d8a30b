use std::fmt;

/// Commands sent to the engine, one line each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    SetOption { name: String, value: Option<String> },
    Position { fen: String },
    Go(GoParams),
    Stop,
    Quit,
}

/// Parameters for the "go" command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub movetime: Option<u64>, // Move time in milliseconds
    pub depth: Option<u32>,    // Search depth
    pub infinite: bool,        // Search until "stop"
}

impl GoParams {
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Default::default()
        }
    }

    pub fn movetime(ms: u64) -> Self {
        Self {
            movetime: Some(ms),
            ..Default::default()
        }
    }
}

impl UciCommand {
    pub fn set_option(name: &str, value: impl ToString) -> Self {
        Self::SetOption {
            name: name.to_string(),
            value: Some(value.to_string()),
        }
    }

    /// Commands allowed before the engine has answered `readyok`.
    pub fn is_handshake(&self) -> bool {
        matches!(self, Self::Uci | Self::IsReady | Self::Quit)
    }
}

impl fmt::Display for UciCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uci => write!(f, "uci"),
            Self::IsReady => write!(f, "isready"),
            Self::UciNewGame => write!(f, "ucinewgame"),
            Self::SetOption { name, value } => match value {
                Some(val) => write!(f, "setoption name {} value {}", name, val),
                None => write!(f, "setoption name {}", name),
            },
            Self::Position { fen } => write!(f, "position fen {}", fen),
            Self::Go(params) => {
                // movetime is the stronger constraint when both are set
                if let Some(movetime) = params.movetime {
                    write!(f, "go movetime {}", movetime)
                } else if let Some(depth) = params.depth {
                    write!(f, "go depth {}", depth)
                } else if params.infinite {
                    write!(f, "go infinite")
                } else {
                    write!(f, "go movetime 1000")
                }
            }
            Self::Stop => write!(f, "stop"),
            Self::Quit => write!(f, "quit"),
        }
    }
}
