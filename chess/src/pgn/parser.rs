/// A parsed PGN game
#[derive(Debug, Clone, Default)]
pub struct PgnGame {
    /// Tag pairs in file order.
    pub tags: Vec<(String, String)>,
    pub moves: Vec<PgnMove>,
    pub result: GameResult,
}

impl PgnGame {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A single move in PGN with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct PgnMove {
    pub san: String,
    pub comment: Option<String>,
    pub nags: Vec<u8>, // Numeric Annotation Glyphs (!!, ?, etc.)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    #[default]
    Ongoing,
}

impl GameResult {
    pub fn as_pgn(self) -> &'static str {
        match self {
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
            Self::Ongoing => "*",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "1-0" => Some(Self::WhiteWins),
            "0-1" => Some(Self::BlackWins),
            "1/2-1/2" => Some(Self::Draw),
            "*" => Some(Self::Ongoing),
            _ => None,
        }
    }
}

/// Parse a PGN string into a game
///
/// Only the main line is kept: variations, `;` comments and `%` escape lines
/// are skipped. Moves are returned as SAN text; resolving them against a
/// board is [`crate::Game::from_pgn`]'s job.
pub fn parse_pgn(input: &str) -> Result<PgnGame, PgnError> {
    let mut game = PgnGame::default();
    let mut chars = input.chars().peekable();
    let mut at_line_start = true;

    while let Some(&c) = chars.peek() {
        if c == '\n' {
            at_line_start = true;
            chars.next();
            continue;
        }
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let line_start = at_line_start;
        at_line_start = false;

        match c {
            '%' if line_start => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        at_line_start = true;
                        break;
                    }
                }
            }
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        at_line_start = true;
                        break;
                    }
                }
            }
            '[' => {
                chars.next();
                let mut raw = String::new();
                let mut closed = false;
                let mut in_quotes = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' if in_quotes => {
                            raw.push(c);
                            if let Some(escaped) = chars.next() {
                                raw.push(escaped);
                            }
                        }
                        '"' => {
                            in_quotes = !in_quotes;
                            raw.push(c);
                        }
                        ']' if !in_quotes => {
                            closed = true;
                            break;
                        }
                        _ => raw.push(c),
                    }
                }
                if !closed {
                    return Err(PgnError::InvalidFormat);
                }
                game.tags.push(parse_tag(&raw)?);
            }
            '{' => {
                chars.next();
                let mut comment = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    comment.push(c);
                }
                if !closed {
                    return Err(PgnError::InvalidFormat);
                }
                if let Some(last) = game.moves.last_mut() {
                    let comment = comment.trim().to_string();
                    if !comment.is_empty() {
                        last.comment = Some(match last.comment.take() {
                            Some(prev) => format!("{} {}", prev, comment),
                            None => comment,
                        });
                    }
                }
            }
            '(' => {
                let mut depth = 0usize;
                for c in chars.by_ref() {
                    match c {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                if depth != 0 {
                    return Err(PgnError::InvalidFormat);
                }
            }
            ')' => return Err(PgnError::InvalidFormat),
            '$' => {
                chars.next();
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let nag = digits
                    .parse::<u8>()
                    .map_err(|_| PgnError::InvalidFormat)?;
                if let Some(last) = game.moves.last_mut() {
                    last.nags.push(nag);
                }
            }
            _ => {
                let mut token = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || "[]{}();$".contains(c) {
                        break;
                    }
                    token.push(c);
                    chars.next();
                }
                if let Some(result) = GameResult::from_token(&token) {
                    game.result = result;
                    continue;
                }
                let san = strip_move_number(&token);
                if !san.is_empty() {
                    game.moves.push(PgnMove {
                        san: san.to_string(),
                        comment: None,
                        nags: Vec::new(),
                    });
                }
            }
        }
    }

    if game.tags.is_empty() && game.moves.is_empty() {
        return Err(PgnError::InvalidFormat);
    }

    Ok(game)
}

/// "12." / "12..." / "12.e4" → "" / "" / "e4"
fn strip_move_number(token: &str) -> &str {
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == token.len() {
        return token;
    }
    if rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else {
        // Bare digits are not a move.
        rest
    }
}

fn parse_tag(raw: &str) -> Result<(String, String), PgnError> {
    let raw = raw.trim();
    let (name, rest) = raw
        .split_once(char::is_whitespace)
        .ok_or_else(|| PgnError::InvalidTag(raw.to_string()))?;
    let value = rest.trim();
    if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
        return Err(PgnError::InvalidTag(raw.to_string()));
    }
    let value = value[1..value.len() - 1]
        .replace("\\\"", "\"")
        .replace("\\\\", "\\");
    Ok((name.to_string(), value))
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("Invalid PGN format")]
    InvalidFormat,
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error("SAN parse error: {0}")]
    SanError(#[from] super::san::SanError),
}
