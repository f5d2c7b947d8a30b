use crate::{BestMove, EngineEvent, EngineInfo, Score};

/// Incoming message from UCI engine
#[derive(Debug, Clone, PartialEq)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    Option(String),
    BestMove(BestMove),
    Info(EngineInfo),
}

/// Turn one line of engine output into at most one event.
///
/// Only `readyok`, scored or depth-bearing `info` lines and `bestmove`
/// produce events. Everything else (ids, options, `info string` banners,
/// unknown chatter) is ignored rather than reported.
pub fn parse_line(line: &str) -> Option<EngineEvent> {
    match parse_uci_message(line).ok()? {
        UciMessage::ReadyOk => Some(EngineEvent::Ready),
        UciMessage::Info(info) if info.depth.is_some() || info.score.is_some() => {
            Some(EngineEvent::Info(info))
        }
        UciMessage::BestMove(best) => Some(EngineEvent::BestMove(best)),
        _ => None,
    }
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, crate::UciError> {
    let line = line.trim();
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        None => Err(crate::UciError::Empty),

        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"option") => Ok(UciMessage::Option(tokens[1..].join(" "))),

        Some(&"bestmove") => {
            let mv = tokens.get(1).and_then(|t| move_token(t));
            let ponder = match tokens.get(2) {
                Some(&"ponder") => tokens.get(3).and_then(|t| move_token(t)),
                _ => None,
            };
            Ok(UciMessage::BestMove(BestMove { mv, ponder }))
        }

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(line, &tokens[1..]))),

        _ => Err(crate::UciError::UnknownMessage(line.to_string())),
    }
}

/// Parse an "info" line from the engine
///
/// Numeric fields that fail to parse are left as `None`.
fn parse_info_line(line: &str, tokens: &[&str]) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                info.depth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "seldepth" => {
                i += 1;
                info.seldepth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "time" => {
                i += 1;
                info.time_ms = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nodes" => {
                i += 1;
                info.nodes = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nps" => {
                i += 1;
                info.nps = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "multipv" => {
                i += 1;
                info.multipv = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "score" => {
                i += 1;
                if let Some(&score_type) = tokens.get(i) {
                    i += 1;
                    if let Some(value_str) = tokens.get(i) {
                        info.score = match score_type {
                            "cp" => value_str.parse().ok().map(Score::Centipawns),
                            "mate" => value_str.parse().ok().map(Score::Mate),
                            _ => None,
                        };
                    }
                }
            }
            // The PV runs to the end of the line and `string` is free text.
            "pv" | "string" => break,
            _ => {
                // Unknown keyword or value (bounds, currmove, hashfull), skip
            }
        }
        i += 1;
    }

    if !tokens.first().is_some_and(|t| *t == "string") {
        if let Some(idx) = line.find(" pv ") {
            info.pv = line[idx + 4..].trim().to_string();
        }
    }

    info
}

/// Coordinate move tokens are 4-5 characters; `(none)` and the null move
/// `0000` mean there is no move.
fn move_token(token: &str) -> Option<String> {
    let valid = (4..=5).contains(&token.len())
        && token.is_ascii()
        && token != "0000"
        && token.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| token.to_string())
}
