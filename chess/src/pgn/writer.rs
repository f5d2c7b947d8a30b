use super::parser::GameResult;

/// Tags every exported game carries, in PGN's required order.
const SEVEN_TAG_ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

const MAX_LINE_WIDTH: usize = 80;

/// Render a game record.
///
/// `first_move_number` and `black_first` describe where the movetext starts
/// (games loaded from FEN need not start at move 1 with White).
pub fn write_pgn(
    tags: &[(String, String)],
    sans: &[String],
    result: GameResult,
    first_move_number: u16,
    black_first: bool,
) -> String {
    let mut out = String::new();

    for name in SEVEN_TAG_ROSTER {
        let value = if name == "Result" {
            result.as_pgn().to_string()
        } else {
            tag_value(tags, name).unwrap_or("?").to_string()
        };
        push_tag(&mut out, name, &value);
    }
    for (name, value) in tags {
        if !SEVEN_TAG_ROSTER.contains(&name.as_str()) {
            push_tag(&mut out, name, value);
        }
    }
    out.push('\n');

    let mut tokens = Vec::with_capacity(sans.len() * 3 / 2 + 1);
    let mut number = first_move_number;
    let mut white_to_move = !black_first;
    for (i, san) in sans.iter().enumerate() {
        if white_to_move {
            tokens.push(format!("{}.", number));
        } else if i == 0 {
            tokens.push(format!("{}...", number));
        }
        tokens.push(san.clone());
        if !white_to_move {
            number += 1;
        }
        white_to_move = !white_to_move;
    }
    tokens.push(result.as_pgn().to_string());

    let mut line_len = 0;
    for token in tokens {
        if line_len > 0 && line_len + 1 + token.len() > MAX_LINE_WIDTH {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        line_len += token.len();
        out.push_str(&token);
    }
    out.push('\n');
    out
}

fn tag_value<'a>(tags: &'a [(String, String)], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn push_tag(out: &mut String, name: &str, value: &str) {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    out.push_str(&format!("[{} \"{}\"]\n", name, escaped));
}
