//! Opening names for the first few moves of a game.

/// ECO code, name and the SAN moves that define the line.
const OPENINGS: &[(&str, &str, &str)] = &[
    ("B00", "King's Pawn Opening", "e4"),
    ("C20", "King's Pawn Game", "e4 e5"),
    ("C40", "Petrov Defense", "e4 e5 Nf3 Nf6"),
    ("C50", "Italian Game", "e4 e5 Nf3 Nc6 Bc4"),
    ("C60", "Ruy Lopez", "e4 e5 Nf3 Nc6 Bb5"),
    ("B01", "Scandinavian Defense", "e4 d5"),
    ("B20", "Sicilian Defense", "e4 c5"),
    ("D00", "Queen's Pawn Game", "d4 d5"),
    ("D30", "Queen's Gambit", "d4 d5 c4"),
    ("E60", "King's Indian Defense", "d4 Nf6 c4 g6 Nc3 Bg7 e4 d6"),
    ("A40", "Queen's Pawn", "d4"),
    ("A00", "Irregular Opening", "b3"),
];

/// Name of the longest table line the game starts with, as `"ECO · Name"`.
pub fn detect_opening<S: AsRef<str>>(sans: &[S]) -> Option<String> {
    let played = sans
        .iter()
        .map(|san| {
            san.as_ref()
                .chars()
                .filter(|c| !matches!(c, '+' | '#' | '!' | '?'))
                .collect::<String>()
                .to_lowercase()
        })
        .collect::<Vec<_>>()
        .join(" ");

    OPENINGS
        .iter()
        .filter(|(_, _, line)| {
            let line = line.to_lowercase();
            played == line || played.starts_with(&format!("{} ", line))
        })
        .max_by_key(|(_, _, line)| line.len())
        .map(|(eco, name, _)| format!("{} · {}", eco, name))
}
