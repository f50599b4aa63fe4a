//! Lightweight regex-based PGN parsing.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ChessError;
use crate::game_data::{GameData, GameMetadata};

const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).expect("valid header regex"))
}

fn tag_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\[\w+\s+"[^"]*"\]$"#).expect("valid tag line regex"))
}

fn move_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O[+#]?|O-O[+#]?")
            .expect("valid move regex")
    })
}

/// Parse a single PGN game into a GameData struct.
pub fn parse_pgn(pgn: &str) -> Result<GameData, ChessError> {
    let mut white = "Unknown".to_string();
    let mut black = "Unknown".to_string();
    let mut result = "*".to_string();
    let mut date = None;
    let mut time_control = None;
    let mut event = None;
    let mut site = None;
    let mut setup = None;
    let mut fen = None;

    for cap in header_re().captures_iter(pgn) {
        let key = &cap[1];
        let value = cap[2].to_string();
        match key {
            "White" => white = value,
            "Black" => black = value,
            "Result" => result = value,
            "Date" | "UTCDate" if date.is_none() => date = Some(value),
            "TimeControl" => time_control = Some(value),
            "Event" => event = Some(value),
            "Site" => site = Some(value),
            "SetUp" => setup = Some(value),
            "FEN" => fen = Some(value),
            _ => {}
        }
    }

    // Analysis assumes the standard initial position
    if setup.as_deref() == Some("1") {
        if let Some(f) = fen {
            if f != STANDARD_START_FEN {
                return Err(ChessError::NonStandardStart(f));
            }
        }
    }

    let moves = extract_moves(pgn);
    if moves.is_empty() {
        return Err(ChessError::EmptyMovetext);
    }

    Ok(GameData {
        metadata: GameMetadata {
            white,
            black,
            result,
            date,
            time_control,
            event,
            site,
        },
        moves,
        pgn: pgn.to_string(),
    })
}

/// Split a multi-game PGN file into per-game chunks.
///
/// A new game starts at the first tag-pair line that follows movetext.
/// Lines inside a `{ ... }` comment never start a game, even when a wrapped
/// clock annotation puts `[` at the start of the line.
pub fn split_games(text: &str) -> Vec<&str> {
    let mut games = Vec::new();
    let mut start: Option<usize> = None;
    let mut seen_movetext = false;
    let mut in_comment = false;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if !in_comment && tag_line_re().is_match(trimmed) {
            if seen_movetext {
                if let Some(s) = start {
                    games.push(text[s..offset].trim());
                }
                start = None;
                seen_movetext = false;
            }
            if start.is_none() {
                start = Some(offset);
            }
        } else if !trimmed.is_empty() {
            if start.is_none() {
                start = Some(offset);
            }
            seen_movetext = true;
            in_comment = ends_in_comment(trimmed, in_comment);
        }
        offset += line.len();
    }

    if let Some(s) = start {
        let chunk = text[s..].trim();
        if !chunk.is_empty() {
            games.push(chunk);
        }
    }

    games
}

/// Whether a `{` comment is still open at the end of `line`.
fn ends_in_comment(line: &str, mut open: bool) -> bool {
    for c in line.chars() {
        match c {
            '{' => open = true,
            '}' => open = false,
            _ => {}
        }
    }
    open
}

/// Parse every game in a PGN file, keeping per-game failures separate.
pub fn parse_pgn_file(text: &str) -> Vec<Result<GameData, ChessError>> {
    split_games(text).into_iter().map(parse_pgn).collect()
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
fn extract_moves(pgn: &str) -> Vec<String> {
    static CLEANUP: OnceLock<[Regex; 3]> = OnceLock::new();
    let [headers, comments, variations] = CLEANUP.get_or_init(|| {
        [
            Regex::new(r"\[[^\]]*\]").expect("valid regex"),
            Regex::new(r"\{[^}]*\}").expect("valid regex"),
            Regex::new(r"\([^)]*\)").expect("valid regex"),
        ]
    });

    let no_headers = headers.replace_all(pgn, "");
    let no_comments = comments.replace_all(&no_headers, "");
    let no_variations = variations.replace_all(&no_comments, "");

    move_re()
        .find_iter(&no_variations)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract a string value from a PGN header (e.g. WhiteElo, Termination).
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    let pattern = format!(r#"\[{}\s+"([^"]*)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(pgn)?.get(1)?.as_str().to_string();
    if value.is_empty() { None } else { Some(value) }
}
