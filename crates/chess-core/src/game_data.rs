use std::fmt;

use serde::{Deserialize, Serialize};

/// Color a tracked player had in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Side that moves at 1-indexed ply `ply` (ply 1 is White's first move).
    pub fn of_ply(ply: usize) -> Self {
        if ply % 2 == 1 {
            Side::White
        } else {
            Side::Black
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => f.write_str("White"),
            Side::Black => f.write_str("Black"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub white: String,
    pub black: String,
    pub result: String, // "1-0", "0-1", "1/2-1/2", "*"
    pub date: Option<String>,
    pub time_control: Option<String>,
    pub event: Option<String>,
    pub site: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameData {
    pub metadata: GameMetadata,
    pub moves: Vec<String>, // SAN notation
    pub pgn: String,
}

impl GameData {
    /// Which side `username` played, compared case-insensitively.
    pub fn side_of(&self, username: &str) -> Option<Side> {
        let username = username.to_lowercase();
        if self.metadata.white.to_lowercase() == username {
            Some(Side::White)
        } else if self.metadata.black.to_lowercase() == username {
            Some(Side::Black)
        } else {
            None
        }
    }

    /// The header name on the other side of the board from `username`.
    pub fn opponent_of(&self, username: &str) -> Option<&str> {
        match self.side_of(username)? {
            Side::White => Some(&self.metadata.black),
            Side::Black => Some(&self.metadata.white),
        }
    }

    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }
}
