use thiserror::Error;

/// Per-game data errors. Callers skip the offending game and keep going.
#[derive(Error, Debug)]
pub enum ChessError {
    #[error("PGN has no movetext")]
    EmptyMovetext,

    #[error("Non-standard starting position: {0}")]
    NonStandardStart(String),

    #[error("Invalid SAN '{san}' at ply {ply}")]
    InvalidSan { ply: usize, san: String },

    #[error("Illegal move '{san}' at ply {ply}")]
    IllegalMove { ply: usize, san: String },
}
