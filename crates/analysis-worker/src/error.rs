//! Worker error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stockfish error: {0}")]
    Stockfish(String),

    #[error("Lichess error: {0}")]
    Lichess(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Chess error: {0}")]
    Chess(#[from] chess_core::ChessError),
}
