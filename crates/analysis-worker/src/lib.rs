//! Engine-side plumbing: Stockfish processes, concurrent game evaluation,
//! Lichess export and worker configuration.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod lichess;
pub mod stockfish;

pub use config::{SearchLimit, WorkerConfig};
pub use error::WorkerError;
pub use evaluator::{evaluate_game, EnginePool};
pub use lichess::{GameQuery, LichessClient, LichessGame};
pub use stockfish::StockfishEngine;
