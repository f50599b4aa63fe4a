//! Game model, PGN parsing and SAN replay shared by the metric pipeline and the worker.

pub mod error;
pub mod game_data;
pub mod pgn;
pub mod replay;

pub use error::ChessError;
pub use game_data::{GameData, GameMetadata, Side};
