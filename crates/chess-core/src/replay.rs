//! Replays SAN movetext with shakmaty to get the positions an engine scores.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{Chess, Color, EnPassantMode, Position};

use crate::error::ChessError;

/// Position reached after a ply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedPosition {
    /// 1-indexed ply that produced this position
    pub ply: usize,
    pub fen: String,
    /// Side to move in this position (the opponent of whoever just moved)
    pub white_to_move: bool,
    pub is_checkmate: bool,
}

/// Play `moves` from the standard start, returning one position per ply.
///
/// Stops with an error at the first unparsable or illegal move; the caller
/// treats the whole game as unusable.
pub fn replay(moves: &[String]) -> Result<Vec<ReplayedPosition>, ChessError> {
    let mut pos = Chess::default();
    let mut positions = Vec::with_capacity(moves.len());

    for (i, san_str) in moves.iter().enumerate() {
        let ply = i + 1;
        let san: SanPlus = san_str.trim().parse().map_err(|_| ChessError::InvalidSan {
            ply,
            san: san_str.clone(),
        })?;
        let mv = san.san.to_move(&pos).map_err(|_| ChessError::IllegalMove {
            ply,
            san: san_str.clone(),
        })?;
        pos.play_unchecked(mv);

        positions.push(ReplayedPosition {
            ply,
            fen: Fen::from_position(&pos, EnPassantMode::Legal).to_string(),
            white_to_move: pos.turn() == Color::White,
            is_checkmate: pos.is_checkmate(),
        });
    }

    Ok(positions)
}
