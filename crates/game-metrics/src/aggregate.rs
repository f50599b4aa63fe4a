//! Per-game summary of one player's moves.

use chess_core::Side;
use serde::{Deserialize, Serialize};

use crate::accuracy::{move_accuracy, win_percent};
use crate::classify::{MoveClass, Thresholds};
use crate::eval::EvaluationSequence;
use crate::loss::LossSequence;

/// Unrounded aggregate over the tracked player's moves in one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    pub accuracy: f64,
    /// Average centipawn loss
    pub avg_loss: f64,
    pub blunders: u32,
    pub mistakes: u32,
    pub inaccuracies: u32,
    pub moves: u32,
}

/// Aggregate the plies played by `side`.
///
/// Returns `None` when the player made no moves or when `losses` was not
/// derived from `evals` (lengths disagree); such games carry no record.
pub fn aggregate(
    evals: &EvaluationSequence,
    losses: &LossSequence,
    side: Side,
    thresholds: &Thresholds,
) -> Option<GameMetrics> {
    let e = evals.as_slice();
    if losses.is_empty() || e.len() != losses.len() + 1 {
        return None;
    }

    let mut total_accuracy = 0.0;
    let mut total_loss = 0.0;
    let mut metrics = GameMetrics::default();

    for ply in (1..=losses.len()).filter(|&p| Side::of_ply(p) == side) {
        let mut cp_before = e[ply - 1] * 100.0;
        let mut cp_after = e[ply] * 100.0;
        if side == Side::Black {
            cp_before = -cp_before;
            cp_after = -cp_after;
        }

        let win_diff = win_percent(cp_before) - win_percent(cp_after);
        total_accuracy += move_accuracy(win_diff);

        let loss = losses.as_slice()[ply - 1];
        total_loss += loss;

        match thresholds.classify(side, loss) {
            MoveClass::Blunder => metrics.blunders += 1,
            MoveClass::Mistake => metrics.mistakes += 1,
            MoveClass::Inaccuracy => metrics.inaccuracies += 1,
            MoveClass::Ok => {}
        }
        metrics.moves += 1;
    }

    if metrics.moves == 0 {
        return None;
    }

    metrics.accuracy = total_accuracy / metrics.moves as f64;
    metrics.avg_loss = total_loss / metrics.moves as f64;
    Some(metrics)
}
