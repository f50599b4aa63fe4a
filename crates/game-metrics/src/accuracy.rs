//! Win% and per-move accuracy, pure functions only.

/// Logistic slope mapping centipawns to winning chances
const WIN_PERCENT_SLOPE: f64 = 0.00368208;

const ACCURACY_SCALE: f64 = 103.1668;
const ACCURACY_DECAY: f64 = 0.04354;
const ACCURACY_OFFSET: f64 = 3.1669;

/// Estimated winning chances (0–100) for the side whose point of view `cp` is in.
pub fn win_percent(cp: f64) -> f64 {
    50.0 + 50.0 * (2.0 / (1.0 + (-WIN_PERCENT_SLOPE * cp).exp()) - 1.0)
}

/// Accuracy of a move that changed the mover's Win% by `win_diff`.
///
/// Close to 100 for a zero change, decaying towards 0 as the drop grows.
pub fn move_accuracy(win_diff: f64) -> f64 {
    ACCURACY_SCALE * (-ACCURACY_DECAY * win_diff.abs()).exp() - ACCURACY_OFFSET
}
