//! Per-ply centipawn loss, charged to the side that moved.

use chess_core::Side;
use serde::{Deserialize, Serialize};

use crate::eval::EvaluationSequence;

/// Centipawn loss per ply; entry `i - 1` belongs to ply `i`. Never negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossSequence(Vec<f64>);

impl LossSequence {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Loss at 1-indexed `ply`.
    pub fn at_ply(&self, ply: usize) -> Option<f64> {
        ply.checked_sub(1).and_then(|i| self.0.get(i).copied())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Loss of a single ply given the evaluation before and after it.
///
/// Evaluations are White-relative, so White loses when the score drops and
/// Black loses when it rises.
pub fn ply_loss(side: Side, before: f64, after: f64) -> f64 {
    let delta = after - before;
    match side {
        Side::White if delta < 0.0 => delta.abs() * 100.0,
        Side::Black if delta > 0.0 => delta * 100.0,
        _ => 0.0,
    }
}

/// Compute the loss of every ply in `evals`.
///
/// A failed (empty) or single-entry sequence has no plies and yields an empty
/// LossSequence.
pub fn extract_losses(evals: &EvaluationSequence) -> LossSequence {
    let losses = evals
        .as_slice()
        .windows(2)
        .enumerate()
        .map(|(i, w)| ply_loss(Side::of_ply(i + 1), w[0], w[1]))
        .collect();
    LossSequence(losses)
}
