//! Score normalization: engine output to bounded pawn units, White's point of view.

use chess_core::Side;
use serde::{Deserialize, Serialize};

/// Raw engine score, already converted to White's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Centipawns(i32),
    /// Forced mate. `plies == 0` means the loser is already mated.
    Mate { plies: u32, winner: Side },
}

impl Score {
    /// Convert a UCI score (reported for the side to move) to White's point of view.
    ///
    /// A mate takes precedence over a centipawn value. `mate 0` means the side
    /// to move has been mated.
    pub fn from_engine(cp: Option<i32>, mate: Option<i32>, white_to_move: bool) -> Option<Self> {
        let mover = if white_to_move { Side::White } else { Side::Black };
        let other = if white_to_move { Side::Black } else { Side::White };

        if let Some(m) = mate {
            let winner = if m > 0 { mover } else { other };
            return Some(Score::Mate {
                plies: m.unsigned_abs(),
                winner,
            });
        }

        cp.map(|cp| Score::Centipawns(if white_to_move { cp } else { -cp }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Centipawn magnitude substituted for any forced mate
    pub mate_score_cp: i32,
    /// Results are clamped to ±clamp_pawns
    pub clamp_pawns: f64,
    /// Evaluation assigned to the starting position (first-move advantage)
    pub initial_eval: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            mate_score_cp: 10_000,
            clamp_pawns: 10.0,
            initial_eval: 0.3,
        }
    }
}

/// Normalize an engine score to pawns in `[-clamp, clamp]`.
///
/// A missing score (engine returned nothing) is neutral: 0.0.
pub fn normalize(score: Option<Score>, config: &NormalizerConfig) -> f64 {
    let pawns = match score {
        None => return 0.0,
        Some(Score::Centipawns(cp)) => cp as f64 / 100.0,
        Some(Score::Mate { winner, .. }) => {
            let magnitude = config.mate_score_cp as f64 / 100.0;
            match winner {
                Side::White => magnitude,
                Side::Black => -magnitude,
            }
        }
    };
    pawns.clamp(-config.clamp_pawns, config.clamp_pawns)
}

/// Per-ply evaluations in pawns, White's point of view.
///
/// Index 0 is the starting position; index `i` is the position after ply `i`.
/// An empty sequence marks a game whose analysis failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSequence(Vec<f64>);

impl EvaluationSequence {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Sequence for a game the engine could not analyze.
    pub fn failed() -> Self {
        Self(Vec::new())
    }

    /// Build from one engine score per ply, prefixed by `config.initial_eval`.
    pub fn from_scores<I>(scores: I, config: &NormalizerConfig) -> Self
    where
        I: IntoIterator<Item = Option<Score>>,
    {
        let mut values = vec![config.initial_eval];
        values.extend(scores.into_iter().map(|s| normalize(s, config)));
        Self(values)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Number of plies covered (one less than the number of evaluations).
    pub fn ply_count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}
