#![allow(dead_code)]

use chess_core::{GameData, GameMetadata};
use game_metrics::{EvaluationSequence, GameMetricRecord, PerformanceTable};

pub const SCHOLARS_MATE: &str = r#"[Event "Rated Blitz game"]
[Site "https://lichess.org/abcd1234"]
[Date "2024.03.02"]
[White "alice"]
[Black "bob"]
[Result "1-0"]
[TimeControl "180+0"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6?? 4. Qxf7# 1-0
"#;

pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected} ± {tol}, got {actual}"
    );
}

/// Game shell with `plies` placeholder moves; only the move count matters to
/// the metric pipeline.
pub fn game(white: &str, black: &str, plies: usize) -> GameData {
    GameData {
        metadata: GameMetadata {
            white: white.to_string(),
            black: black.to_string(),
            result: "*".to_string(),
            date: None,
            time_control: None,
            event: None,
            site: None,
        },
        moves: vec!["e4".to_string(); plies],
        pgn: String::new(),
    }
}

/// Deterministic generator so table fixtures are reproducible.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Uniform in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Evaluation sequence in which every ply loses a drawn amount for its mover.
pub fn evals_with_losses(plies: usize, mut loss_cp: impl FnMut(usize) -> f64) -> EvaluationSequence {
    let mut values = vec![0.3];
    for ply in 1..=plies {
        let prev = values[ply - 1];
        let loss = loss_cp(ply) / 100.0;
        // odd plies are White's
        values.push(if ply % 2 == 1 { prev - loss } else { prev + loss });
    }
    EvaluationSequence::new(values)
}

/// Table of `n` games of 60 plies for player "me" (White), losses drawn by `loss_cp`.
pub fn synthetic_table(n: usize, seed: u64, mut loss_cp: impl FnMut(&mut Lcg) -> f64) -> PerformanceTable {
    let mut rng = Lcg::new(seed);
    let games: Vec<(GameData, EvaluationSequence)> = (0..n)
        .map(|i| {
            let g = game("me", &format!("opp{i}"), 60);
            let e = evals_with_losses(60, |_| loss_cp(&mut rng));
            (g, e)
        })
        .collect();
    PerformanceTable::build(
        "me",
        games.iter().map(|(g, e)| (g, e)),
        &game_metrics::MetricsConfig::default(),
    )
}

pub fn record(accuracy: f64, avg_loss: f64, blunders: u32) -> GameMetricRecord {
    GameMetricRecord {
        opponent: "opp".to_string(),
        color: chess_core::Side::White,
        accuracy,
        avg_loss,
        blunders,
        mistakes: 1,
        inaccuracies: 2,
        total_moves: 35,
    }
}
