//! Performance table: one row per analyzable game for a tracked player.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chess_core::{GameData, Side};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::{aggregate, GameMetrics};
use crate::config::MetricsConfig;
use crate::error::TableError;
use crate::eval::EvaluationSequence;
use crate::loss::extract_losses;

/// Column of a performance table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Accuracy,
    AvgLoss,
    Blunders,
    Mistakes,
    Inaccuracies,
    TotalMoves,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Accuracy,
        Metric::AvgLoss,
        Metric::Blunders,
        Metric::Mistakes,
        Metric::Inaccuracies,
        Metric::TotalMoves,
    ];

    /// Column header, as written to CSV.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy => "Accuracy",
            Metric::AvgLoss => "AvgLoss",
            Metric::Blunders => "Blunders",
            Metric::Mistakes => "Mistakes",
            Metric::Inaccuracies => "Inaccuracies",
            Metric::TotalMoves => "TotalMoves",
        }
    }
}

/// One game, seen from the tracked player's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetricRecord {
    #[serde(rename = "Opponent")]
    pub opponent: String,
    #[serde(rename = "Color")]
    pub color: Side,
    /// Average accuracy, one decimal
    #[serde(rename = "Accuracy")]
    pub accuracy: f64,
    /// Average centipawn loss, one decimal
    #[serde(rename = "AvgLoss")]
    pub avg_loss: f64,
    #[serde(rename = "Blunders")]
    pub blunders: u32,
    #[serde(rename = "Mistakes")]
    pub mistakes: u32,
    #[serde(rename = "Inaccuracies")]
    pub inaccuracies: u32,
    #[serde(rename = "TotalMoves")]
    pub total_moves: u32,
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

impl GameMetricRecord {
    pub fn from_metrics(opponent: impl Into<String>, color: Side, metrics: &GameMetrics) -> Self {
        Self {
            opponent: opponent.into(),
            color,
            accuracy: round1(metrics.accuracy),
            avg_loss: round1(metrics.avg_loss),
            blunders: metrics.blunders,
            mistakes: metrics.mistakes,
            inaccuracies: metrics.inaccuracies,
            total_moves: metrics.moves,
        }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Accuracy => self.accuracy,
            Metric::AvgLoss => self.avg_loss,
            Metric::Blunders => self.blunders as f64,
            Metric::Mistakes => self.mistakes as f64,
            Metric::Inaccuracies => self.inaccuracies as f64,
            Metric::TotalMoves => self.total_moves as f64,
        }
    }
}

/// Derive the record for one game, or `None` if the game yields no usable data.
pub fn record_for_game(
    username: &str,
    game: &GameData,
    evals: &EvaluationSequence,
    config: &MetricsConfig,
) -> Option<GameMetricRecord> {
    let side = game.side_of(username)?;
    let opponent = game.opponent_of(username)?;
    let losses = extract_losses(evals);
    let metrics = aggregate(evals, &losses, side, &config.thresholds)?;
    Some(GameMetricRecord::from_metrics(opponent, side, &metrics))
}

/// Count/mean/std/min/max of one column, the way a quick `describe()` reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub metric: Metric,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two rows
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Ordered collection of per-game records. Never holds a row with zero moves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTable {
    rows: Vec<GameMetricRecord>,
}

impl PerformanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table for `username`, one row per game in input order.
    ///
    /// Games the user did not play, games whose analysis failed, and games in
    /// which the user made no move are skipped.
    pub fn build<'a, I>(username: &str, games: I, config: &MetricsConfig) -> Self
    where
        I: IntoIterator<Item = (&'a GameData, &'a EvaluationSequence)>,
    {
        let mut table = Self::new();
        for (index, (game, evals)) in games.into_iter().enumerate() {
            if game.side_of(username).is_none() {
                warn!(index, white = %game.metadata.white, black = %game.metadata.black, username, "User did not play this game, skipping");
                continue;
            }
            if evals.is_empty() {
                warn!(index, "No evaluations for game, skipping");
                continue;
            }
            match record_for_game(username, game, evals, config) {
                Some(record) => {
                    table.push(record);
                }
                None => debug!(index, plies = evals.ply_count(), "Game has no tracked moves"),
            }
        }
        table
    }

    /// Append a record; rows without moves are dropped. Returns whether it was kept.
    pub fn push(&mut self, record: GameMetricRecord) -> bool {
        if record.total_moves == 0 {
            debug!(opponent = %record.opponent, "Dropping record with zero moves");
            return false;
        }
        self.rows.push(record);
        true
    }

    /// Keep only games in which the player made more than `min` moves.
    pub fn with_min_moves(mut self, min: u32) -> Self {
        self.rows.retain(|r| r.total_moves > min);
        self
    }

    pub fn rows(&self) -> &[GameMetricRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, metric: Metric) -> Vec<f64> {
        self.rows.iter().map(|r| r.value(metric)).collect()
    }

    pub fn describe(&self) -> Vec<ColumnSummary> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        Metric::ALL
            .iter()
            .map(|&metric| {
                let values = self.column(metric);
                let n = values.len();
                let mean = values.iter().sum::<f64>() / n as f64;
                let std = (n > 1).then(|| {
                    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
                    (ss / (n - 1) as f64).sqrt()
                });
                ColumnSummary {
                    metric,
                    count: n,
                    mean,
                    std,
                    min: values.iter().copied().fold(f64::INFINITY, f64::min),
                    max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                }
            })
            .collect()
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut table = Self::new();
        for result in rdr.deserialize() {
            let record: GameMetricRecord = result?;
            table.push(record);
        }
        Ok(table)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn read_csv_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        Self::read_csv(File::open(path)?)
    }

    pub fn write_csv_path(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        self.write_csv(File::create(path)?)
    }
}

impl FromIterator<GameMetricRecord> for PerformanceTable {
    fn from_iter<T: IntoIterator<Item = GameMetricRecord>>(iter: T) -> Self {
        let mut table = Self::new();
        for record in iter {
            table.push(record);
        }
        table
    }
}

impl<'a> IntoIterator for &'a PerformanceTable {
    type Item = &'a GameMetricRecord;
    type IntoIter = std::slice::Iter<'a, GameMetricRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
