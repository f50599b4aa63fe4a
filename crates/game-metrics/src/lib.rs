//! Evaluation-to-metric pipeline.
//!
//! Raw engine scores are normalized into an [`eval::EvaluationSequence`],
//! turned into per-ply centipawn losses, aggregated into per-game metrics for
//! one tracked player, and collected into a [`table::PerformanceTable`].
//! Everything here is pure and synchronous.

pub mod accuracy;
pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod eval;
pub mod loss;
pub mod table;

pub use aggregate::{aggregate, GameMetrics};
pub use classify::{MoveClass, SideThresholds, Thresholds};
pub use config::MetricsConfig;
pub use error::TableError;
pub use eval::{normalize, EvaluationSequence, NormalizerConfig, Score};
pub use loss::{extract_losses, LossSequence};
pub use table::{GameMetricRecord, Metric, PerformanceTable};
