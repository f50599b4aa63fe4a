//! Normality and variance-equality audits of performance-table columns.
//!
//! Audits only report evidence. Deciding which test family to run is the
//! caller's job (see [`crate::detector::Strategy::from_audits`]).

use std::fmt;
use std::str::FromStr;

use game_metrics::{Metric, PerformanceTable};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::descriptive::Summary;
use crate::detector::DetectorConfig;
use crate::error::StatsError;
use crate::hypothesis::TestStatistic;
use crate::normality::{omnibus, shapiro_wilk};
use crate::variance::{bartlett, levene_median};

/// Monotone transform applied to a column before auditing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricTransform {
    #[default]
    Identity,
    /// Pulls in a left tail (accuracy bunches up near 100)
    Square,
    /// Pulls in a right tail (loss has a long upper tail)
    Sqrt,
}

impl MetricTransform {
    pub fn apply_one(&self, x: f64) -> f64 {
        match self {
            MetricTransform::Identity => x,
            MetricTransform::Square => x * x,
            MetricTransform::Sqrt => x.max(0.0).sqrt(),
        }
    }

    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&x| self.apply_one(x)).collect()
    }
}

impl fmt::Display for MetricTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricTransform::Identity => "identity",
            MetricTransform::Square => "square",
            MetricTransform::Sqrt => "sqrt",
        };
        f.write_str(name)
    }
}

impl FromStr for MetricTransform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" | "none" => Ok(MetricTransform::Identity),
            "square" => Ok(MetricTransform::Square),
            "sqrt" => Ok(MetricTransform::Sqrt),
            other => Err(format!("unknown transform: {other}")),
        }
    }
}

/// Shape summary and normality tests for one column.
///
/// A test whose preconditions the sample does not meet is left as `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityAudit {
    pub name: String,
    pub transform: MetricTransform,
    pub count: usize,
    pub summary: Option<Summary>,
    pub omnibus: Option<TestStatistic>,
    pub shapiro_wilk: Option<TestStatistic>,
}

fn keep<T>(name: &str, test: &'static str, result: Result<T, StatsError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(column = name, test, error = %e, "Audit test skipped");
            None
        }
    }
}

impl NormalityAudit {
    pub fn run(name: impl Into<String>, values: &[f64]) -> Result<Self, StatsError> {
        Self::run_transformed(name, values, MetricTransform::Identity)
    }

    pub fn run_transformed(
        name: impl Into<String>,
        values: &[f64],
        transform: MetricTransform,
    ) -> Result<Self, StatsError> {
        let name = name.into();
        if values.is_empty() {
            return Err(StatsError::EmptySample("normality audit"));
        }
        let data = transform.apply(values);

        Ok(Self {
            summary: keep(&name, "summary", Summary::of(&data)),
            omnibus: keep(&name, "omnibus", omnibus(&data)),
            shapiro_wilk: keep(&name, "shapiro-wilk", shapiro_wilk(&data)),
            count: data.len(),
            transform,
            name,
        })
    }

    /// Audit one column of a table.
    pub fn of_column(
        table: &PerformanceTable,
        metric: Metric,
        transform: MetricTransform,
    ) -> Result<Self, StatsError> {
        Self::run_transformed(metric.name(), &table.column(metric), transform)
    }

    /// True when at least one normality test ran and none rejected at `alpha`.
    pub fn looks_normal(&self, alpha: f64) -> bool {
        let tests: Vec<&TestStatistic> = self.omnibus.iter().chain(&self.shapiro_wilk).collect();
        !tests.is_empty() && tests.iter().all(|t| t.p_value > alpha)
    }
}

/// Equal-variance evidence between a baseline and a suspect table.
///
/// Accuracy and average loss use Bartlett's test on transformed values,
/// blunder counts use the median-centred Levene test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceAudit {
    pub accuracy: Option<TestStatistic>,
    pub avg_loss: Option<TestStatistic>,
    pub blunders: Option<TestStatistic>,
}

impl VarianceAudit {
    pub fn run(
        baseline: &PerformanceTable,
        suspect: &PerformanceTable,
        config: &DetectorConfig,
    ) -> Result<Self, StatsError> {
        if baseline.is_empty() {
            return Err(StatsError::EmptySample("baseline"));
        }
        if suspect.is_empty() {
            return Err(StatsError::EmptySample("suspect"));
        }

        let transformed = |metric: Metric, t: MetricTransform| {
            (t.apply(&baseline.column(metric)), t.apply(&suspect.column(metric)))
        };

        let (b, s) = transformed(Metric::Accuracy, config.accuracy_transform);
        let accuracy = keep("Accuracy", "bartlett", bartlett(&[&b, &s]));

        let (b, s) = transformed(Metric::AvgLoss, config.avg_loss_transform);
        let avg_loss = keep("AvgLoss", "bartlett", bartlett(&[&b, &s]));

        let (b, s) = transformed(Metric::Blunders, MetricTransform::Identity);
        let blunders = keep("Blunders", "levene", levene_median(&[&b, &s]));

        if accuracy.is_none() || avg_loss.is_none() {
            warn!(
                baseline = baseline.len(),
                suspect = suspect.len(),
                "Variance equality could not be assessed for every metric"
            );
        }

        Ok(Self {
            accuracy,
            avg_loss,
            blunders,
        })
    }

    pub fn p_value(&self, metric: Metric) -> Option<f64> {
        let stat = match metric {
            Metric::Accuracy => self.accuracy.as_ref(),
            Metric::AvgLoss => self.avg_loss.as_ref(),
            Metric::Blunders => self.blunders.as_ref(),
            _ => None,
        };
        stat.map(|s| s.p_value)
    }

    /// Variances are treated as equal when the test ran and its p-value
    /// exceeds `cutoff`.
    pub fn equal(&self, metric: Metric, cutoff: f64) -> bool {
        self.p_value(metric).is_some_and(|p| p > cutoff)
    }
}
