//! Directional anomaly tests of a suspect table against a baseline.

use std::fmt;

use game_metrics::{Metric, PerformanceTable};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::audit::{MetricTransform, NormalityAudit, VarianceAudit};
use crate::error::StatsError;
use crate::hypothesis::{mann_whitney_u, t_test_pooled, t_test_welch, Alternative, TestStatistic};

/// Test family used for accuracy and average loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// t-tests on accuracy and loss, Mann–Whitney on blunders
    Parametric,
    /// Mann–Whitney on every metric
    NonParametric,
}

impl Strategy {
    /// Parametric only when every audit looks normal at `alpha`.
    pub fn from_audits(audits: &[NormalityAudit], alpha: f64) -> Self {
        if !audits.is_empty() && audits.iter().all(|a| a.looks_normal(alpha)) {
            Strategy::Parametric
        } else {
            Strategy::NonParametric
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Parametric => write!(f, "parametric"),
            Strategy::NonParametric => write!(f, "non-parametric"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    PooledT,
    WelchT,
    MannWhitneyU,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::PooledT => write!(f, "Student t (pooled)"),
            TestKind::WelchT => write!(f, "Welch t"),
            TestKind::MannWhitneyU => write!(f, "Mann-Whitney U"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Significance level for flagging a metric
    pub alpha: f64,
    /// Variance-test p-value above which the pooled t-test is used
    pub pooled_variance_cutoff: f64,
    pub accuracy_transform: MetricTransform,
    pub avg_loss_transform: MetricTransform,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            pooled_variance_cutoff: 0.5,
            accuracy_transform: MetricTransform::Square,
            avg_loss_transform: MetricTransform::Sqrt,
        }
    }
}

/// Outcome of one directional test. Built only by [`AnomalyDetector`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisTestResult {
    pub metric: Metric,
    pub test: TestKind,
    pub alternative: Alternative,
    #[serde(flatten)]
    pub outcome: TestOutcome,
}

/// A metric is either tested or skipped on its own; one degenerate column
/// never hides the other verdicts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TestOutcome {
    Completed {
        statistic: f64,
        p_value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        df: Option<f64>,
        anomalous: bool,
    },
    Skipped {
        #[serde(serialize_with = "as_message")]
        reason: StatsError,
    },
}

fn as_message<S: Serializer>(error: &StatsError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

impl HypothesisTestResult {
    fn new(
        metric: Metric,
        test: TestKind,
        alternative: Alternative,
        stat: Result<TestStatistic, StatsError>,
        alpha: f64,
    ) -> Self {
        let outcome = match stat {
            Ok(stat) => TestOutcome::Completed {
                statistic: stat.statistic,
                p_value: stat.p_value,
                df: stat.df,
                anomalous: stat.p_value < alpha,
            },
            Err(reason) => {
                warn!(metric = metric.name(), test = %test, error = %reason, "Anomaly test skipped");
                TestOutcome::Skipped { reason }
            }
        };
        Self {
            metric,
            test,
            alternative,
            outcome,
        }
    }

    pub fn p_value(&self) -> Option<f64> {
        match self.outcome {
            TestOutcome::Completed { p_value, .. } => Some(p_value),
            TestOutcome::Skipped { .. } => None,
        }
    }

    pub fn statistic(&self) -> Option<f64> {
        match self.outcome {
            TestOutcome::Completed { statistic, .. } => Some(statistic),
            TestOutcome::Skipped { .. } => None,
        }
    }

    /// A skipped test is never anomalous.
    pub fn is_anomalous(&self) -> bool {
        matches!(self.outcome, TestOutcome::Completed { anomalous: true, .. })
    }

    pub fn skip_reason(&self) -> Option<&StatsError> {
        match &self.outcome {
            TestOutcome::Completed { .. } => None,
            TestOutcome::Skipped { reason } => Some(reason),
        }
    }
}

/// Three independent results; no multiple-comparison adjustment is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub strategy: Strategy,
    pub alpha: f64,
    pub baseline_games: usize,
    pub suspect_games: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance: Option<VarianceAudit>,
    pub accuracy: HypothesisTestResult,
    pub avg_loss: HypothesisTestResult,
    pub blunders: HypothesisTestResult,
}

impl AnomalyReport {
    pub fn results(&self) -> [&HypothesisTestResult; 3] {
        [&self.accuracy, &self.avg_loss, &self.blunders]
    }

    pub fn any_anomalous(&self) -> bool {
        self.results().iter().any(|r| r.is_anomalous())
    }
}

pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Normality audits of the transformed accuracy and loss columns.
    pub fn audit_normality(&self, table: &PerformanceTable) -> Result<Vec<NormalityAudit>, StatsError> {
        Ok(vec![
            NormalityAudit::of_column(table, Metric::Accuracy, self.config.accuracy_transform)?,
            NormalityAudit::of_column(table, Metric::AvgLoss, self.config.avg_loss_transform)?,
        ])
    }

    /// Pick a strategy from the normality audits of both tables.
    pub fn choose_strategy(
        &self,
        baseline: &PerformanceTable,
        suspect: &PerformanceTable,
    ) -> Result<Strategy, StatsError> {
        let mut audits = self.audit_normality(baseline)?;
        audits.extend(self.audit_normality(suspect)?);
        let strategy = Strategy::from_audits(&audits, self.config.alpha);
        debug!(%strategy, audits = audits.len(), "Strategy chosen from normality audits");
        Ok(strategy)
    }

    pub fn detect(
        &self,
        baseline: &PerformanceTable,
        suspect: &PerformanceTable,
        strategy: Strategy,
    ) -> Result<AnomalyReport, StatsError> {
        if baseline.is_empty() {
            return Err(StatsError::EmptySample("baseline"));
        }
        if suspect.is_empty() {
            return Err(StatsError::EmptySample("suspect"));
        }

        let alpha = self.config.alpha;
        let columns = |metric: Metric| (suspect.column(metric), baseline.column(metric));

        let (variance, accuracy, avg_loss) = match strategy {
            Strategy::Parametric => {
                let variance = VarianceAudit::run(baseline, suspect, &self.config)?;
                let accuracy = self.t_test(&variance, Metric::Accuracy, Alternative::Greater, columns);
                let avg_loss = self.t_test(&variance, Metric::AvgLoss, Alternative::Less, columns);
                (Some(variance), accuracy, avg_loss)
            }
            Strategy::NonParametric => {
                let (s, b) = columns(Metric::Accuracy);
                let accuracy = HypothesisTestResult::new(
                    Metric::Accuracy,
                    TestKind::MannWhitneyU,
                    Alternative::Greater,
                    mann_whitney_u(&s, &b, Alternative::Greater),
                    alpha,
                );
                let (s, b) = columns(Metric::AvgLoss);
                let avg_loss = HypothesisTestResult::new(
                    Metric::AvgLoss,
                    TestKind::MannWhitneyU,
                    Alternative::Less,
                    mann_whitney_u(&s, &b, Alternative::Less),
                    alpha,
                );
                (None, accuracy, avg_loss)
            }
        };

        // Blunder counts are discrete and heavily tied in every strategy
        let (s, b) = columns(Metric::Blunders);
        let blunders = HypothesisTestResult::new(
            Metric::Blunders,
            TestKind::MannWhitneyU,
            Alternative::Less,
            mann_whitney_u(&s, &b, Alternative::Less),
            alpha,
        );

        let report = AnomalyReport {
            strategy,
            alpha,
            baseline_games: baseline.len(),
            suspect_games: suspect.len(),
            variance,
            accuracy,
            avg_loss,
            blunders,
        };

        for r in report.results() {
            if let Some(p_value) = r.p_value() {
                info!(
                    metric = r.metric.name(),
                    test = %r.test,
                    p_value,
                    anomalous = r.is_anomalous(),
                    "Anomaly test"
                );
            }
        }
        Ok(report)
    }

    fn t_test(
        &self,
        variance: &VarianceAudit,
        metric: Metric,
        alternative: Alternative,
        columns: impl Fn(Metric) -> (Vec<f64>, Vec<f64>),
    ) -> HypothesisTestResult {
        let (s, b) = columns(metric);
        let (kind, stat) = if variance.equal(metric, self.config.pooled_variance_cutoff) {
            (TestKind::PooledT, t_test_pooled(&s, &b, alternative))
        } else {
            (TestKind::WelchT, t_test_welch(&s, &b, alternative))
        };
        HypothesisTestResult::new(metric, kind, alternative, stat, self.config.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Side;
    use game_metrics::GameMetricRecord;

    fn table(rows: &[(f64, f64, u32)]) -> PerformanceTable {
        rows.iter()
            .map(|&(accuracy, avg_loss, blunders)| GameMetricRecord {
                opponent: "opp".to_string(),
                color: Side::Black,
                accuracy,
                avg_loss,
                blunders,
                mistakes: 1,
                inaccuracies: 2,
                total_moves: 40,
            })
            .collect()
    }

    fn baseline() -> PerformanceTable {
        table(&[
            (72.1, 48.0, 2),
            (80.4, 35.2, 1),
            (65.0, 61.5, 3),
            (77.7, 40.1, 1),
            (84.2, 28.9, 0),
            (70.3, 52.4, 2),
            (75.5, 44.0, 1),
            (68.8, 57.3, 3),
            (79.1, 37.6, 1),
            (73.6, 46.2, 2),
        ])
    }

    fn engine_like() -> PerformanceTable {
        table(&[
            (96.2, 8.1, 0),
            (97.5, 6.4, 0),
            (95.1, 10.2, 0),
            (98.0, 5.5, 0),
            (96.8, 7.3, 0),
            (97.1, 6.9, 0),
            (95.9, 9.0, 0),
            (96.5, 7.8, 0),
        ])
    }

    #[test]
    fn test_default_config() {
        let c = DetectorConfig::default();
        assert_eq!(c.alpha, 0.05);
        assert_eq!(c.pooled_variance_cutoff, 0.5);
        assert_eq!(c.accuracy_transform, MetricTransform::Square);
        assert_eq!(c.avg_loss_transform, MetricTransform::Sqrt);
    }

    #[test]
    fn test_identical_tables_are_not_anomalous() {
        let detector = AnomalyDetector::default();
        for strategy in [Strategy::Parametric, Strategy::NonParametric] {
            let report = detector.detect(&baseline(), &baseline(), strategy).unwrap();
            for r in report.results() {
                let p = r.p_value().unwrap();
                assert!(p >= 0.5 - 1e-12, "{strategy} {:?} p = {p}", r.metric);
                assert!(!r.is_anomalous());
            }
        }
    }

    #[test]
    fn test_parametric_uses_pooled_t_for_equal_spread() {
        let report = AnomalyDetector::default()
            .detect(&baseline(), &baseline(), Strategy::Parametric)
            .unwrap();
        assert_eq!(report.accuracy.test, TestKind::PooledT);
        assert_eq!(report.avg_loss.test, TestKind::PooledT);
        assert_eq!(report.blunders.test, TestKind::MannWhitneyU);
        assert!(report.variance.is_some());
    }

    #[test]
    fn test_engine_like_suspect_is_flagged() {
        let detector = AnomalyDetector::default();
        for strategy in [Strategy::Parametric, Strategy::NonParametric] {
            let report = detector.detect(&baseline(), &engine_like(), strategy).unwrap();
            assert!(report.accuracy.is_anomalous(), "{strategy}");
            assert!(report.avg_loss.is_anomalous(), "{strategy}");
            assert!(report.blunders.is_anomalous(), "{strategy}");
            assert_eq!(report.accuracy.alternative, Alternative::Greater);
            assert_eq!(report.avg_loss.alternative, Alternative::Less);
            assert_eq!(report.blunders.alternative, Alternative::Less);
        }
    }

    #[test]
    fn test_unequal_spread_falls_back_to_welch() {
        let report = AnomalyDetector::default()
            .detect(&baseline(), &engine_like(), Strategy::Parametric)
            .unwrap();
        assert_eq!(report.accuracy.test, TestKind::WelchT);
        assert_eq!(report.avg_loss.test, TestKind::WelchT);
    }

    #[test]
    fn test_weaker_suspect_is_not_flagged() {
        let weaker = table(&[(60.0, 70.0, 4), (58.5, 75.2, 5), (62.3, 66.1, 3), (55.0, 80.4, 6)]);
        let report = AnomalyDetector::default()
            .detect(&baseline(), &weaker, Strategy::NonParametric)
            .unwrap();
        assert!(!report.any_anomalous());
    }

    #[test]
    fn test_empty_tables_are_rejected() {
        let detector = AnomalyDetector::default();
        let empty = PerformanceTable::new();
        assert_eq!(
            detector.detect(&empty, &baseline(), Strategy::NonParametric),
            Err(StatsError::EmptySample("baseline"))
        );
        assert_eq!(
            detector.detect(&baseline(), &empty, Strategy::Parametric),
            Err(StatsError::EmptySample("suspect"))
        );
    }

    #[test]
    fn test_report_serializes() {
        let report = AnomalyDetector::default()
            .detect(&baseline(), &engine_like(), Strategy::NonParametric)
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strategy"], "non-parametric");
        assert_eq!(json["accuracy"]["test"], "mann-whitney-u");
        assert_eq!(json["accuracy"]["status"], "completed");
        assert_eq!(json["accuracy"]["anomalous"], true);
        assert_eq!(json["blunders"]["alternative"], "less");
        assert_eq!(json["avg_loss"]["metric"], "AvgLoss");
        assert!(json.get("variance").is_none());
    }

    #[test]
    fn test_strategy_from_audits() {
        assert_eq!(Strategy::from_audits(&[], 0.05), Strategy::NonParametric);
        let skewed: Vec<f64> = (0..12).map(|i| 2f64.powi(i)).collect();
        let audit = NormalityAudit::run("AvgLoss", &skewed).unwrap();
        assert_eq!(Strategy::from_audits(&[audit], 0.05), Strategy::NonParametric);
    }

    #[test]
    fn test_degenerate_metric_does_not_hide_the_others() {
        let baseline = table(&[
            (72.1, 48.0, 0),
            (80.4, 35.2, 0),
            (65.0, 61.5, 0),
            (77.7, 40.1, 0),
            (84.2, 28.9, 0),
            (70.3, 52.4, 0),
            (75.5, 44.0, 0),
            (68.8, 57.3, 0),
            (79.1, 37.6, 0),
            (73.6, 46.2, 0),
        ]);
        let detector = AnomalyDetector::default();
        for strategy in [Strategy::Parametric, Strategy::NonParametric] {
            let report = detector.detect(&baseline, &engine_like(), strategy).unwrap();
            assert!(report.accuracy.is_anomalous(), "{strategy}");
            assert!(report.avg_loss.is_anomalous(), "{strategy}");

            assert_eq!(report.blunders.p_value(), None);
            assert!(!report.blunders.is_anomalous());
            assert_eq!(
                report.blunders.skip_reason(),
                Some(&StatsError::ZeroVariance("Mann-Whitney U"))
            );
            assert!(report.any_anomalous());

            let json = serde_json::to_value(&report).unwrap();
            assert_eq!(json["blunders"]["status"], "skipped");
            assert_eq!(json["blunders"]["reason"], "Mann-Whitney U is undefined: zero variance");
            assert!(json["blunders"].get("p_value").is_none());
        }
    }
}
