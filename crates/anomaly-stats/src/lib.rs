//! Distribution diagnostics and the anomaly hypothesis-test battery.
//!
//! [`audit`] surfaces normality and variance-equality evidence for metric
//! columns; [`detector`] compares a suspect performance table against a
//! baseline and reports one directional test per metric.

pub mod audit;
pub mod descriptive;
pub mod detector;
pub mod error;
pub mod hypothesis;
pub mod normality;
pub mod variance;

pub use audit::{MetricTransform, NormalityAudit, VarianceAudit};
pub use descriptive::Summary;
pub use detector::{
    AnomalyDetector, AnomalyReport, DetectorConfig, HypothesisTestResult, Strategy, TestKind,
    TestOutcome,
};
pub use error::StatsError;
pub use hypothesis::{Alternative, TestStatistic};
