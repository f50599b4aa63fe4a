use thiserror::Error;

/// Statistical precondition failures, checked before a test runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("{0} sample is empty")]
    EmptySample(&'static str),

    #[error("{test} needs at least {needed} observations, got {got}")]
    InsufficientData {
        test: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("{test} needs at most {limit} observations, got {got}")]
    TooManySamples {
        test: &'static str,
        limit: usize,
        got: usize,
    },

    #[error("{0} is undefined: zero variance")]
    ZeroVariance(&'static str),

    #[error("{test} needs at least 2 groups, got {got}")]
    TooFewGroups { test: &'static str, got: usize },

    #[error("Non-finite value in sample")]
    NonFinite,

    #[error("Distribution error: {0}")]
    Distribution(String),
}
