//! Two-sample location tests.
//!
//! Every test takes the suspect sample first and the baseline second;
//! [`Alternative`] states the direction claimed for the suspect.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use crate::descriptive::{check_sample, mean, variance};
use crate::error::StatsError;

/// Direction of a one-sided alternative hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alternative {
    /// Suspect location is above the baseline
    Greater,
    /// Suspect location is below the baseline
    Less,
}

/// Test statistic and its p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestStatistic {
    pub statistic: f64,
    pub p_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub df: Option<f64>,
}

impl TestStatistic {
    pub(crate) fn new(statistic: f64, p_value: f64) -> Self {
        Self {
            statistic,
            p_value: p_value.clamp(0.0, 1.0),
            df: None,
        }
    }

    pub(crate) fn with_df(mut self, df: f64) -> Self {
        self.df = Some(df);
        self
    }
}

pub(crate) fn standard_normal() -> Result<Normal, StatsError> {
    Normal::new(0.0, 1.0).map_err(|e| StatsError::Distribution(e.to_string()))
}

fn students_t(df: f64) -> Result<StudentsT, StatsError> {
    StudentsT::new(0.0, 1.0, df).map_err(|e| StatsError::Distribution(e.to_string()))
}

fn one_sided_t(t: f64, df: f64, alternative: Alternative) -> Result<TestStatistic, StatsError> {
    let dist = students_t(df)?;
    let p = match alternative {
        Alternative::Greater => dist.sf(t),
        Alternative::Less => dist.cdf(t),
    };
    Ok(TestStatistic::new(t, p).with_df(df))
}

/// Student's t-test assuming equal variances.
pub fn t_test_pooled(
    suspect: &[f64],
    baseline: &[f64],
    alternative: Alternative,
) -> Result<TestStatistic, StatsError> {
    check_sample(suspect, "t-test", 2)?;
    check_sample(baseline, "t-test", 2)?;

    let (n1, n2) = (suspect.len() as f64, baseline.len() as f64);
    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * variance(suspect, 1) + (n2 - 1.0) * variance(baseline, 1)) / df;
    let se = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se == 0.0 {
        return Err(StatsError::ZeroVariance("pooled t-test"));
    }

    let t = (mean(suspect) - mean(baseline)) / se;
    one_sided_t(t, df, alternative)
}

/// Welch's t-test with Welch–Satterthwaite degrees of freedom.
pub fn t_test_welch(
    suspect: &[f64],
    baseline: &[f64],
    alternative: Alternative,
) -> Result<TestStatistic, StatsError> {
    check_sample(suspect, "t-test", 2)?;
    check_sample(baseline, "t-test", 2)?;

    let (n1, n2) = (suspect.len() as f64, baseline.len() as f64);
    let a = variance(suspect, 1) / n1;
    let b = variance(baseline, 1) / n2;
    let se2 = a + b;
    if se2 == 0.0 {
        return Err(StatsError::ZeroVariance("Welch t-test"));
    }

    let t = (mean(suspect) - mean(baseline)) / se2.sqrt();
    let df = se2 * se2 / (a * a / (n1 - 1.0) + b * b / (n2 - 1.0));
    one_sided_t(t, df, alternative)
}

/// Average ranks (1-based) of `values`, plus the tie groups' sizes.
pub(crate) fn rank(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // positions i..j share the average of ranks i+1..=j
        let avg = (i + j + 1) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg;
        }
        if j - i > 1 {
            ties.push(j - i);
        }
        i = j;
    }
    (ranks, ties)
}

/// Number of arrangements giving each U value, for samples of `n1` and `n2`.
///
/// These are the coefficients of the Gaussian binomial `[n1 + n2, n1]_q`,
/// built as a product of `(1 - q^(hi + i)) / (1 - q^i)` factors.
fn u_frequencies(n1: usize, n2: usize) -> Vec<f64> {
    let (lo, hi) = (n1.min(n2), n1.max(n2));
    let top = lo * hi;
    let mut c = vec![0.0; top + 1];
    c[0] = 1.0;

    for i in 1..=lo {
        let a = hi + i;
        if a <= top {
            for k in (a..=top).rev() {
                c[k] -= c[k - a];
            }
        }
        for k in i..=top {
            c[k] += c[k - i];
        }
    }
    c
}

/// P(U >= u) under the null, exact.
fn exact_sf(u: f64, n1: usize, n2: usize) -> f64 {
    let freq = u_frequencies(n1, n2);
    let total: f64 = freq.iter().sum();
    // U is an integer when there are no ties
    let start = u.round().max(0.0) as usize;
    let tail: f64 = freq.iter().skip(start).sum();
    tail / total
}

/// Mann–Whitney U test.
///
/// The reported statistic is U of the suspect sample. The exact null
/// distribution is used when there are no ties and at most one sample has
/// more than 8 observations; otherwise a normal approximation with tie and
/// continuity corrections.
pub fn mann_whitney_u(
    suspect: &[f64],
    baseline: &[f64],
    alternative: Alternative,
) -> Result<TestStatistic, StatsError> {
    if suspect.is_empty() {
        return Err(StatsError::EmptySample("suspect"));
    }
    if baseline.is_empty() {
        return Err(StatsError::EmptySample("baseline"));
    }
    check_sample(suspect, "Mann-Whitney U", 1)?;
    check_sample(baseline, "Mann-Whitney U", 1)?;

    let (n1, n2) = (suspect.len(), baseline.len());
    let combined: Vec<f64> = suspect.iter().chain(baseline).copied().collect();
    let (ranks, ties) = rank(&combined);

    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let nn = (n1 * n2) as f64;
    let u = match alternative {
        Alternative::Greater => u1,
        Alternative::Less => nn - u1,
    };

    let use_exact = ties.is_empty() && !(n1 > 8 && n2 > 8);
    let p = if use_exact {
        exact_sf(u, n1, n2)
    } else {
        let n = (n1 + n2) as f64;
        let tie_term: f64 = ties
            .iter()
            .map(|&t| {
                let t = t as f64;
                t * t * t - t
            })
            .sum();
        let s = (nn / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();
        if s == 0.0 || !s.is_finite() {
            return Err(StatsError::ZeroVariance("Mann-Whitney U"));
        }
        let z = (u - nn / 2.0 - 0.5) / s;
        standard_normal()?.sf(z)
    };

    Ok(TestStatistic::new(u1, p))
}
