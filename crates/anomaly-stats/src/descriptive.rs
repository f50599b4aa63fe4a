//! Descriptive statistics over a single sample.

use serde::Serialize;

use crate::error::StatsError;

/// Reject empty or non-finite samples and samples shorter than `needed`.
pub(crate) fn check_sample(values: &[f64], test: &'static str, needed: usize) -> Result<(), StatsError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite);
    }
    if values.len() < needed {
        return Err(StatsError::InsufficientData {
            test,
            needed,
            got: values.len(),
        });
    }
    Ok(())
}

/// Arithmetic mean. Callers guarantee a non-empty sample.
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with `ddof` delta degrees of freedom (1 = sample variance).
pub(crate) fn variance(values: &[f64], ddof: usize) -> f64 {
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    ss / (values.len() - ddof) as f64
}

pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut s = values.to_vec();
    s.sort_by(|a, b| a.total_cmp(b));
    s
}

pub(crate) fn median(values: &[f64]) -> f64 {
    let s = sorted(values);
    let mid = s.len() / 2;
    if s.len() % 2 == 0 {
        (s[mid - 1] + s[mid]) / 2.0
    } else {
        s[mid]
    }
}

/// Most frequent value and its count; ties go to the smallest value.
pub(crate) fn mode(values: &[f64]) -> (f64, usize) {
    let s = sorted(values);
    let mut best = (s[0], 0usize);
    let mut i = 0;
    while i < s.len() {
        let mut j = i;
        while j < s.len() && s[j] == s[i] {
            j += 1;
        }
        if j - i > best.1 {
            best = (s[i], j - i);
        }
        i = j;
    }
    best
}

/// Biased central moments m2, m3, m4.
pub(crate) fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let m = mean(values);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Shape and location summary of one metric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub mode_count: usize,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev: f64,
    /// Bias-corrected skewness (G1)
    pub skewness: f64,
    /// Bias-corrected excess kurtosis (G2)
    pub kurtosis: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Result<Self, StatsError> {
        if values.is_empty() {
            return Err(StatsError::EmptySample("summary"));
        }
        check_sample(values, "kurtosis", 4)?;

        let (m2, m3, m4) = central_moments(values);
        if m2 == 0.0 {
            return Err(StatsError::ZeroVariance("skewness"));
        }

        let n = values.len() as f64;
        let g1 = m3 / m2.powf(1.5);
        let g2 = m4 / (m2 * m2) - 3.0;
        let skewness = (n * (n - 1.0)).sqrt() / (n - 2.0) * g1;
        let kurtosis = ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0));
        let (mode, mode_count) = mode(values);

        Ok(Self {
            count: values.len(),
            mean: mean(values),
            median: median(values),
            mode,
            mode_count,
            std_dev: variance(values, 1).sqrt(),
            skewness,
            kurtosis,
        })
    }
}
