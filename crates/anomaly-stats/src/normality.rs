//! Normality tests: D'Agostino–Pearson omnibus and Shapiro–Wilk.

use statrs::distribution::ContinuousCDF;

use crate::descriptive::{central_moments, check_sample, sorted};
use crate::error::StatsError;
use crate::hypothesis::{standard_normal, TestStatistic};

const SHAPIRO_MAX_N: usize = 5000;

/// Evaluate `c[0] + c[1]·x + c[2]·x² + …`.
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}

/// z-score of the sample skewness (D'Agostino 1970).
fn skew_z(n: f64, m2: f64, m3: f64) -> f64 {
    let b1 = m3 / m2.powf(1.5);
    let y = b1 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    delta * (y / alpha).asinh()
}

/// z-score of the sample kurtosis (Anscombe & Glynn 1983).
fn kurtosis_z(n: f64, m2: f64, m4: f64) -> f64 {
    let b2 = m4 / (m2 * m2);
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let var_b2 = 24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0).powi(2) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / var_b2.sqrt();

    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0 + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / sqrt_beta1.powi(2)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    let term2 = if denom == 0.0 {
        0.0
    } else {
        denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt()
    };
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}

/// D'Agostino–Pearson K² omnibus test. Needs at least 8 observations.
///
/// K² is the sum of the squared skewness and kurtosis z-scores and is
/// referred to a chi-square distribution with 2 degrees of freedom.
pub fn omnibus(values: &[f64]) -> Result<TestStatistic, StatsError> {
    if values.is_empty() {
        return Err(StatsError::EmptySample("omnibus"));
    }
    check_sample(values, "omnibus normality test", 8)?;

    let (m2, m3, m4) = central_moments(values);
    if m2 == 0.0 {
        return Err(StatsError::ZeroVariance("omnibus normality test"));
    }

    let n = values.len() as f64;
    let zs = skew_z(n, m2, m3);
    let zk = kurtosis_z(n, m2, m4);
    let k2 = zs * zs + zk * zk;
    // chi-square survival with 2 df
    Ok(TestStatistic::new(k2, (-k2 / 2.0).exp()))
}

/// Shapiro–Wilk W using Royston's (1995) approximation for 3 ≤ n ≤ 5000.
pub fn shapiro_wilk(values: &[f64]) -> Result<TestStatistic, StatsError> {
    if values.is_empty() {
        return Err(StatsError::EmptySample("Shapiro-Wilk"));
    }
    check_sample(values, "Shapiro-Wilk", 3)?;
    let n = values.len();
    if n > SHAPIRO_MAX_N {
        return Err(StatsError::TooManySamples {
            test: "Shapiro-Wilk",
            limit: SHAPIRO_MAX_N,
            got: n,
        });
    }

    let x = sorted(values);
    if x[n - 1] - x[0] == 0.0 {
        return Err(StatsError::ZeroVariance("Shapiro-Wilk"));
    }

    let normal = standard_normal()?;
    let coeffs = sw_coefficients(n, |p| normal.inverse_cdf(p));

    let mean = x.iter().sum::<f64>() / n as f64;
    let ssq: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let num: f64 = coeffs.iter().zip(&x).map(|(a, v)| a * v).sum();
    let w = (num * num / ssq).min(1.0);

    let p = if n == 3 {
        let p = 6.0 / std::f64::consts::PI * (w.sqrt().asin() - 0.75f64.sqrt().asin());
        p.max(0.0)
    } else {
        let nf = n as f64;
        let mut y = (1.0 - w).ln();
        let (m, s) = if n <= 11 {
            let gamma = poly(&[-2.273, 0.459], nf);
            if y >= gamma {
                return Ok(TestStatistic::new(w, 0.0));
            }
            y = -(gamma - y).ln();
            (
                poly(&[0.5440, -0.39978, 0.025054, -6.714e-4], nf),
                poly(&[1.3822, -0.77857, 0.062767, -0.0020322], nf).exp(),
            )
        } else {
            let ln_n = nf.ln();
            (
                poly(&[-1.5861, -0.31082, -0.083751, 0.0038915], ln_n),
                poly(&[-0.4803, -0.082676, 0.0030302], ln_n).exp(),
            )
        };
        normal.sf((y - m) / s)
    };

    Ok(TestStatistic::new(w, p))
}

/// Antisymmetric Shapiro–Wilk weights for sorted data of length `n`.
fn sw_coefficients(n: usize, ppf: impl Fn(f64) -> f64) -> Vec<f64> {
    let mut a = vec![0.0; n];
    if n == 3 {
        a[2] = 0.5f64.sqrt();
        a[0] = -a[2];
        return a;
    }

    let nf = n as f64;
    let m: Vec<f64> = (1..=n).map(|i| ppf((i as f64 - 0.375) / (nf + 0.25))).collect();
    let summ2: f64 = m.iter().map(|v| v * v).sum();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / nf.sqrt();

    let a1 = m[n - 1] / ssumm2 + poly(&[0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056], rsn);
    a[n - 1] = a1;
    a[0] = -a1;

    if n > 5 {
        let a2 = m[n - 2] / ssumm2
            + poly(&[0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633], rsn);
        let fac = ((summ2 - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
            / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
            .sqrt();
        a[n - 2] = a2;
        a[1] = -a2;
        for i in 2..n - 2 {
            a[i] = m[i] / fac;
        }
    } else {
        let fac = ((summ2 - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * a1 * a1)).sqrt();
        for i in 1..n - 1 {
            a[i] = m[i] / fac;
        }
    }
    a
}
