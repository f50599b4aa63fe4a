//! Equality-of-variance tests across groups.

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};

use crate::descriptive::{check_sample, mean, median, variance};
use crate::error::StatsError;
use crate::hypothesis::TestStatistic;

fn check_groups(groups: &[&[f64]], test: &'static str) -> Result<(), StatsError> {
    if groups.len() < 2 {
        return Err(StatsError::TooFewGroups {
            test,
            got: groups.len(),
        });
    }
    for g in groups {
        if g.is_empty() {
            return Err(StatsError::EmptySample(test));
        }
        check_sample(g, test, 2)?;
    }
    Ok(())
}

/// Bartlett's test. Sensitive to departures from normality.
pub fn bartlett(groups: &[&[f64]]) -> Result<TestStatistic, StatsError> {
    check_groups(groups, "Bartlett")?;

    let k = groups.len() as f64;
    let big_n: f64 = groups.iter().map(|g| g.len() as f64).sum();
    let vars: Vec<f64> = groups.iter().map(|g| variance(g, 1)).collect();
    if vars.iter().any(|&v| v == 0.0) {
        return Err(StatsError::ZeroVariance("Bartlett"));
    }

    let dof: Vec<f64> = groups.iter().map(|g| g.len() as f64 - 1.0).collect();
    let pooled = dof.iter().zip(&vars).map(|(d, v)| d * v).sum::<f64>() / (big_n - k);
    let num = (big_n - k) * pooled.ln() - dof.iter().zip(&vars).map(|(d, v)| d * v.ln()).sum::<f64>();
    let correction = 1.0
        + (dof.iter().map(|d| 1.0 / d).sum::<f64>() - 1.0 / (big_n - k)) / (3.0 * (k - 1.0));
    let t = (num / correction).max(0.0);

    let dist = ChiSquared::new(k - 1.0).map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok(TestStatistic::new(t, dist.sf(t)).with_df(k - 1.0))
}

/// Brown–Forsythe variant of Levene's test (deviations from group medians).
pub fn levene_median(groups: &[&[f64]]) -> Result<TestStatistic, StatsError> {
    check_groups(groups, "Levene")?;

    let k = groups.len() as f64;
    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let med = median(g);
            g.iter().map(|v| (v - med).abs()).collect()
        })
        .collect();

    let big_n: f64 = deviations.iter().map(|z| z.len() as f64).sum();
    let group_means: Vec<f64> = deviations.iter().map(|z| mean(z)).collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / big_n;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, zm)| z.len() as f64 * (zm - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, zm)| z.iter().map(|v| (v - zm).powi(2)).sum::<f64>())
        .sum();
    if within == 0.0 {
        return Err(StatsError::ZeroVariance("Levene"));
    }

    let w = (big_n - k) / (k - 1.0) * between / within;
    let dist = FisherSnedecor::new(k - 1.0, big_n - k)
        .map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok(TestStatistic::new(w, dist.sf(w)))
}
