//! Goodness-of-fit metrics for calibration objectives.
//!
//! All metrics take observed and simulated slices of equal length and return
//! a scalar score. Unless noted, higher is better.

use crate::error::ParameterError;

/// Signature shared by every two-series metric.
pub type Metric = fn(&[f64], &[f64]) -> f64;

/// Offset keeping log-transformed flows finite at zero flow.
const LOG_OFFSET: f64 = 0.01;

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Pairwise residuals `simulated - observed`.
fn residuals<'a>(observed: &'a [f64], simulated: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
    observed.iter().zip(simulated).map(|(o, s)| s - o)
}

/// Mean of `f(residual)` over the observed length.
fn mean_residual(observed: &[f64], simulated: &[f64], f: impl Fn(f64) -> f64) -> f64 {
    residuals(observed, simulated).map(f).sum::<f64>() / observed.len() as f64
}

fn log_transform(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| (v + LOG_OFFSET).ln()).collect()
}

/// Population standard deviation.
fn std_dev(values: &[f64], mean: f64) -> f64 {
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Pearson correlation; 0 when either series has no variance.
fn pearson(observed: &[f64], simulated: &[f64]) -> f64 {
    let (mean_o, mean_s) = (mean(observed), mean(simulated));
    let (std_o, std_s) = (std_dev(observed, mean_o), std_dev(simulated, mean_s));
    if std_o == 0.0 || std_s == 0.0 {
        return 0.0;
    }
    observed
        .iter()
        .zip(simulated)
        .map(|(o, s)| (o - mean_o) * (s - mean_s))
        .sum::<f64>()
        / (observed.len() as f64 * std_o * std_s)
}

/// Ranks starting at 1, ties sharing their average rank.
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Spearman rank correlation. Range: [-1, 1].
pub fn spearman(observed: &[f64], simulated: &[f64]) -> f64 {
    pearson(&ranks(observed), &ranks(simulated))
}

/// Nash-Sutcliffe Efficiency. Range: (-inf, 1], 1 = perfect.
pub fn nse(observed: &[f64], simulated: &[f64]) -> f64 {
    let mean_obs = mean(observed);
    let numerator: f64 = residuals(observed, simulated).map(|r| r * r).sum();
    let denominator: f64 = observed.iter().map(|o| (o - mean_obs).powi(2)).sum();
    if denominator == 0.0 {
        return f64::NEG_INFINITY;
    }
    1.0 - numerator / denominator
}

/// Normalized NSE, `1 / (2 - NSE)`. Range: [0, 1], 1 = perfect.
pub fn nnse(observed: &[f64], simulated: &[f64]) -> f64 {
    normalize(nse(observed, simulated))
}

/// NSE on `ln(x + 0.01)`, weighting low flows.
pub fn log_nse(observed: &[f64], simulated: &[f64]) -> f64 {
    nse(&log_transform(observed), &log_transform(simulated))
}

/// Coefficient of determination, taken as NSE.
pub fn r2(observed: &[f64], simulated: &[f64]) -> f64 {
    nse(observed, simulated)
}

/// R² adjusted for `n_predictors` explanatory variables.
///
/// Requires more observations than `n_predictors + 1`.
pub fn adj_r2(observed: &[f64], simulated: &[f64], n_predictors: usize) -> f64 {
    let n = observed.len() as f64;
    let p = n_predictors as f64;
    1.0 - (1.0 - r2(observed, simulated)) * (n - 1.0) / (n - p - 1.0)
}

/// Kling-Gupta Efficiency (2009). Range: (-inf, 1], 1 = perfect.
///
/// Below about -0.41 the observed mean is the better predictor.
pub fn kge(observed: &[f64], simulated: &[f64]) -> f64 {
    let (mean_o, mean_s) = (mean(observed), mean(simulated));
    let (std_o, std_s) = (std_dev(observed, mean_o), std_dev(simulated, mean_s));
    let r = pearson(observed, simulated);
    let alpha = if std_o == 0.0 { 0.0 } else { std_s / std_o };
    let beta = if mean_o == 0.0 { 0.0 } else { mean_s / mean_o };
    euclidean_score(r, alpha, beta)
}

/// Modified KGE (2012), variability as the ratio of coefficients of variation.
pub fn mkge(observed: &[f64], simulated: &[f64]) -> f64 {
    let (mean_o, mean_s) = (mean(observed), mean(simulated));
    let (std_o, std_s) = (std_dev(observed, mean_o), std_dev(simulated, mean_s));
    let r = pearson(observed, simulated);
    let beta = if mean_o == 0.0 { 0.0 } else { mean_s / mean_o };
    let cv_o = if mean_o == 0.0 { 0.0 } else { std_o / mean_o };
    let cv_s = if mean_s == 0.0 { 0.0 } else { std_s / mean_s };
    let gamma = if cv_o == 0.0 { 0.0 } else { cv_s / cv_o };
    euclidean_score(r, gamma, beta)
}

/// Non-parametric KGE: Spearman correlation and a flow-duration-curve
/// variability term.
pub fn npkge(observed: &[f64], simulated: &[f64]) -> f64 {
    let (mean_o, mean_s) = (mean(observed), mean(simulated));
    let r = spearman(observed, simulated);
    let beta = if mean_o == 0.0 { 0.0 } else { mean_s / mean_o };
    let alpha = if mean_o == 0.0 || mean_s == 0.0 {
        0.0
    } else {
        let fdc = |values: &[f64], m: f64| {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let scale = values.len() as f64 * m;
            sorted.into_iter().map(move |v| v / scale).collect::<Vec<f64>>()
        };
        let (fdc_o, fdc_s) = (fdc(observed, mean_o), fdc(simulated, mean_s));
        1.0 - 0.5 * fdc_s.iter().zip(&fdc_o).map(|(s, o)| (s - o).abs()).sum::<f64>()
    };
    euclidean_score(r, alpha, beta)
}

fn euclidean_score(r: f64, variability: f64, bias: f64) -> f64 {
    1.0 - ((r - 1.0).powi(2) + (variability - 1.0).powi(2) + (bias - 1.0).powi(2)).sqrt()
}

/// Map a (-inf, 1] score onto (-1, 1] via `x / (2 - x)`.
pub fn bound(score: f64) -> f64 {
    score / (2.0 - score)
}

/// Map a (-inf, 1] score onto [0, 1] via `1 / (2 - x)`.
pub fn normalize(score: f64) -> f64 {
    1.0 / (2.0 - score)
}

/// Bounded KGE. Range: (-1, 1].
pub fn bkge(observed: &[f64], simulated: &[f64]) -> f64 {
    bound(kge(observed, simulated))
}

/// Bounded modified KGE. Range: (-1, 1].
pub fn bmkge(observed: &[f64], simulated: &[f64]) -> f64 {
    bound(mkge(observed, simulated))
}

/// Bounded non-parametric KGE. Range: (-1, 1].
pub fn bnpkge(observed: &[f64], simulated: &[f64]) -> f64 {
    bound(npkge(observed, simulated))
}

/// Normalized KGE. Range: [0, 1].
pub fn nkge(observed: &[f64], simulated: &[f64]) -> f64 {
    normalize(kge(observed, simulated))
}

/// Normalized modified KGE. Range: [0, 1].
pub fn nmkge(observed: &[f64], simulated: &[f64]) -> f64 {
    normalize(mkge(observed, simulated))
}

/// Normalized non-parametric KGE. Range: [0, 1].
pub fn nnpkge(observed: &[f64], simulated: &[f64]) -> f64 {
    normalize(npkge(observed, simulated))
}

/// Liu Mean Efficiency (2020). Range: (-inf, 1], 1 = perfect.
pub fn lme(observed: &[f64], simulated: &[f64]) -> f64 {
    let (mean_o, mean_s) = (mean(observed), mean(simulated));
    let (std_o, std_s) = (std_dev(observed, mean_o), std_dev(simulated, mean_s));
    let k1 = if std_o == 0.0 {
        0.0
    } else {
        pearson(observed, simulated) * std_s / std_o
    };
    let beta = if mean_o == 0.0 { 0.0 } else { mean_s / mean_o };
    1.0 - ((k1 - 1.0).powi(2) + (beta - 1.0).powi(2)).sqrt()
}

/// Percent Bias. Optimal = 0. Positive = overestimation.
pub fn pbias(observed: &[f64], simulated: &[f64]) -> f64 {
    let sum_obs: f64 = observed.iter().sum();
    if sum_obs == 0.0 {
        return f64::INFINITY;
    }
    100.0 * residuals(observed, simulated).sum::<f64>() / sum_obs
}

/// Root Mean Square Error. Range: [0, inf), 0 = perfect.
pub fn rmse(observed: &[f64], simulated: &[f64]) -> f64 {
    mean_residual(observed, simulated, |r| r * r).sqrt()
}

/// Mean Absolute Error. Range: [0, inf), 0 = perfect.
pub fn mae(observed: &[f64], simulated: &[f64]) -> f64 {
    mean_residual(observed, simulated, f64::abs)
}

/// Arithmetic mean of chunk scores; the default split-metric combiner.
pub fn mean_score(scores: &[f64]) -> f64 {
    mean(scores)
}

/// Split metric: score contiguous chunks of `n_members` values independently
/// and combine the chunk scores.
///
/// A trailing partial chunk is discarded. When `n_members` covers the whole
/// series the result is `metric` over the whole series.
///
/// # Errors
///
/// [`ParameterError::OutOfBounds`] when `n_members` is zero.
pub fn naive_split_metric<M, C>(
    observed: &[f64],
    simulated: &[f64],
    n_members: usize,
    metric: M,
    combine: C,
) -> Result<f64, ParameterError>
where
    M: Fn(&[f64], &[f64]) -> f64,
    C: Fn(&[f64]) -> f64,
{
    if n_members == 0 {
        return Err(ParameterError::OutOfBounds {
            name: "n_members",
            value: 0.0,
            min: 1.0,
            max: f64::INFINITY,
        });
    }
    let len = observed.len().min(simulated.len());
    if n_members >= len {
        return Ok(metric(&observed[..len], &simulated[..len]));
    }
    let scores: Vec<f64> = observed[..len]
        .chunks_exact(n_members)
        .zip(simulated[..len].chunks_exact(n_members))
        .map(|(o, s)| metric(o, s))
        .collect();
    Ok(combine(&scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    const SERIES: [f64; 8] = [0.4, 1.2, 3.5, 2.1, 0.9, 6.3, 4.4, 1.7];

    // --- Perfect-fit identities ---

    #[rstest]
    #[case::nse(nse as Metric, 1.0)]
    #[case::nnse(nnse as Metric, 1.0)]
    #[case::log_nse(log_nse as Metric, 1.0)]
    #[case::r2(r2 as Metric, 1.0)]
    #[case::kge(kge as Metric, 1.0)]
    #[case::mkge(mkge as Metric, 1.0)]
    #[case::npkge(npkge as Metric, 1.0)]
    #[case::bkge(bkge as Metric, 1.0)]
    #[case::bmkge(bmkge as Metric, 1.0)]
    #[case::bnpkge(bnpkge as Metric, 1.0)]
    #[case::nkge(nkge as Metric, 1.0)]
    #[case::nmkge(nmkge as Metric, 1.0)]
    #[case::nnpkge(nnpkge as Metric, 1.0)]
    #[case::lme(lme as Metric, 1.0)]
    #[case::rmse(rmse as Metric, 0.0)]
    #[case::mae(mae as Metric, 0.0)]
    #[case::pbias(pbias as Metric, 0.0)]
    fn perfect_fit(#[case] metric: Metric, #[case] expected: f64) {
        assert_relative_eq!(metric(&SERIES, &SERIES), expected, epsilon = 1e-10);
    }

    #[rstest]
    #[case::nnse(nnse as Metric)]
    #[case::nkge(nkge as Metric)]
    #[case::nmkge(nmkge as Metric)]
    #[case::nnpkge(nnpkge as Metric)]
    fn normalized_in_unit_interval(#[case] metric: Metric) {
        let sim: Vec<f64> = SERIES.iter().rev().map(|v| v * 3.0).collect();
        let score = metric(&SERIES, &sim);
        assert!((0.0..=1.0).contains(&score), "{score}");
    }

    #[rstest]
    #[case::bkge(bkge as Metric)]
    #[case::bmkge(bmkge as Metric)]
    #[case::bnpkge(bnpkge as Metric)]
    fn bounded_above_minus_one(#[case] metric: Metric) {
        let sim: Vec<f64> = SERIES.iter().rev().map(|v| v * 3.0).collect();
        let score = metric(&SERIES, &sim);
        assert!(score > -1.0 && score <= 1.0, "{score}");
    }

    // --- NSE tests ---

    #[test]
    fn nse_mean_simulation_gives_zero() {
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sim = [3.0; 5];
        assert_relative_eq!(nse(&obs, &sim), 0.0, epsilon = 1e-10);
        assert_relative_eq!(nnse(&obs, &sim), 0.5, epsilon = 1e-10);
    }

    #[test]
    fn nse_constant_observed_returns_neg_inf() {
        let obs = [5.0; 5];
        let sim = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(nse(&obs, &sim), f64::NEG_INFINITY);
        assert_eq!(nnse(&obs, &sim), 0.0);
    }

    #[test]
    fn nse_known_value() {
        // num = 0.11, den = 10
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sim = [1.1, 2.2, 2.8, 4.1, 4.9];
        assert_relative_eq!(nse(&obs, &sim), 0.989, epsilon = 1e-10);
    }

    #[test]
    fn log_nse_handles_zeros() {
        let obs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let result = log_nse(&obs, &obs);
        assert!(result.is_finite());
        assert_relative_eq!(result, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn adj_r2_penalises_predictors() {
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sim = [1.1, 2.2, 2.8, 4.1, 4.9];
        // 1 - 0.011 * 4 / 2
        assert_relative_eq!(adj_r2(&obs, &sim, 2), 0.978, epsilon = 1e-10);
        assert!(adj_r2(&obs, &sim, 2) < r2(&obs, &sim));
    }

    // --- KGE family ---

    #[test]
    fn kge_bias_reduces_score() {
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sim = [2.0, 3.0, 4.0, 5.0, 6.0];
        // r = 1, alpha = 1, beta = 4/3
        assert_relative_eq!(kge(&obs, &sim), 1.0 - 1.0 / 3.0, epsilon = 1e-10);
    }

    #[test]
    fn kge_zero_variance_observed() {
        let obs = [3.0; 5];
        let sim = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(kge(&obs, &sim).is_finite());
    }

    #[test]
    fn mkge_scaled_series_only_penalises_bias() {
        // Scaling keeps r and the coefficient of variation
        let sim: Vec<f64> = SERIES.iter().map(|v| v * 2.0).collect();
        assert_relative_eq!(mkge(&SERIES, &sim), 0.0, epsilon = 1e-10);
        assert!(kge(&SERIES, &sim) < mkge(&SERIES, &sim));
    }

    #[test]
    fn npkge_ignores_monotonic_distortion_of_ranks() {
        let sim: Vec<f64> = SERIES.iter().map(|v| v.powi(2)).collect();
        assert_relative_eq!(spearman(&SERIES, &sim), 1.0, epsilon = 1e-12);
        assert!(npkge(&SERIES, &sim) < 1.0);
    }

    #[test]
    fn bound_and_normalize_transforms() {
        assert_relative_eq!(bound(0.0), 0.0);
        assert_relative_eq!(normalize(0.0), 0.5);
        assert_relative_eq!(bound(-2.0), -0.5);
        assert_relative_eq!(normalize(-2.0), 0.25);
    }

    #[test]
    fn lme_known_value() {
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sim = [2.0, 4.0, 6.0, 8.0, 10.0];
        // k1 = 2, beta = 2
        assert_relative_eq!(lme(&obs, &sim), 1.0 - 2.0_f64.sqrt(), epsilon = 1e-10);
    }

    // --- Spearman ---

    #[test]
    fn spearman_with_ties() {
        assert_eq!(ranks(&[3.0, 1.0, 3.0, 2.0]), vec![3.5, 1.0, 3.5, 2.0]);
        assert_relative_eq!(spearman(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), -1.0, epsilon = 1e-12);
    }

    // --- Error metrics ---

    #[test]
    fn pbias_known_value() {
        let obs = [10.0, 20.0, 30.0];
        let sim = [12.0, 22.0, 28.0];
        assert_relative_eq!(pbias(&obs, &sim), 100.0 * 2.0 / 60.0, epsilon = 1e-10);
    }

    #[test]
    fn pbias_zero_observed_returns_inf() {
        assert_eq!(pbias(&[0.0; 3], &[1.0, 2.0, 3.0]), f64::INFINITY);
    }

    #[test]
    fn rmse_known_value() {
        let obs = [1.0, 2.0, 3.0];
        let sim = [1.0, 2.0, 4.0];
        assert_relative_eq!(rmse(&obs, &sim), (1.0_f64 / 3.0).sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn mae_symmetric_error() {
        assert_relative_eq!(mae(&[2.0, 2.0], &[1.0, 3.0]), 1.0, epsilon = 1e-10);
    }

    // --- Split metric ---

    #[rstest]
    #[case(8)]
    #[case(9)]
    #[case(365)]
    fn split_with_large_chunk_equals_whole(#[case] n_members: usize) {
        let sim: Vec<f64> = SERIES.iter().map(|v| v * 0.9 + 0.2).collect();
        assert_relative_eq!(
            naive_split_metric(&SERIES, &sim, n_members, nse, mean_score).unwrap(),
            nse(&SERIES, &sim),
            epsilon = 1e-12
        );
    }

    #[test]
    fn split_discards_trailing_chunk() {
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let sim = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 100.0];
        // chunks [1,2,3] and [4,5,6] fit perfectly; the 7th value is dropped
        assert_relative_eq!(naive_split_metric(&obs, &sim, 3, nse, mean_score).unwrap(), 1.0);
    }

    #[test]
    fn split_combines_chunk_scores() {
        let obs = [1.0, 2.0, 1.0, 2.0];
        let sim = [1.0, 2.0, 1.5, 1.5];
        // chunk scores: 1.0 and 0.0
        assert_relative_eq!(naive_split_metric(&obs, &sim, 2, nse, mean_score).unwrap(), 0.5);
        let worst = |s: &[f64]| s.iter().copied().fold(f64::INFINITY, f64::min);
        assert_relative_eq!(naive_split_metric(&obs, &sim, 2, nse, worst).unwrap(), 0.0);
    }

    #[test]
    fn split_rejects_zero_chunk() {
        assert!(matches!(
            naive_split_metric(&SERIES, &SERIES, 0, nse, mean_score),
            Err(ParameterError::OutOfBounds { name: "n_members", .. })
        ));
    }
}
