// stats.rs - Shared scalar statistics used by the blocking and reweight engines

use crate::error::{AnalysisError, Result};

/// Arithmetic mean. Callers guarantee a non-empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with `ddof` delta degrees of freedom.
/// Callers guarantee `values.len() > ddof`.
pub fn sample_std(values: &[f64], ddof: usize) -> f64 {
    let m = mean(values);
    let ss: f64 = values.iter().map(|&v| (v - m).powi(2)).sum();
    (ss / (values.len() - ddof) as f64).sqrt()
}

/// ddof-corrected sample covariance of two equally long slices.
pub fn covariance(x: &[f64], y: &[f64], ddof: usize) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    let mx = mean(x);
    let my = mean(y);
    let ss: f64 = x.iter().zip(y).map(|(&a, &b)| (a - mx) * (b - my)).sum();
    ss / (x.len() - ddof) as f64
}

/// Number of leading samples discarded for a given drop ratio.
/// Rejects ratios outside `[0, 1)` and drops that would consume the
/// whole series.
pub fn drop_count(n: usize, drop_ratio: f64) -> Result<usize> {
    if !(0.0..1.0).contains(&drop_ratio) {
        return Err(AnalysisError::invalid(
            "drop_ratio",
            format!("must lie in [0, 1), got {drop_ratio}"),
        ));
    }
    if n == 0 {
        return Err(AnalysisError::invalid("values", "empty input array"));
    }
    let drop_n = (n as f64 * drop_ratio) as usize;
    if drop_n >= n {
        return Err(AnalysisError::InsufficientData(format!(
            "dropping {drop_n} of {n} samples leaves nothing to average"
        )));
    }
    Ok(drop_n)
}

/// Mean of the series after discarding the leading `drop_ratio`
/// fraction. The single authoritative equilibration-cut mean.
pub fn tail_mean(values: &[f64], drop_ratio: f64) -> Result<f64> {
    let drop_n = drop_count(values.len(), drop_ratio)?;
    Ok(mean(&values[drop_n..]))
}

/// First-order error propagation for the ratio X/Y of two correlated
/// observables estimated from `num_blocks` block means. The covariance
/// term is what distinguishes this from treating the two independently.
pub fn ratio_std_err(
    mean_x: f64,
    mean_y: f64,
    std_err_x: f64,
    std_err_y: f64,
    cov_xy: f64,
    num_blocks: usize,
) -> Result<f64> {
    if mean_x == 0.0 || mean_y == 0.0 {
        return Err(AnalysisError::UndefinedRatio(format!(
            "ratio error undefined for means {mean_x} / {mean_y}"
        )));
    }
    let ratio = mean_x / mean_y;
    let rel2 = (std_err_x / mean_x).powi(2) + (std_err_y / mean_y).powi(2)
        - 2.0 * cov_xy / (num_blocks as f64 * mean_x * mean_y);
    // Non-negative in exact arithmetic; when the covariance term
    // cancels the variance terms exactly, rounding can leave a tiny
    // negative residual.
    Ok((ratio * rel2.max(0.0).sqrt()).abs())
}
