// blocking.rs - Blocking/binning error estimation for serially correlated series

use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::stats;

/// One row of a blocking analysis: the error estimate obtained after
/// grouping the series into non-overlapping blocks of `block_size`
/// samples, together with its own statistical uncertainty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockEntry {
    pub block_size: usize,
    pub std_err: f64,
    pub std_err_of_std_err: f64,
}

/// Partition of `n` samples into blocks of `block_size`. Samples that
/// do not fill a whole block are discarded from the *front* of the
/// series (the least equilibrated end). Returns `None` once too few
/// blocks remain for a ddof-corrected variance.
fn partition(n: usize, block_size: usize, ddof: usize) -> Option<(usize, usize)> {
    let remainder = n % block_size;
    let num_blocks = (n - remainder) / block_size;
    if num_blocks <= ddof {
        None
    } else {
        Some((remainder, num_blocks))
    }
}

fn block_means(values: &[f64], start: usize, num_blocks: usize, block_size: usize) -> Vec<f64> {
    (0..num_blocks)
        .map(|j| {
            let lo = start + j * block_size;
            stats::mean(&values[lo..lo + block_size])
        })
        .collect()
}

/// Blocking analysis of a single observable.
///
/// Doubles the block size until it exceeds the series length, emitting
/// for each size the standard error of the mean of the block means and
/// its uncertainty. Running out of blocks is normal truncation, not a
/// failure: the result may be short or empty.
pub fn block_analysis(values: &[f64], ddof: usize) -> Result<Vec<BlockEntry>> {
    if values.is_empty() {
        return Err(AnalysisError::invalid("values", "empty input array"));
    }
    let n = values.len();
    let mut result = Vec::new();

    let mut block_size = 1usize;
    while block_size <= n {
        let Some((start, num_blocks)) = partition(n, block_size, ddof) else {
            break;
        };
        debug!(block_size, num_blocks, "blocking pass");

        let means = block_means(values, start, num_blocks, block_size);
        let std_err = stats::sample_std(&means, ddof) / (num_blocks as f64).sqrt();
        let std_err_of_std_err = std_err / (2.0 * (num_blocks - ddof) as f64).sqrt();
        result.push(BlockEntry {
            block_size,
            std_err,
            std_err_of_std_err,
        });

        block_size <<= 1;
    }

    Ok(result)
}

/// Blocking analysis of the ratio X/Y of two correlated observables,
/// e.g. an unnormalized energy numerator against its normalization.
///
/// Both series share one partition per block size, so their block means
/// stay pairwise aligned and the covariance across block means is well
/// defined. Treating the two independently would mis-state the error of
/// the ratio whenever numerator and denominator fluctuate together.
pub fn block_analysis_ratio(x: &[f64], y: &[f64], ddof: usize) -> Result<Vec<BlockEntry>> {
    if x.is_empty() {
        return Err(AnalysisError::invalid("x", "empty input array"));
    }
    if x.len() != y.len() {
        return Err(AnalysisError::AlignmentMismatch(format!(
            "numerator has {} samples, denominator {}",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    let mut result = Vec::new();

    let mut block_size = 1usize;
    while block_size <= n {
        let Some((start, num_blocks)) = partition(n, block_size, ddof) else {
            break;
        };
        debug!(block_size, num_blocks, "ratio blocking pass");

        let means_x = block_means(x, start, num_blocks, block_size);
        let means_y = block_means(y, start, num_blocks, block_size);
        let mean_x = stats::mean(&means_x);
        let mean_y = stats::mean(&means_y);
        let sqrt_nb = (num_blocks as f64).sqrt();
        let std_err_x = stats::sample_std(&means_x, ddof) / sqrt_nb;
        let std_err_y = stats::sample_std(&means_y, ddof) / sqrt_nb;
        let cov_xy = stats::covariance(&means_x, &means_y, ddof);

        let std_err = stats::ratio_std_err(mean_x, mean_y, std_err_x, std_err_y, cov_xy, num_blocks)?;
        let std_err_of_std_err = std_err / (2.0 * (num_blocks - ddof) as f64).sqrt();
        result.push(BlockEntry {
            block_size,
            std_err,
            std_err_of_std_err,
        });

        block_size <<= 1;
    }

    Ok(result)
}
