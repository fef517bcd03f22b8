// reweight.rs - Lag-weighted bias correction for the shift estimator

use tracing::info;

use crate::error::{AnalysisError, Result};
use crate::range_sum::RangeSumIndex;
use crate::stats;
use crate::trace::Trace;

/// ħ in MeV·zs, the conversion between the simulation input time step
/// and the propagation time used in the weights.
pub const HBAR_MEV_ZS: f64 = 0.6582119460238695;

/// Offset between the two lag windows of the corrected-shift
/// finite difference.
const SHIFT_LAG_OFFSET: i64 = 10;

/// Physical parameters of the reweighting, passed explicitly instead
/// of living as module globals.
#[derive(Debug, Clone, Copy)]
pub struct ReweightConfig {
    /// Time step as given to the simulation input.
    pub dtau: f64,
    /// Conversion factor dividing `dtau` into propagation time.
    pub hbar: f64,
}

impl ReweightConfig {
    pub fn new(dtau: f64) -> Self {
        Self {
            dtau,
            hbar: HBAR_MEV_ZS,
        }
    }

    /// The time step entering the exponential weights.
    pub fn effective_dtau(&self) -> f64 {
        self.dtau / self.hbar
    }
}

/// Exponential correction weights for a suffix of the step axis,
/// aligned so that `weights[i]` belongs to `steps[start_index + i]`.
#[derive(Debug, Clone)]
pub struct ReweightFactor {
    pub start_index: usize,
    pub weights: Vec<f64>,
}

/// Compute the reweighting factor W at every step whose trailing `lag`
/// unit steps are fully covered by retained data.
///
/// The weight at step x is `exp(-dtau * (sum of S over (x-lag, x] -
/// lag * C))` with `C` the drop-biased mean shift as the bias
/// reference level. Large lags or time steps can push the exponent
/// past floating-point range; the resulting infinities propagate to
/// the caller rather than being clamped here.
pub fn reweight_factor(
    trace: &Trace,
    cfg: &ReweightConfig,
    lag: i64,
    drop_ratio: f64,
    state: usize,
) -> Result<ReweightFactor> {
    if lag <= 0 {
        return Err(AnalysisError::invalid(
            "lag",
            format!("must be positive, got {lag}"),
        ));
    }
    let steps = trace.steps();
    let series = trace.normal_state(state)?;
    let stride = trace.stride()?;
    let n = steps.len();

    let drop_n = stats::drop_count(n, drop_ratio)?;

    // First step whose trailing lag window lies fully inside the
    // retained data, rounded up to the next recorded stride multiple.
    let cut_step = steps[drop_n];
    let mut start_step = cut_step + lag;
    if start_step % stride != 0 {
        start_step = ((start_step + stride - 1) / stride) * stride;
    }
    if start_step > steps[n - 1] {
        return Err(AnalysisError::InsufficientData(format!(
            "lag {lag} needs data up to step {start_step}, trace ends at {}",
            steps[n - 1]
        )));
    }
    let start_index = steps.partition_point(|&s| s < start_step);
    let length = n - start_index;
    if length == 0 {
        return Err(AnalysisError::InsufficientData(format!(
            "no samples at or beyond step {start_step}"
        )));
    }

    let c = stats::mean(&series.shift[drop_n..]);
    info!(lag, reference_shift = c, "reweighting factor");

    let index = RangeSumIndex::new(&series.shift, steps, stride)?;
    let dtau = cfg.effective_dtau();
    let mut weights = Vec::with_capacity(length);
    for i in 0..length {
        let step = steps[start_index + i];
        let lag_sum = index.range_sum(step - lag, step - 1)?;
        let log_w = -dtau * (lag_sum - lag as f64 * c);
        weights.push(log_w.exp());
    }

    Ok(ReweightFactor {
        start_index,
        weights,
    })
}

/// Weighted energy estimator `sum(W*E) / sum(W*norm)` over the suffix
/// selected by the factor.
pub fn reweight_energy(energy: &[f64], norm: &[f64], factor: &ReweightFactor) -> Result<f64> {
    let start = factor.start_index;
    if start > energy.len() || start > norm.len() {
        return Err(AnalysisError::AlignmentMismatch(format!(
            "factor starts at index {start} but series have {} and {} samples",
            energy.len(),
            norm.len()
        )));
    }
    let energy = &energy[start..];
    let norm = &norm[start..];
    let w = &factor.weights;
    if energy.len() != w.len() || norm.len() != w.len() {
        return Err(AnalysisError::AlignmentMismatch(format!(
            "{} weights against {} energy and {} norm samples",
            w.len(),
            energy.len(),
            norm.len()
        )));
    }

    let weighted_e: f64 = w.iter().zip(energy).map(|(&wi, &ei)| wi * ei).sum();
    let weighted_norm: f64 = w.iter().zip(norm).map(|(&wi, &ni)| wi * ni).sum();
    if weighted_norm == 0.0 {
        return Err(AnalysisError::UndefinedRatio(
            "weighted normalization sums to zero".into(),
        ));
    }
    Ok(weighted_e / weighted_norm)
}

/// Bias-corrected shift from the relative walker growth under two lag
/// windows offset by exactly one sampling interval.
pub fn reweight_shift(
    trace: &Trace,
    cfg: &ReweightConfig,
    lag: i64,
    drop_ratio: f64,
    state: usize,
) -> Result<f64> {
    let factor_n = reweight_factor(trace, cfg, lag, drop_ratio, state)?;
    let factor_n1 = reweight_factor(trace, cfg, lag + SHIFT_LAG_OFFSET, drop_ratio, state)?;

    let w_n = &factor_n.weights;
    let w_n1 = &factor_n1.weights;
    if w_n.len() != w_n1.len() && w_n.len() != w_n1.len() + 1 {
        return Err(AnalysisError::AlignmentMismatch(format!(
            "lag windows of {} and {} weights cannot be aligned",
            w_n.len(),
            w_n1.len()
        )));
    }

    let steps = trace.steps();
    let stride = trace.stride()?;
    let series = trace.normal_state(state)?;
    let c = stats::tail_mean(&series.shift, drop_ratio)?;

    // The longer-lag window must start exactly one sampling interval
    // later; anything else means the two factors are misaligned and the
    // finite difference below would compare unrelated steps.
    let start_n = steps[factor_n.start_index];
    let start_n1 = steps[factor_n1.start_index];
    if start_n1 != start_n + stride {
        return Err(AnalysisError::AlignmentMismatch(format!(
            "lag windows start at steps {start_n} and {start_n1}, expected offset {stride}"
        )));
    }

    let w_n_seg = &w_n[..w_n.len() - 1];
    let w_n1_seg = &w_n1[..];
    let walkers = &series.walkers;
    let nw_n_seg = &walkers[factor_n.start_index..walkers.len() - 1];
    let nw_n1_seg = &walkers[factor_n1.start_index..];
    if w_n_seg.len() != w_n1_seg.len()
        || w_n_seg.len() != nw_n_seg.len()
        || w_n_seg.len() != nw_n1_seg.len()
    {
        return Err(AnalysisError::AlignmentMismatch(format!(
            "segment lengths {} / {} / {} / {} disagree",
            w_n_seg.len(),
            w_n1_seg.len(),
            nw_n_seg.len(),
            nw_n1_seg.len()
        )));
    }

    let grown: f64 = w_n1_seg.iter().zip(nw_n1_seg).map(|(&w, &nw)| w * nw).sum();
    let base: f64 = w_n_seg.iter().zip(nw_n_seg).map(|(&w, &nw)| w * nw).sum();
    if base == 0.0 || grown == 0.0 {
        return Err(AnalysisError::UndefinedRatio(
            "weighted walker population sums to zero".into(),
        ));
    }

    let dtau = cfg.effective_dtau();
    Ok(c - (grown / base).ln() / (stride as f64 * dtau))
}

/// Growth estimator: the shift corrected by the relative walker-count
/// change between consecutive steps, averaged over the retained tail.
/// A vanishing walker count contributes zero rather than a division
/// fault, matching the simulation's own convention.
pub fn growth_estimator(
    trace: &Trace,
    cfg: &ReweightConfig,
    drop_ratio: f64,
    state: usize,
) -> Result<f64> {
    let series = trace.normal_state(state)?;
    let stride = trace.stride()?;
    let drop_n = stats::drop_count(trace.steps().len(), drop_ratio)?;

    let shift = &series.shift[drop_n..];
    let walkers = &series.walkers[drop_n..];
    if shift.len() < 2 {
        return Err(AnalysisError::InsufficientData(
            "growth estimator needs at least two retained samples".into(),
        ));
    }

    let dtau = cfg.effective_dtau();
    let growth: Vec<f64> = (1..shift.len())
        .map(|i| {
            if walkers[i - 1] != 0.0 {
                shift[i - 1] - (walkers[i] - walkers[i - 1]) / (stride as f64 * dtau * walkers[i - 1])
            } else {
                0.0
            }
        })
        .collect();
    Ok(stats::mean(&growth))
}
