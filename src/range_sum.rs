// range_sum.rs - Partial-sum index for lag sums over a stride-sampled step axis

use crate::error::{AnalysisError, Result};

/// Answers "sum of a sampled quantity over an inclusive unit-step
/// range" against a step axis recorded every `stride` steps, possibly
/// with gaps. `values[k]` is the quantity held constant over the
/// `stride` unit steps ending at `steps[k]`, i.e. the half-open block
/// `(steps[k] - stride, steps[k]]`.
///
/// Prefix sums are built once at construction; each query then costs
/// two binary searches.
pub struct RangeSumIndex<'a> {
    steps: &'a [i64],
    values: &'a [f64],
    prefix: Vec<f64>,
    stride: i64,
}

impl<'a> RangeSumIndex<'a> {
    pub fn new(values: &'a [f64], steps: &'a [i64], stride: i64) -> Result<Self> {
        if stride <= 0 {
            return Err(AnalysisError::invalid(
                "stride",
                format!("must be positive, got {stride}"),
            ));
        }
        if values.len() != steps.len() {
            return Err(AnalysisError::AlignmentMismatch(format!(
                "{} values against {} steps",
                values.len(),
                steps.len()
            )));
        }
        if steps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalysisError::invalid(
                "steps",
                "step axis must be strictly increasing",
            ));
        }

        let mut prefix = Vec::with_capacity(values.len() + 1);
        let mut acc = 0.0;
        prefix.push(acc);
        for &v in values {
            acc += v;
            prefix.push(acc);
        }

        Ok(Self {
            steps,
            values,
            prefix,
            stride,
        })
    }

    /// Sum of the represented quantity over the inclusive unit-step
    /// range `[x1, x2]`.
    ///
    /// The range decomposes into a left fragment up to the first stride
    /// multiple, whole sample blocks each weighted by the stride, and a
    /// right fragment past the last whole block. A fragment whose
    /// anchor step has no exact sample is a lookup failure: silently
    /// counting it as zero would under-state every lag sum crossing the
    /// gap.
    pub fn range_sum(&self, x1: i64, x2: i64) -> Result<f64> {
        if x1 > x2 {
            return Err(AnalysisError::invalid(
                "range",
                format!("x1 = {x1} exceeds x2 = {x2}"),
            ));
        }
        let a = self.stride;
        let ceil_x1 = ((x1 - 1).div_euclid(a) + 1) * a;
        let floor_x2 = x2.div_euclid(a) * a;

        // Range inside a single sample block: all x2-x1+1 unit steps
        // carry the value anchored at ceil_x1.
        if ceil_x1 > floor_x2 {
            let idx = self.sample_at(ceil_x1)?;
            return Ok((x2 - x1 + 1) as f64 * self.values[idx]);
        }

        let mut total = 0.0;

        // Left fragment [x1, ceil_x1], anchored at ceil_x1.
        let left_count = ceil_x1 - x1 + 1;
        if left_count > 0 {
            let idx = self.sample_at(ceil_x1)?;
            total += left_count as f64 * self.values[idx];
        }

        // Whole blocks with sample step in (ceil_x1, floor_x2].
        if floor_x2 > ceil_x1 {
            let lo = self.steps.partition_point(|&s| s <= ceil_x1);
            let hi = self.steps.partition_point(|&s| s <= floor_x2);
            total += (self.prefix[hi] - self.prefix[lo]) * a as f64;
        }

        // Right fragment (floor_x2, x2], anchored one stride past floor_x2.
        let right_count = x2 - floor_x2;
        if right_count > 0 {
            let idx = self.sample_at(floor_x2 + a)?;
            total += right_count as f64 * self.values[idx];
        }

        Ok(total)
    }

    /// Exact binary search for the sample recorded at `step`.
    fn sample_at(&self, step: i64) -> Result<usize> {
        let idx = self.steps.partition_point(|&s| s < step);
        if idx < self.steps.len() && self.steps[idx] == step {
            Ok(idx)
        } else {
            Err(AnalysisError::LookupFailure { step })
        }
    }
}
