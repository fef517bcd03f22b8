//! Post-processing for projector Monte Carlo trace output: blocking
//! error estimation, lag sums over the stride-sampled step axis, and
//! reweighted (bias-corrected) shift and energy estimators.

pub mod blocking;
pub mod error;
pub mod output;
pub mod range_sum;
pub mod reweight;
pub mod stats;
pub mod trace;

pub use blocking::{block_analysis, block_analysis_ratio, BlockEntry};
pub use error::{AnalysisError, Result};
pub use range_sum::RangeSumIndex;
pub use reweight::{
    growth_estimator, reweight_energy, reweight_factor, reweight_shift, ReweightConfig,
    ReweightFactor,
};
pub use trace::{step_window, ReplicaSeries, StateSeries, Trace, TraceData};
