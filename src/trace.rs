// trace.rs - Immutable store for a parsed simulation trace

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::info;

use crate::error::{AnalysisError, Result};

/// Per-state time series of a normal trace: one row per recorded step.
#[derive(Debug, Clone, Default)]
pub struct StateSeries {
    /// Walker population Nw.
    pub walkers: Vec<f64>,
    /// Shift S, the control-feedback energy estimator.
    pub shift: Vec<f64>,
    /// Unnormalized energy numerator E.
    pub energy: Vec<f64>,
    /// Unnormalized secondary observable J².
    pub j2: Vec<f64>,
    /// Normalization factor.
    pub norm: Vec<f64>,
}

/// Per-state time series of an aggregated replica trace. Energies are
/// already expressed per replica pair; walker count and shift are not
/// recorded in this shape.
#[derive(Debug, Clone, Default)]
pub struct ReplicaSeries {
    pub energy: Vec<f64>,
    pub j2: Vec<f64>,
    pub norm: Vec<f64>,
}

/// The two trace shapes, decided once at load time. Downstream code
/// matches on this instead of probing for field presence.
#[derive(Debug, Clone)]
pub enum TraceData {
    Normal(Vec<StateSeries>),
    Replica(Vec<ReplicaSeries>),
}

/// A fully parsed, validated simulation trace. Immutable after
/// construction; every analysis borrows it read-only.
#[derive(Debug, Clone)]
pub struct Trace {
    steps: Vec<i64>,
    data: TraceData,
}

impl Trace {
    /// Build a normal-shape trace, validating the step axis and the
    /// positional alignment of every per-state array once.
    pub fn normal(steps: Vec<i64>, states: Vec<StateSeries>) -> Result<Self> {
        validate_steps(&steps)?;
        for (s, series) in states.iter().enumerate() {
            for (field, len) in [
                ("Nw", series.walkers.len()),
                ("S", series.shift.len()),
                ("E", series.energy.len()),
                ("J2", series.j2.len()),
                ("norm", series.norm.len()),
            ] {
                check_aligned(s, field, len, steps.len())?;
            }
        }
        Ok(Self {
            steps,
            data: TraceData::Normal(states),
        })
    }

    /// Build a replica-shape trace.
    pub fn replica(steps: Vec<i64>, states: Vec<ReplicaSeries>) -> Result<Self> {
        validate_steps(&steps)?;
        for (s, series) in states.iter().enumerate() {
            for (field, len) in [
                ("replica_E", series.energy.len()),
                ("replica_J2", series.j2.len()),
                ("norm", series.norm.len()),
            ] {
                check_aligned(s, field, len, steps.len())?;
            }
        }
        Ok(Self {
            steps,
            data: TraceData::Replica(states),
        })
    }

    /// Load a trace text file, sniffing the shape from its header line.
    ///
    /// Both shapes are comment-prefixed CSV: a `#` header naming the
    /// columns, then numeric rows. A `replica_E` column selects the
    /// aggregated replica layout `step, state, replica_E, replica_J2,
    /// norm`; anything else is the normal layout `step, state, Nw, S,
    /// E, J2, norm`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let header = read_header(path)?;
        let is_replica = header.contains("replica_E");
        info!(
            path = %path.display(),
            shape = if is_replica { "replica" } else { "normal" },
            "loading trace"
        );

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_path(path)?;

        let expected_cols = if is_replica { 5 } else { 7 };
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != expected_cols {
                return Err(AnalysisError::MalformedTrace(format!(
                    "row {line}: expected {expected_cols} columns, found {}",
                    record.len()
                )));
            }
            let row = record
                .iter()
                .map(|field| {
                    field.parse::<f64>().map_err(|_| {
                        AnalysisError::MalformedTrace(format!(
                            "row {line}: non-numeric field `{field}`"
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(AnalysisError::MalformedTrace(format!(
                "{} contains no data rows",
                path.display()
            )));
        }

        let steps: Vec<i64> = rows
            .iter()
            .map(|r| r[0] as i64)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let state_ids: Vec<i64> = rows
            .iter()
            .map(|r| r[1] as i64)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if is_replica {
            let mut states = vec![ReplicaSeries::default(); state_ids.len()];
            for row in &rows {
                let s = state_index(&state_ids, row[1] as i64);
                states[s].energy.push(row[2]);
                states[s].j2.push(row[3]);
                states[s].norm.push(row[4]);
            }
            Self::replica(steps, states)
        } else {
            let mut states = vec![StateSeries::default(); state_ids.len()];
            for row in &rows {
                let s = state_index(&state_ids, row[1] as i64);
                states[s].walkers.push(row[2]);
                states[s].shift.push(row[3]);
                states[s].energy.push(row[4]);
                states[s].j2.push(row[5]);
                states[s].norm.push(row[6]);
            }
            Self::normal(steps, states)
        }
    }

    pub fn steps(&self) -> &[i64] {
        &self.steps
    }

    pub fn data(&self) -> &TraceData {
        &self.data
    }

    pub fn num_states(&self) -> usize {
        match &self.data {
            TraceData::Normal(states) => states.len(),
            TraceData::Replica(states) => states.len(),
        }
    }

    pub fn is_replica(&self) -> bool {
        matches!(self.data, TraceData::Replica(_))
    }

    /// Nominal sampling interval of the step axis. Needs at least two
    /// recorded steps.
    pub fn stride(&self) -> Result<i64> {
        if self.steps.len() < 2 {
            return Err(AnalysisError::InsufficientData(
                "at least two recorded steps needed to infer the sampling interval".into(),
            ));
        }
        Ok(self.steps[1] - self.steps[0])
    }

    /// The full per-state series of a normal trace. Replica traces do
    /// not carry walker counts or the shift, so shift-based analyses
    /// reject them here.
    pub fn normal_state(&self, state: usize) -> Result<&StateSeries> {
        match &self.data {
            TraceData::Normal(states) => states.get(state).ok_or_else(|| {
                AnalysisError::invalid(
                    "state",
                    format!("state {state} out of range (trace has {})", states.len()),
                )
            }),
            TraceData::Replica(_) => Err(AnalysisError::invalid(
                "state",
                "replica trace carries no Nw/S data",
            )),
        }
    }

    /// The (energy, j2, norm) triple available in either shape.
    pub fn observable_state(&self, state: usize) -> Result<(&[f64], &[f64], &[f64])> {
        let out_of_range = |len: usize| {
            AnalysisError::invalid(
                "state",
                format!("state {state} out of range (trace has {len})"),
            )
        };
        match &self.data {
            TraceData::Normal(states) => {
                let s = states.get(state).ok_or_else(|| out_of_range(states.len()))?;
                Ok((&s.energy, &s.j2, &s.norm))
            }
            TraceData::Replica(states) => {
                let s = states.get(state).ok_or_else(|| out_of_range(states.len()))?;
                Ok((&s.energy, &s.j2, &s.norm))
            }
        }
    }

    /// Normalized energy series E/norm for one state.
    pub fn normalized_energy(&self, state: usize) -> Result<Vec<f64>> {
        let (energy, _, norm) = self.observable_state(state)?;
        Ok(energy.iter().zip(norm).map(|(&e, &n)| e / n).collect())
    }
}

/// Index range selected by optional inclusive step bounds. Each given
/// bound must match a recorded step exactly.
pub fn step_window(steps: &[i64], start: Option<i64>, end: Option<i64>) -> Result<Range<usize>> {
    let lo = match start {
        None => 0,
        Some(step) => {
            let idx = steps.partition_point(|&s| s < step);
            if idx >= steps.len() || steps[idx] != step {
                return Err(AnalysisError::LookupFailure { step });
            }
            idx
        }
    };
    let hi = match end {
        None => steps.len(),
        Some(step) => {
            let idx = steps.partition_point(|&s| s <= step);
            if idx == 0 || steps[idx - 1] != step {
                return Err(AnalysisError::LookupFailure { step });
            }
            idx
        }
    };
    if lo >= hi {
        return Err(AnalysisError::invalid(
            "range",
            format!("start step at index {lo} not before end index {hi}"),
        ));
    }
    Ok(lo..hi)
}

fn validate_steps(steps: &[i64]) -> Result<()> {
    if steps.is_empty() {
        return Err(AnalysisError::invalid("steps", "empty step axis"));
    }
    if steps.windows(2).any(|w| w[0] >= w[1]) {
        return Err(AnalysisError::invalid(
            "steps",
            "step axis must be strictly increasing and unique",
        ));
    }
    Ok(())
}

fn check_aligned(state: usize, field: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(AnalysisError::AlignmentMismatch(format!(
            "state {state}: {field} has {len} samples but the step axis has {expected}"
        )));
    }
    Ok(())
}

fn state_index(state_ids: &[i64], id: i64) -> usize {
    // state_ids is sorted and deduplicated, so this cannot fail.
    state_ids.partition_point(|&s| s < id)
}

fn read_header(path: &Path) -> Result<String> {
    let file = BufReader::new(File::open(path)?);
    for line in file.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(header) = trimmed.strip_prefix('#') {
            return Ok(header.to_string());
        }
        break;
    }
    Err(AnalysisError::MalformedTrace(format!(
        "{} has no `#` header line identifying its columns",
        path.display()
    )))
}
