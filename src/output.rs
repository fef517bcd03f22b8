// output.rs - Tab-separated dumps consumed by external plotting tools

use std::path::Path;

use csv::WriterBuilder;
use tracing::info;

use crate::blocking::BlockEntry;
use crate::error::{AnalysisError, Result};

/// Write the evolution dump `Step,S,E`: one row per recorded step with
/// the shift and the normalized energy at 8 significant digits.
pub fn save_evolution(
    path: impl AsRef<Path>,
    steps: &[i64],
    shift: &[f64],
    energy: &[f64],
) -> Result<()> {
    if steps.len() != shift.len() || steps.len() != energy.len() {
        return Err(AnalysisError::AlignmentMismatch(format!(
            "{} steps against {} shift and {} energy samples",
            steps.len(),
            shift.len(),
            energy.len()
        )));
    }
    let path = path.as_ref();
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record(["Step", "S", "E"])?;
    for ((&step, &s), &e) in steps.iter().zip(shift).zip(energy) {
        writer.write_record([step.to_string(), sci(s), sci(e)])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = steps.len(), "wrote evolution dump");
    Ok(())
}

/// Write the blocking dump `block_size,std_err,std_err_err`.
pub fn save_block_result(path: impl AsRef<Path>, result: &[BlockEntry]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record(["block_size", "std_err", "std_err_err"])?;
    for entry in result {
        writer.write_record([
            entry.block_size.to_string(),
            sci(entry.std_err),
            sci(entry.std_err_of_std_err),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = result.len(), "wrote blocking dump");
    Ok(())
}

fn sci(value: f64) -> String {
    format!("{value:.8e}")
}
