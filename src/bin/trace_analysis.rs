// trace_analysis.rs - Means, evolution dumps and blocking dumps for a trace file

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qmc_trace::trace::step_window;
use qmc_trace::{block_analysis, block_analysis_ratio, output, stats, Trace};

#[derive(Parser)]
#[command(name = "trace_analysis", about = "Trace analysis for projector Monte Carlo output")]
struct Cli {
    /// Path to the trace file (normal or aggregated-replica shape)
    file: PathBuf,

    /// Which analysis to run
    mode: Mode,

    /// Logical state index
    #[arg(long, default_value_t = 0)]
    state: usize,

    /// Fraction of leading samples to discard before averaging
    #[arg(long, default_value_t = 0.3)]
    drop: f64,

    /// Restrict dumps to steps >= this recorded step
    #[arg(long)]
    start_step: Option<i64>,

    /// Restrict dumps to steps <= this recorded step
    #[arg(long)]
    end_step: Option<i64>,

    /// Tag for output filenames; defaults to the input file stem
    #[arg(long)]
    tag: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Drop-biased mean of the shift
    MeanS,
    /// Drop-biased mean of E/norm
    MeanE,
    /// Drop-biased mean of J2/norm
    MeanJ2,
    /// Dump step, shift and normalized energy to evol_<tag>.txt
    SaveSe,
    /// Blocking analysis of the energy ratio to stderr_<tag>.txt
    SaveBlockE,
    /// Blocking analysis of the shift to stderr_s_<tag>.txt
    SaveBlockS,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Cli::parse();

    let trace = Trace::from_path(&args.file)
        .with_context(|| format!("failed to load {}", args.file.display()))?;
    let tag = args.tag.clone().unwrap_or_else(|| {
        args.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "trace".to_string())
    });

    match args.mode {
        Mode::MeanS => {
            if trace.is_replica() {
                bail!("replica trace carries no shift data");
            }
            let series = trace.normal_state(args.state)?;
            let mean_s = stats::tail_mean(&series.shift, args.drop)?;
            println!(
                "Mean S (dropping {:.1}%) = {mean_s}",
                args.drop * 100.0
            );
        }

        Mode::MeanE => {
            let (energy, _, norm) = trace.observable_state(args.state)?;
            let mean_e = stats::tail_mean(energy, args.drop)?;
            let mean_norm = stats::tail_mean(norm, args.drop)?;
            println!(
                "Mean E (dropping {:.1}%) = {}",
                args.drop * 100.0,
                mean_e / mean_norm
            );
        }

        Mode::MeanJ2 => {
            let (_, j2, norm) = trace.observable_state(args.state)?;
            let mean_j2 = stats::tail_mean(j2, args.drop)?;
            let mean_norm = stats::tail_mean(norm, args.drop)?;
            println!(
                "Mean J2 (dropping {:.1}%) = {}",
                args.drop * 100.0,
                mean_j2 / mean_norm
            );
        }

        Mode::SaveSe => {
            if trace.is_replica() {
                bail!("replica trace carries no shift data, cannot dump evolution");
            }
            let series = trace.normal_state(args.state)?;
            let energy = trace.normalized_energy(args.state)?;
            let window = step_window(trace.steps(), args.start_step, args.end_step)?;
            let path = dump_path("evol", &tag, args.start_step, args.end_step);
            output::save_evolution(
                &path,
                &trace.steps()[window.clone()],
                &series.shift[window.clone()],
                &energy[window],
            )?;
            println!("Saved evolution dump to {path}");
        }

        Mode::SaveBlockE => {
            let (energy, _, norm) = trace.observable_state(args.state)?;
            let window = step_window(trace.steps(), args.start_step, args.end_step)?;
            let result = block_analysis_ratio(&energy[window.clone()], &norm[window], 1)?;
            let path = dump_path("stderr", &tag, args.start_step, args.end_step);
            output::save_block_result(&path, &result)?;
            println!("Saved {} blocking rows to {path}", result.len());
        }

        Mode::SaveBlockS => {
            if trace.is_replica() {
                bail!("replica trace carries no shift data");
            }
            let series = trace.normal_state(args.state)?;
            let window = step_window(trace.steps(), args.start_step, args.end_step)?;
            let result = block_analysis(&series.shift[window], 1)?;
            let path = dump_path("stderr_s", &tag, args.start_step, args.end_step);
            output::save_block_result(&path, &result)?;
            println!("Saved {} blocking rows to {path}", result.len());
        }
    }

    Ok(())
}

fn dump_path(prefix: &str, tag: &str, start: Option<i64>, end: Option<i64>) -> String {
    let mut name = format!("{prefix}_{tag}");
    if let Some(start) = start {
        name.push_str(&format!("_start{start}"));
    }
    if let Some(end) = end {
        name.push_str(&format!("_end{end}"));
    }
    name.push_str(".txt");
    name
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
