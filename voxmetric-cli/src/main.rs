mod batch;
mod config;
mod error;
mod raw;

use crate::batch::run_batch;
use crate::config::{ExactMiConfig, Manifest, RunConfig};
use crate::error::CliError;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use voxmetric::{
    compute_metrics, EmpiricalMutualInformation, ExactMi, MetricConfig, Shape3, VolumeView,
    VoxMetricError,
};

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Voxel-wise MSE / correlation / MI maps (JSON config driven)")]
struct Cli {
    /// Print the JSON schema of a run config and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example run config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long, global = true)]
    trace: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the metric maps of one subject.
    Run {
        /// Path to the JSON run configuration.
        #[arg(short, long, value_name = "FILE", default_value = "config.json")]
        config: PathBuf,
    },
    /// Run every subject of a manifest as a separate process.
    Batch {
        /// Path to the JSON manifest.
        #[arg(short, long, value_name = "FILE")]
        manifest: PathBuf,
        /// Maximum number of concurrent child processes.
        #[arg(short, long)]
        processes: Option<usize>,
    },
}

#[derive(Debug, Serialize)]
struct StatsRecord {
    evaluated: usize,
    degenerate_corr: usize,
    degenerate_mi: usize,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    shape: [usize; 3],
    mode: String,
    strategy: String,
    outputs: Vec<PathBuf>,
    stats: StatsRecord,
    elapsed_ms: u128,
}

fn load_run_config(path: &Path) -> Result<RunConfig, CliError> {
    let text = fs::read_to_string(path)?;
    let mut cfg: RunConfig = serde_json::from_str(&text)?;
    cfg.check_paths().map_err(CliError::Config)?;
    if let Some(dir) = path.parent() {
        cfg.resolve_relative_to(dir);
    }
    Ok(cfg)
}

fn run_subject(cfg: &RunConfig) -> Result<RunSummary, CliError> {
    let start = Instant::now();
    let shape = Shape3::from(cfg.shape);
    let len = shape
        .checked_len()
        .filter(|&n| n > 0)
        .ok_or(VoxMetricError::InvalidDimensions { dims: cfg.shape })?;
    let metric_cfg = MetricConfig::from(&cfg.metrics);
    // Reject bad settings before reading any volume from disk.
    metric_cfg.validate()?;

    let data_a = raw::read_f32(&cfg.volume_a_path, len)?;
    let data_b = raw::read_f32(&cfg.volume_b_path, len)?;
    let mask = match &cfg.mask_path {
        Some(path) => raw::read_mask(path, len)?,
        None => vec![true; len],
    };
    tracing::info!(shape = %shape, masked = mask.iter().filter(|&&m| m).count(), "inputs loaded");

    let empirical = EmpiricalMutualInformation;
    let exact: Option<&dyn ExactMi> = match cfg.exact_mi {
        Some(ExactMiConfig::Empirical) => Some(&empirical),
        None => None,
    };
    let maps = compute_metrics(
        VolumeView::from_slice(&data_a, shape)?,
        VolumeView::from_slice(&data_b, shape)?,
        VolumeView::from_slice(&mask, shape)?,
        &metric_cfg,
        exact,
    )?;

    let (mse, corr, mi, stats) = maps.into_parts();
    let mut outputs = Vec::with_capacity(3);
    for (name, map) in [("mse", mse), ("corr", corr), ("mi", mi)] {
        let path = cfg.output_path(name);
        raw::write_f32(&path, map.data())?;
        outputs.push(path);
    }

    Ok(RunSummary {
        shape: cfg.shape,
        mode: format!("{:?}", metric_cfg.mode).to_lowercase(),
        strategy: format!("{:?}", metric_cfg.effective_strategy()).to_lowercase(),
        outputs,
        stats: StatsRecord {
            evaluated: stats.evaluated,
            degenerate_corr: stats.degenerate.corr,
            degenerate_mi: stats.degenerate.mi,
        },
        elapsed_ms: start.elapsed().as_millis(),
    })
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    match cli.command {
        None => Err(CliError::Config(
            "a subcommand is required (run or batch)".into(),
        )),
        Some(Command::Run { config }) => {
            let cfg = load_run_config(&config)?;
            let summary = run_subject(&cfg)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Some(Command::Batch {
            manifest,
            processes,
        }) => {
            let text = fs::read_to_string(&manifest)?;
            let parsed: Manifest = serde_json::from_str(&text)?;
            let processes = processes.or(parsed.processes).unwrap_or(1);
            let report = run_batch(&manifest, &parsed, processes, cli.trace)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.failed > 0 {
                return Err(CliError::Batch {
                    failed: report.failed,
                    total: report.subjects.len(),
                });
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("voxmetric=info,voxmetric_cli=info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}
