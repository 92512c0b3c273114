//! critsim CLI - Monte Carlo critical-path simulation engine
//!
//! Command-line interface for validating task tables and running
//! critical-path Monte Carlo simulations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use critsim_core::{Dag, EstimationFamily, RunConfig};
use critsim_io::{load_task_table, Config};
use critsim_report::csv_tables;

#[derive(Parser)]
#[command(name = "critsim")]
#[command(author, version, about = "Monte Carlo critical-path simulation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Monte Carlo simulation over a task table
    Run {
        /// Task table CSV path
        #[arg(value_name = "TASK_TABLE")]
        file: PathBuf,

        /// Run configuration TOML
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for rendered results
        #[arg(long)]
        out: Option<PathBuf>,

        /// Override the configured or random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the configured trial count
        #[arg(long)]
        runs: Option<u64>,

        /// Override the configured worker count
        #[arg(long)]
        workers: Option<u32>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Validate a task table without simulating
    Validate {
        /// Task table CSV path
        #[arg(value_name = "TASK_TABLE")]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Both,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            file,
            config,
            out,
            seed,
            runs,
            workers,
            format,
        } => cmd_run(&file, config.as_deref(), out.as_deref(), seed, runs, workers, format),
        Commands::Validate { file } => cmd_validate(&file),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn cmd_validate(file: &Path) -> Result<u8> {
    let records = match load_task_table(file) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(1);
        }
    };

    match Dag::build(records) {
        Ok(dag) => {
            println!("ok: {} tasks, valid dependency graph", dag.len());
            Ok(0)
        }
        Err(err) => {
            eprintln!("error: {err}");
            Ok(1)
        }
    }
}

fn cmd_run(
    file: &Path,
    config_path: Option<&Path>,
    out_dir: Option<&Path>,
    seed_override: Option<u64>,
    runs_override: Option<u64>,
    workers_override: Option<u32>,
    format: OutputFormat,
) -> Result<u8> {
    let records = match load_task_table(file) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(1);
        }
    };

    let dag = match Dag::build(records) {
        Ok(dag) => dag,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(1);
        }
    };

    let config = match config_path {
        Some(path) => Config::load(path).with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => Config::default(),
    };

    let seed_used = seed_override.or(config.seed).unwrap_or_else(random_seed);
    let trials = runs_override.unwrap_or(config.simulation_runs);
    let workers = workers_override
        .or(config.workers)
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1));

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        // Best-effort: if a handler is already installed (e.g. in tests
        // running multiple CLI invocations in-process) this is a no-op.
        let _ = ctrlc::set_handler(move || {
            tracing::warn!("interrupt received, finishing in-flight trials and stopping");
            cancel.store(true, Ordering::Relaxed);
        });
    }

    let run_config = RunConfig {
        trials,
        workers,
        master_seed: seed_used,
        family: EstimationFamily::BetaPert,
    };

    let outcome = critsim_core::run(&dag, run_config, Some(cancel.clone()))
        .with_context(|| "simulation run failed")?;

    let result = critsim_report::build(&outcome, seed_used);

    render(&result, out_dir, format)?;

    if outcome.cancelled {
        Ok(130)
    } else {
        Ok(0)
    }
}

fn random_seed() -> u64 {
    use rand::RngCore;
    rand::thread_rng().next_u64()
}

fn render(result: &critsim_report::ResultObject, out_dir: Option<&Path>, format: OutputFormat) -> Result<()> {
    let write_json = matches!(format, OutputFormat::Json | OutputFormat::Both);
    let write_csv = matches!(format, OutputFormat::Csv | OutputFormat::Both);

    if write_json {
        let json = serde_json::to_string_pretty(result).context("failed to serialize result to JSON")?;
        match out_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                std::fs::write(dir.join("result.json"), json)?;
            }
            None => println!("{json}"),
        }
    }

    if write_csv {
        match out_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let f = std::fs::File::create(dir.join("task_criticality.csv"))?;
                csv_tables::write_task_criticality(f, result)?;
                let f = std::fs::File::create(dir.join("sensitivity.csv"))?;
                csv_tables::write_sensitivity(f, result)?;
                let f = std::fs::File::create(dir.join("categories.csv"))?;
                csv_tables::write_categories(f, result)?;
            }
            None => {
                let mut buf = Vec::new();
                csv_tables::write_task_criticality(&mut buf, result)?;
                csv_tables::write_sensitivity(&mut buf, result)?;
                csv_tables::write_categories(&mut buf, result)?;
                print!("{}", String::from_utf8_lossy(&buf));
            }
        }
    }

    Ok(())
}
