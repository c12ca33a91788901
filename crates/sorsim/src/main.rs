//! SOR simulation CLI.
//!
//! Commands:
//! - run: start the simulation (config file, positional parameters, or
//!   built-in defaults)
//! - visualize: live terminal dashboard tailing a run's log file

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use sorsim_config::SimConfig;
use sorsim_kernel::Director;

#[derive(Parser)]
#[command(name = "sorsim")]
#[command(version)]
#[command(about = "Emergency department simulation")]
struct Cli {
    /// Enable verbose diagnostics
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation until the duration elapses or Ctrl-C / SIGTERM
    Run {
        /// Path to a key=value config file
        #[arg(long, conflicts_with = "params")]
        config: Option<PathBuf>,

        /// Positional form: N K DURATION_MINUTES MS_PER_MINUTE SEED
        #[arg(value_name = "PARAM", num_args = 0..=5)]
        params: Vec<i64>,

        /// Log file path (default: sor_run_<epoch>.log)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Summary file path (default: sor_summary_<epoch>.txt)
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Render a run's log file live in the terminal
    Visualize {
        /// Log file written by a running simulation
        log_path: PathBuf,

        /// Render interval in milliseconds
        #[arg(default_value_t = 200)]
        interval_ms: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            config,
            params,
            log,
            summary,
        } => run_simulation(config, params, log, summary),
        Commands::Visualize {
            log_path,
            interval_ms,
        } => sorsim_viz::run(log_path, Duration::from_millis(interval_ms.max(1))),
    }
}

fn run_simulation(
    config_path: Option<PathBuf>,
    params: Vec<i64>,
    log: Option<PathBuf>,
    summary: Option<PathBuf>,
) -> Result<()> {
    let config = build_config(config_path, params)?;

    let mut director = Director::new(config);
    if let Some(path) = log {
        director = director.with_log_path(path);
    }
    if let Some(path) = summary {
        director = director.with_summary_path(path);
    }

    println!("log file: {}", director.log_path().display());
    println!(
        "watch live with: sorsim visualize {}",
        director.log_path().display()
    );

    let runtime = tokio::runtime::Runtime::new().context("cannot start runtime")?;
    let report = runtime
        .block_on(director.run())
        .context("simulation failed")?;

    println!("\n=== Run complete ({}) ===", report.reason);
    println!("patients: {}", report.state.total_patients);
    println!(
        "triage: red={} yellow={} green={} sentHome={}",
        report.state.triage_red,
        report.state.triage_yellow,
        report.state.triage_green,
        report.state.triage_sent_home
    );
    println!(
        "outcomes: home={} ward={} other={}",
        report.state.outcome_home, report.state.outcome_ward, report.state.outcome_other
    );
    println!("summary: {}", report.summary_path.display());
    Ok(())
}

fn build_config(config_path: Option<PathBuf>, params: Vec<i64>) -> Result<SimConfig> {
    if let Some(path) = config_path {
        return SimConfig::load(&path)
            .with_context(|| format!("invalid config file {}", path.display()));
    }
    match params.len() {
        0 => {
            let mut config = SimConfig::default();
            config.apply_env_override();
            config.validate()?;
            Ok(config)
        }
        5 => {
            let positive = |value: i64, name: &str| -> Result<u64> {
                u64::try_from(value).with_context(|| format!("{} must not be negative", name))
            };
            SimConfig::from_positional(
                positive(params[0], "N")? as u32,
                positive(params[1], "K")? as u32,
                // Negative duration means "run until signaled".
                params[2].max(0) as u32,
                positive(params[3], "MS_PER_MINUTE")?,
                positive(params[4], "SEED")?,
            )
            .context("invalid positional parameters")
        }
        n => bail!(
            "expected 5 positional parameters (N K DURATION MS_PER_MINUTE SEED), got {}",
            n
        ),
    }
}
