use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use occupancy_sim::manager::Manager;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Directory holding `config.toml`, the tables and the runs.
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start new runs and simulate their first block of days.
    Create {
        #[arg(long, default_value_t = 1)]
        runs: usize,
    },

    /// Simulate the next block of days of a run.
    Resume {
        #[arg(long)]
        run_idx: usize,
    },

    /// Compute occupancy profiles of one run, or of every run.
    Analyze {
        #[arg(long)]
        run_idx: Option<usize>,
    },

    /// Remove every run.
    Clean,
}

impl Command {
    fn execute(self, mgr: &Manager) -> Result<()> {
        match self {
            Self::Create { runs } => {
                for _ in 0..runs {
                    mgr.create_run().context("failed to create run")?;
                }
                Ok(())
            }
            Self::Resume { run_idx } => mgr
                .resume_run(run_idx)
                .with_context(|| format!("failed to resume run {run_idx}")),
            Self::Analyze { run_idx: Some(run_idx) } => mgr
                .analyze_run(run_idx)
                .with_context(|| format!("failed to analyze run {run_idx}")),
            Self::Analyze { run_idx: None } => mgr.analyze_sim(),
            Self::Clean => mgr.clean_sim(),
        }
    }
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    log::info!("{cli:#?}");

    let result = Manager::new(&cli.sim_dir)
        .with_context(|| format!("failed to load {:?}", cli.sim_dir))
        .and_then(|mgr| cli.command.execute(&mgr));
    if let Err(error) = result {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}
