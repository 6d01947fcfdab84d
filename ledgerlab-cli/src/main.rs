mod config;
mod report;

use clap::{Parser, Subcommand};
use config::Config;
use ledgerlab_node::Simulation;
use rand::SeedableRng;
use std::path::PathBuf;

/**
Welcome to the LedgerLab CLI!
*/
#[derive(Debug, Parser)]
#[clap(name = "ledgerlab")]
#[clap(about = "A discrete-event simulator for redactable permissioned blockchains", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the simulation once (or `--runs` times) with the resolved config.
    Run {
        /// Path to a TOML config file; falls back to built-in defaults.
        #[clap(long)]
        config: Option<PathBuf>,
        /// Print the resolved config and exit without simulating.
        #[clap(long, action)]
        dry_run: bool,
        /// Format used to print the resolved config for `--dry-run`.
        #[clap(long, value_enum, default_value = "toml")]
        format: DryRunFormat,
        /// Directory results are written under.
        #[clap(long, default_value = "Results")]
        out_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum DryRunFormat {
    Toml,
    Json,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, dry_run, format, out_dir } => run(config.as_deref(), dry_run, format, &out_dir),
    }
}

fn run(config_path: Option<&std::path::Path>, dry_run_flag: bool, format: DryRunFormat, out_dir: &std::path::Path) -> color_eyre::Result<()> {
    let config = Config::resolve(config_path)?;
    let dry_run = dry_run_flag || Config::dry_run_requested()?;

    if dry_run {
        match format {
            DryRunFormat::Toml => println!("{}", toml::to_string_pretty(&config)?),
            DryRunFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        }
        return Ok(());
    }

    for run_index in 0..config.runs.max(1) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed.wrapping_add(run_index as u64));
        let mut simulation = Simulation::new(config.to_simulation_config(), &mut rng);
        simulation.run(&mut rng);

        log::info!(
            "run {run_index}: total_blocks={} main_blocks={} stale_blocks={}",
            simulation.statistics().total_blocks,
            simulation.statistics().main_blocks,
            simulation.statistics().stale_blocks,
        );

        report::write_workbook(out_dir, &config, simulation.statistics(), simulation.nodes(), None)?;
        report::append_run_csvs(out_dir, run_index, &config, simulation.statistics())?;
    }

    Ok(())
}
