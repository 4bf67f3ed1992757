//! # BallStick CLI
//!
//! Build, inspect and export ball-and-stick cells.

use anyhow::Context;
use ballstick_cell::{BallAndStick, CableEngine, Cell, CellConfig, InMemoryEngine, SimulationContext};
use ballstick_core::SimulationParams;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ballstick")]
#[command(author = "Yatrogenesis")]
#[command(version = "0.1.0")]
#[command(about = "Ball-and-stick neuron with configurable AIS placement", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that builds a cell
#[derive(Args)]
struct CellArgs {
    /// Cell gid
    #[arg(long, default_value_t = 0)]
    gid: u64,
    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// AIS attachment: soma or dend
    #[arg(long)]
    ais_mode: Option<String>,
    /// Attachment point on dend[0] when ais_mode is dend
    #[arg(long)]
    acd_connect_x: Option<f64>,
    /// Total AIS length (um)
    #[arg(long)]
    ais_length: Option<f64>,
}

impl CellArgs {
    fn config(&self) -> anyhow::Result<CellConfig> {
        let mut config = match &self.config {
            Some(path) => CellConfig::from_file(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => CellConfig::default(),
        };
        if let Some(mode) = &self.ais_mode {
            config.ais_mode = mode.clone();
        }
        if let Some(x) = self.acd_connect_x {
            config.acd_connect_x = x;
        }
        if let Some(length) = self.ais_length {
            config.ais_length = length;
        }
        Ok(config)
    }

    fn build(&self) -> anyhow::Result<Cell> {
        Ok(BallAndStick::build(self.gid, &self.config()?)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build a cell and print its section tree
    Build {
        #[command(flatten)]
        cell: CellArgs,
    },

    /// Build a cell and write it as JSON
    Export {
        #[command(flatten)]
        cell: CellArgs,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Instantiate a cell on the in-memory engine and run its clock
    DryRun {
        #[command(flatten)]
        cell: CellArgs,
        /// Stop time (ms)
        #[arg(long, default_value_t = 100.0)]
        tstop: f64,
        /// Time step (ms)
        #[arg(long, default_value_t = 0.025)]
        dt: f64,
    },
}

fn print_tree(cell: &Cell) {
    println!(
        "{} {} (ais_mode = {})",
        "Built".green().bold(),
        cell.to_string().cyan(),
        cell.ais_mode()
    );
    println!();
    println!(
        "  {:<10} {:<10} {:>6} {:>8} {:>6} {:>5}",
        "section", "parent", "x", "L", "diam", "nseg"
    );
    for section in cell.iter() {
        let (parent, x) = match cell.parent_of(&section.name) {
            Some((p, x)) => (p.to_string(), format!("{:.2}", x)),
            None => ("-".to_string(), "-".to_string()),
        };
        println!(
            "  {:<10} {:<10} {:>6} {:>8.1} {:>6.2} {:>5}",
            section.name.cyan(),
            parent,
            x,
            section.length(),
            section.diam_at(0.5),
            section.nseg()
        );
    }
    println!();
    println!("  {} {}", "Total segments:".bold(), cell.num_segments());
}

/// Filter used when `RUST_LOG` is unset or invalid
const DEFAULT_LOG_FILTER: &str = "info";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { cell } => {
            let cell = cell.build()?;
            print_tree(&cell);
        }

        Commands::Export { cell, output } => {
            let cell = cell.build()?;
            let json = serde_json::to_string_pretty(&cell)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("{} {}", "Exported to:".green().bold(), path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::DryRun { cell, tstop, dt } => {
            let cell = cell.build()?;
            let mut engine = InMemoryEngine::new();
            let binding = cell.instantiate(&mut engine)?;

            let params = SimulationParams {
                dt,
                tstop,
                ..Default::default()
            };
            let mut sim = SimulationContext::new(params);
            sim.run(&mut engine)?;

            println!(
                "{} {} to t = {} ms in {} steps",
                "Ran".green().bold(),
                cell.to_string().cyan(),
                sim.t(),
                sim.steps()
            );
            let len = |id| engine.trace(id).map(|t| t.len()).unwrap_or(0);
            println!("  spike_times: {} events", len(binding.spike_times));
            println!("  soma_v:      {} samples", len(binding.soma_v));
            println!("  ais_v:       {} samples", len(binding.ais_v));
            println!(
                "  dend0_vs:    {} traces x {} samples",
                binding.dend0_vs.len(),
                binding.dend0_vs.first().map(|&id| len(id)).unwrap_or(0)
            );
            println!(
                "  dend1_vs:    {} traces x {} samples",
                binding.dend1_vs.len(),
                binding.dend1_vs.first().map(|&id| len(id)).unwrap_or(0)
            );
        }
    }

    Ok(())
}
