//! # Liquid CLI
//!
//! Command-line interface for building and running liquid reservoirs.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use liquid_core::Condition;
use liquid_reservoir::{Reservoir, ReservoirConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "liquid")]
#[command(version)]
#[command(about = "Astrocyte-modulated liquid state reservoir", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a reservoir and run it
    Run {
        /// JSON configuration file (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Total ticks (overrides the configuration)
        #[arg(short, long)]
        ticks: Option<usize>,
        /// Drive condition: stimulus or rest
        #[arg(long, default_value = "stimulus")]
        condition: String,
        /// Record potentials, weights and activities
        #[arg(short, long)]
        record: bool,
        /// Write the recorded history as JSON (implies --record)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Number of resumed runs the ticks are split into
        #[arg(long, default_value_t = 10)]
        chunks: usize,
    },

    /// Build a reservoir and print its structure
    Inspect {
        /// JSON configuration file (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration
    Config,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ReservoirConfig> {
    match path {
        Some(p) => {
            info!(target: "liquid-cli", "loading configuration from {}", p.display());
            ReservoirConfig::from_json_file(p)
                .with_context(|| format!("reading configuration {}", p.display()))
        }
        None => {
            info!(target: "liquid-cli", "using default configuration");
            Ok(ReservoirConfig::default())
        }
    }
}

fn print_structure(reservoir: &Reservoir) {
    let stats = reservoir.connectivity();
    println!("{}", "Reservoir:".green().bold());
    println!(
        "  {} neurons ({} excitatory), {} astrocytes",
        reservoir.neurons.len().to_string().cyan(),
        reservoir.neurons.excitatory_count(),
        reservoir.astrocytes.len().to_string().cyan()
    );
    println!("  {} synapses", stats.total().to_string().cyan());
    println!("    EE {:>6}  EI {:>6}", stats.ee, stats.ei);
    println!("    IE {:>6}  II {:>6}", stats.ie, stats.ii);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            condition,
            record,
            output,
            chunks,
        } => {
            let cfg = load_config(config.as_ref())?;
            let condition: Condition = condition.parse()?;
            let total = ticks.unwrap_or(cfg.simulation.ticks);
            let record = record || output.is_some();
            let chunks = chunks.clamp(1, total.max(1));

            let mut reservoir = Reservoir::from_config(cfg)?;
            print_structure(&reservoir);
            println!(
                "{} {} ticks of {}",
                "Running".green().bold(),
                total,
                condition.to_string().cyan()
            );

            let bar = ProgressBar::new(total as u64);
            bar.set_style(ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} ticks {msg}",
            )?);

            let mut spikes = 0;
            let mut remaining = total;
            for chunk in 0..chunks {
                let size = remaining / (chunks - chunk);
                let summary = reservoir.run_for(condition, size, record)?;
                spikes += summary.spikes;
                remaining -= size;

                if let Some(s) = summary.astrocytes {
                    bar.set_message(format!("astro {:.4}", s.mean));
                }
                bar.inc(size as u64);
            }
            bar.finish();
            info!(target: "liquid-cli", "run complete at tick {}", reservoir.global_time());

            let rate = spikes as f64 / (reservoir.neurons.len() * total.max(1)) as f64;
            println!("{}", "Summary:".green().bold());
            println!("  ticks simulated: {}", reservoir.global_time());
            println!("  spikes: {} (rate {:.4} per neuron per tick)", spikes, rate);
            if let Some(s) = reservoir.astrocyte_stats() {
                println!(
                    "  astrocyte activity: mean {:.4} min {:.4} max {:.4}",
                    s.mean, s.min, s.max
                );
            }

            if let Some(path) = output {
                reservoir
                    .history()
                    .write_json(&path)
                    .with_context(|| format!("writing history {}", path.display()))?;
                info!(
                    target: "liquid-cli",
                    "exported {} recorded ticks to {}",
                    reservoir.history().len(),
                    path.display()
                );
                println!("  history: {}", path.display().to_string().cyan());
            }
        }

        Commands::Inspect { config } => {
            let cfg = load_config(config.as_ref())?;
            let reservoir = Reservoir::from_config(cfg)?;
            print_structure(&reservoir);
        }

        Commands::Config => {
            println!("{}", ReservoirConfig::default().to_json_pretty()?);
        }
    }

    Ok(())
}
